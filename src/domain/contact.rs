//! Attendant entries and the dense-position invariants of a contact list.
//!
//! At rest, the positions of a link's contacts are exactly `0..n`. Every
//! mutation in this module rebuilds positions from vector order, so the
//! invariant holds by construction whatever the previous numbering was.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{ContactId, LinkId};

/// One rotation member of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Contact {
    /// Contact identifier.
    pub id: ContactId,
    /// Owning link.
    pub link_id: LinkId,
    /// Phone or handle used for the hand-off.
    pub phone: String,
    /// Zero-based position, unique and dense within the link.
    pub position: usize,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Trims every entry and drops blank ones, preserving order.
#[must_use]
pub fn sanitize_phones<I, S>(phones: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    phones
        .into_iter()
        .filter_map(|p| {
            let trimmed = p.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

/// Builds a fresh contact list for `link_id` from sanitized phones,
/// positioned in the given order.
#[must_use]
pub fn build_contacts(link_id: LinkId, phones: &[String]) -> Vec<Contact> {
    let now = Utc::now();
    phones
        .iter()
        .enumerate()
        .map(|(position, phone)| Contact {
            id: ContactId::new(),
            link_id,
            phone: phone.clone(),
            position,
            created_at: now,
        })
        .collect()
}

/// Relocates the element at `from` to `to`, shifting everything in between.
///
/// Returns `false` and leaves `items` untouched when either index is
/// outside `0..items.len()`.
pub fn relocate<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from >= items.len() || to >= items.len() {
        return false;
    }
    if from != to {
        let moved = items.remove(from);
        items.insert(to, moved);
    }
    true
}

/// Rewrites every contact's position from its index in the slice.
pub fn renumber(contacts: &mut [Contact]) {
    for (position, contact) in contacts.iter_mut().enumerate() {
        contact.position = position;
    }
}

/// Returns `true` if positions are exactly `0..n` in slice order.
#[must_use]
pub fn is_dense(contacts: &[Contact]) -> bool {
    contacts
        .iter()
        .enumerate()
        .all(|(index, contact)| contact.position == index)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn phones(contacts: &[Contact]) -> Vec<&str> {
        contacts.iter().map(|c| c.phone.as_str()).collect()
    }

    fn sample(n: usize) -> Vec<Contact> {
        let raw: Vec<String> = (0..n).map(|i| format!("+55{i:04}")).collect();
        build_contacts(LinkId::new(), &raw)
    }

    #[test]
    fn sanitize_drops_blank_and_trims() {
        let cleaned = sanitize_phones([" +551111 ", "", "   ", "+552222"]);
        assert_eq!(cleaned, vec!["+551111", "+552222"]);
    }

    #[test]
    fn build_assigns_dense_positions() {
        let contacts = sample(3);
        assert!(is_dense(&contacts));
        assert_eq!(phones(&contacts), vec!["+550000", "+550001", "+550002"]);
    }

    #[test]
    fn relocate_forward_and_back() {
        let mut contacts = sample(4);
        assert!(relocate(&mut contacts, 0, 2));
        renumber(&mut contacts);
        assert_eq!(
            phones(&contacts),
            vec!["+550001", "+550002", "+550000", "+550003"]
        );
        assert!(is_dense(&contacts));

        assert!(relocate(&mut contacts, 3, 0));
        renumber(&mut contacts);
        assert_eq!(
            phones(&contacts),
            vec!["+550003", "+550001", "+550002", "+550000"]
        );
    }

    #[test]
    fn relocate_out_of_range_is_noop() {
        let mut contacts = sample(2);
        assert!(!relocate(&mut contacts, 0, 2));
        assert!(!relocate(&mut contacts, 5, 0));
        assert_eq!(phones(&contacts), vec!["+550000", "+550001"]);
    }

    proptest! {
        #[test]
        fn relocate_keeps_positions_dense(n in 1usize..12, from in 0usize..12, to in 0usize..12) {
            let mut contacts = sample(n);
            let mut before: Vec<String> = contacts.iter().map(|c| c.phone.clone()).collect();
            let moved = relocate(&mut contacts, from, to);
            renumber(&mut contacts);
            prop_assert!(is_dense(&contacts));
            prop_assert_eq!(contacts.len(), n);
            prop_assert_eq!(moved, from < n && to < n);

            let mut after: Vec<String> = contacts.iter().map(|c| c.phone.clone()).collect();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
        }

        #[test]
        fn relocate_to_same_position_is_identity(n in 1usize..12, at in 0usize..12) {
            let mut contacts = sample(n);
            let before: Vec<String> = contacts.iter().map(|c| c.phone.clone()).collect();
            relocate(&mut contacts, at, at);
            renumber(&mut contacts);
            let after: Vec<String> = contacts.iter().map(|c| c.phone.clone()).collect();
            prop_assert_eq!(before, after);
        }
    }
}
