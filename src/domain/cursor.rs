//! Per-link rotation cursor.
//!
//! The cursor is an ever-increasing slot counter. It is never wrapped on
//! write; the selected position is `slot mod contact_count`, computed
//! against the contact count at the moment of the advance. Growing or
//! shrinking the list between assignments therefore can never produce an
//! out-of-range index.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::LinkId;

/// Persistent rotation state of one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RotationCursor {
    /// Owning link.
    pub link_id: LinkId,
    /// Number of slots consumed so far; `None` until the first assignment.
    pub current_index: Option<u64>,
    /// Timestamp of the last advance.
    pub updated_at: Option<DateTime<Utc>>,
}

impl RotationCursor {
    /// Creates a cursor that has not started yet.
    #[must_use]
    pub const fn unstarted(link_id: LinkId) -> Self {
        Self {
            link_id,
            current_index: None,
            updated_at: None,
        }
    }

    /// The slot the next advance will consume.
    #[must_use]
    pub fn next_slot(&self) -> u64 {
        self.current_index.unwrap_or(0)
    }

    /// Consumes the next slot against `contact_count` contacts.
    ///
    /// Returns `None` and leaves the cursor untouched when there are no
    /// contacts.
    pub fn advance(&mut self, contact_count: usize) -> Option<CursorAdvance> {
        let slot = self.next_slot();
        let selected_index = select_index(slot, contact_count)?;
        self.current_index = Some(slot.saturating_add(1));
        self.updated_at = Some(Utc::now());
        Some(CursorAdvance {
            slot,
            selected_index,
        })
    }
}

/// Outcome of one cursor advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CursorAdvance {
    /// Raw pre-advance cursor value consumed by this assignment.
    pub slot: u64,
    /// Position in the contact list selected for this slot.
    pub selected_index: usize,
}

/// Maps a raw slot onto a position in a list of `contact_count` contacts.
///
/// Returns `None` for an empty list.
#[must_use]
pub fn select_index(slot: u64, contact_count: usize) -> Option<usize> {
    let count = u64::try_from(contact_count).ok().filter(|&n| n > 0)?;
    usize::try_from(slot % count).ok()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn unstarted_cursor_selects_first() {
        let mut cursor = RotationCursor::unstarted(LinkId::new());
        let Some(adv) = cursor.advance(3) else {
            panic!("expected advance");
        };
        assert_eq!(adv.slot, 0);
        assert_eq!(adv.selected_index, 0);
        assert_eq!(cursor.current_index, Some(1));
        assert!(cursor.updated_at.is_some());
    }

    #[test]
    fn empty_list_leaves_cursor_unchanged() {
        let mut cursor = RotationCursor::unstarted(LinkId::new());
        assert!(cursor.advance(0).is_none());
        assert_eq!(cursor.current_index, None);
        assert_eq!(cursor.updated_at, None);
    }

    #[test]
    fn shrinking_list_wraps_by_modulo() {
        let mut cursor = RotationCursor::unstarted(LinkId::new());
        for _ in 0..4 {
            let _ = cursor.advance(5);
        }
        let Some(adv) = cursor.advance(2) else {
            panic!("expected advance");
        };
        assert_eq!(adv.slot, 4);
        assert_eq!(adv.selected_index, 0);
        assert_eq!(cursor.current_index, Some(5));
    }

    #[test]
    fn select_index_on_empty_list() {
        assert_eq!(select_index(7, 0), None);
        assert_eq!(select_index(7, 3), Some(1));
    }

    proptest! {
        #[test]
        fn selected_index_always_in_range(slot in any::<u64>(), count in 1usize..1_000) {
            let Some(index) = select_index(slot, count) else {
                return Err(TestCaseError::fail("non-empty list must select"));
            };
            prop_assert!(index < count);
        }
    }
}
