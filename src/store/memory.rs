//! In-process store with per-link fine-grained locking.
//!
//! [`MemoryStore`] keeps a registry of links behind one
//! [`tokio::sync::RwLock`], and gives every link its own slot with three
//! independently locked parts: the link record plus contact list, the
//! rotation cursor, and the lead log. Replacing a contact list swaps the
//! vector under the entry's write lock, so readers see either the old list
//! or the new one. Advancing a cursor only touches that link's cursor
//! mutex.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::{ContactListStore, CursorStore, LeadStore, LinkStore};
use crate::domain::contact::{build_contacts, relocate, renumber, sanitize_phones};
use crate::domain::{
    Contact, CursorAdvance, Lead, Link, LinkFilter, LinkId, LinkPatch, LinkSummary, NewLink,
    RotationCursor,
};
use crate::error::RotatorError;

/// Default bound on waiting for a contended cursor.
const DEFAULT_CURSOR_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Link record and its ordered contact list, locked together.
#[derive(Debug)]
struct LinkEntry {
    link: Link,
    contacts: Vec<Contact>,
}

/// Everything stored for one link.
#[derive(Debug)]
struct LinkSlot {
    entry: RwLock<LinkEntry>,
    cursor: Mutex<RotationCursor>,
    leads: RwLock<Vec<Lead>>,
}

impl LinkSlot {
    fn new(link: Link) -> Self {
        let cursor = RotationCursor::unstarted(link.id);
        Self {
            entry: RwLock::new(LinkEntry {
                link,
                contacts: Vec::new(),
            }),
            cursor: Mutex::new(cursor),
            leads: RwLock::new(Vec::new()),
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    links: HashMap<LinkId, Arc<LinkSlot>>,
    slugs: HashMap<String, LinkId>,
}

/// Central in-memory store for links, contacts, cursors, and leads.
///
/// # Concurrency
///
/// - The outer registry lock is held only to look up, insert, or remove a
///   slot, or to swap a slug. It is never held while waiting on a link's
///   own locks.
/// - Readers of the same contact list run concurrently; list mutations on
///   one link are serialized.
/// - Cursor advances on the same link are serialized by the link's cursor
///   mutex; advances on different links never contend.
#[derive(Debug)]
pub struct MemoryStore {
    registry: RwLock<Registry>,
    cursor_lock_timeout: Duration,
}

impl MemoryStore {
    /// Creates an empty store with the default cursor lock timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cursor_lock_timeout(DEFAULT_CURSOR_LOCK_TIMEOUT)
    }

    /// Creates an empty store that gives up on a contended cursor after
    /// `timeout`, failing the advance with [`RotatorError::Transient`].
    #[must_use]
    pub fn with_cursor_lock_timeout(timeout: Duration) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            cursor_lock_timeout: timeout,
        }
    }

    /// Returns the number of links in the store.
    pub async fn len(&self) -> usize {
        self.registry.read().await.links.len()
    }

    /// Returns `true` if the store holds no links.
    pub async fn is_empty(&self) -> bool {
        self.registry.read().await.links.is_empty()
    }

    async fn slot(&self, id: LinkId) -> Result<Arc<LinkSlot>, RotatorError> {
        let registry = self.registry.read().await;
        registry
            .links
            .get(&id)
            .cloned()
            .ok_or_else(|| RotatorError::link_not_found(id))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn create_link(&self, new: NewLink) -> Result<Link, RotatorError> {
        let mut registry = self.registry.write().await;
        if registry.slugs.contains_key(&new.slug) {
            return Err(RotatorError::SlugTaken(new.slug));
        }
        let link = Link::from_new(new);
        registry.slugs.insert(link.slug.clone(), link.id);
        registry
            .links
            .insert(link.id, Arc::new(LinkSlot::new(link.clone())));
        Ok(link)
    }

    async fn get_link(&self, id: LinkId) -> Result<Link, RotatorError> {
        let slot = self.slot(id).await?;
        let entry = slot.entry.read().await;
        Ok(entry.link.clone())
    }

    async fn get_link_by_slug(&self, slug: &str) -> Result<Link, RotatorError> {
        let slot = {
            let registry = self.registry.read().await;
            registry
                .slugs
                .get(slug)
                .and_then(|id| registry.links.get(id))
                .cloned()
                .ok_or_else(|| RotatorError::link_not_found(slug))?
        };
        let entry = slot.entry.read().await;
        Ok(entry.link.clone())
    }

    async fn update_link(&self, id: LinkId, patch: LinkPatch) -> Result<Link, RotatorError> {
        // Lock order is entry, then registry; the registry write lock is held
        // only for the slug index swap.
        let slot = self.slot(id).await?;
        let mut entry = slot.entry.write().await;

        if let Some(slug) = patch.slug.as_deref()
            && slug != entry.link.slug
        {
            let mut registry = self.registry.write().await;
            if !registry.links.contains_key(&id) {
                return Err(RotatorError::link_not_found(id));
            }
            if registry.slugs.contains_key(slug) {
                return Err(RotatorError::SlugTaken(slug.to_string()));
            }
            registry.slugs.remove(&entry.link.slug);
            registry.slugs.insert(slug.to_string(), id);
        }

        entry.link.apply(patch);
        Ok(entry.link.clone())
    }

    async fn delete_link(&self, id: LinkId) -> Result<(), RotatorError> {
        let mut registry = self.registry.write().await;
        registry
            .links
            .remove(&id)
            .ok_or_else(|| RotatorError::link_not_found(id))?;
        registry.slugs.retain(|_, owner| *owner != id);
        Ok(())
    }

    async fn list_links(&self, filter: &LinkFilter) -> Result<Vec<LinkSummary>, RotatorError> {
        let slots: Vec<Arc<LinkSlot>> = {
            let registry = self.registry.read().await;
            registry.links.values().cloned().collect()
        };
        let mut summaries = Vec::with_capacity(slots.len());
        for slot in slots {
            let entry = slot.entry.read().await;
            let summary = LinkSummary::new(&entry.link, entry.contacts.len());
            if filter.matches(&summary) {
                summaries.push(summary);
            }
        }
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    async fn record_visit(&self, id: LinkId) -> Result<(), RotatorError> {
        let slot = self.slot(id).await?;
        let mut entry = slot.entry.write().await;
        entry.link.total_clicks = entry.link.total_clicks.saturating_add(1);
        Ok(())
    }

    async fn record_lead_counters(
        &self,
        id: LinkId,
        at: DateTime<Utc>,
    ) -> Result<(), RotatorError> {
        let slot = self.slot(id).await?;
        let mut entry = slot.entry.write().await;
        entry.link.total_leads = entry.link.total_leads.saturating_add(1);
        entry.link.last_lead_at = Some(at);
        Ok(())
    }
}

#[async_trait]
impl ContactListStore for MemoryStore {
    async fn list_contacts(&self, link_id: LinkId) -> Result<Vec<Contact>, RotatorError> {
        let slot = self.slot(link_id).await?;
        let entry = slot.entry.read().await;
        Ok(entry.contacts.clone())
    }

    async fn replace_contacts(
        &self,
        link_id: LinkId,
        phones: Vec<String>,
    ) -> Result<Vec<Contact>, RotatorError> {
        let slot = self.slot(link_id).await?;
        let contacts = build_contacts(link_id, &sanitize_phones(phones));
        let mut entry = slot.entry.write().await;
        entry.contacts.clone_from(&contacts);
        entry.link.updated_at = Utc::now();
        Ok(contacts)
    }

    async fn move_contact(
        &self,
        link_id: LinkId,
        from: usize,
        to: usize,
    ) -> Result<Vec<Contact>, RotatorError> {
        let slot = self.slot(link_id).await?;
        let mut entry = slot.entry.write().await;
        let len = entry.contacts.len();
        if from >= len {
            return Err(RotatorError::PositionOutOfRange {
                position: from,
                len,
            });
        }
        // Work on a copy so the stored list is swapped in one assignment.
        let mut reordered = entry.contacts.clone();
        if relocate(&mut reordered, from, to) && from != to {
            renumber(&mut reordered);
            entry.contacts = reordered;
            entry.link.updated_at = Utc::now();
        }
        Ok(entry.contacts.clone())
    }
}

#[async_trait]
impl CursorStore for MemoryStore {
    async fn advance(
        &self,
        link_id: LinkId,
        contact_count: usize,
    ) -> Result<CursorAdvance, RotatorError> {
        let slot = self.slot(link_id).await?;
        let mut cursor = tokio::time::timeout(self.cursor_lock_timeout, slot.cursor.lock())
            .await
            .map_err(|_| {
                RotatorError::Transient(format!(
                    "cursor for link {link_id} still locked after {} ms",
                    self.cursor_lock_timeout.as_millis()
                ))
            })?;
        cursor
            .advance(contact_count)
            .ok_or(RotatorError::NoContacts(*link_id.as_uuid()))
    }

    async fn cursor(&self, link_id: LinkId) -> Result<RotationCursor, RotatorError> {
        let slot = self.slot(link_id).await?;
        let cursor = slot.cursor.lock().await;
        Ok(cursor.clone())
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn insert_lead(&self, lead: &Lead) -> Result<(), RotatorError> {
        let slot = self.slot(lead.link_id).await?;
        slot.leads.write().await.push(lead.clone());
        Ok(())
    }

    async fn list_leads(
        &self,
        link_id: LinkId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Lead>, RotatorError> {
        let slot = self.slot(link_id).await?;
        let leads = slot.leads.read().await;
        Ok(leads.iter().rev().skip(offset).take(limit).cloned().collect())
    }
}
