//! Storage contracts for links, contact lists, rotation cursors, and leads.
//!
//! The service layer only sees these traits. [`MemoryStore`] keeps
//! everything in-process; [`crate::persistence::PostgresStore`] backs them
//! with PostgreSQL. Both honour the same atomicity rules:
//!
//! - contact-list mutations are all-or-nothing and never expose a gap or
//!   a duplicate position to readers;
//! - [`CursorStore::advance`] is a single read-modify-write serialized per
//!   link, and never blocks callers working on other links.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Contact, CursorAdvance, Lead, Link, LinkFilter, LinkId, LinkPatch, LinkSummary, NewLink,
    RotationCursor,
};
use crate::error::RotatorError;

pub use memory::MemoryStore;

/// Link records and their denormalized counters.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Persists a new link together with an unstarted cursor.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::SlugTaken`] if the slug is in use.
    async fn create_link(&self, new: NewLink) -> Result<Link, RotatorError>;

    /// Loads a link by id.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if absent.
    async fn get_link(&self, id: LinkId) -> Result<Link, RotatorError>;

    /// Loads a link by its normalized slug.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if absent.
    async fn get_link_by_slug(&self, slug: &str) -> Result<Link, RotatorError>;

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if absent or
    /// [`RotatorError::SlugTaken`] if the new slug collides.
    async fn update_link(&self, id: LinkId, patch: LinkPatch) -> Result<Link, RotatorError>;

    /// Deletes a link with its contacts, cursor, and leads.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if absent.
    async fn delete_link(&self, id: LinkId) -> Result<(), RotatorError>;

    /// Lists links matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::PersistenceError`] on storage failure.
    async fn list_links(&self, filter: &LinkFilter) -> Result<Vec<LinkSummary>, RotatorError>;

    /// Increments the visit counter.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::AnalyticsUpdateFailed`] if the counter could
    /// not be written.
    async fn record_visit(&self, id: LinkId) -> Result<(), RotatorError>;

    /// Increments the lead counter and sets the last-lead timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::AnalyticsUpdateFailed`] if the counters could
    /// not be written.
    async fn record_lead_counters(&self, id: LinkId, at: DateTime<Utc>)
    -> Result<(), RotatorError>;
}

/// The ordered attendant list of each link.
#[async_trait]
pub trait ContactListStore: Send + Sync {
    /// Returns the contacts ordered by position; empty means no attendants.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if the link is absent.
    async fn list_contacts(&self, link_id: LinkId) -> Result<Vec<Contact>, RotatorError>;

    /// Atomically replaces the whole list. Blank entries are dropped and
    /// the rest are trimmed and positioned `0..n` in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if the link is absent.
    async fn replace_contacts(
        &self,
        link_id: LinkId,
        phones: Vec<String>,
    ) -> Result<Vec<Contact>, RotatorError>;

    /// Moves the contact at `from` to `to` and renumbers. A `to` outside
    /// the list leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if the link is absent or
    /// [`RotatorError::PositionOutOfRange`] if `from` is outside the list.
    async fn move_contact(
        &self,
        link_id: LinkId,
        from: usize,
        to: usize,
    ) -> Result<Vec<Contact>, RotatorError>;
}

/// The per-link rotation cursor, the engine's single serialization point.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Consumes the next slot: returns `slot mod contact_count` and
    /// persists `slot + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::NoContacts`] (cursor unchanged) when
    /// `contact_count` is zero, [`RotatorError::LinkNotFound`] if the link
    /// is absent, or [`RotatorError::Transient`] if the cursor could not be
    /// locked in time (cursor unchanged).
    async fn advance(
        &self,
        link_id: LinkId,
        contact_count: usize,
    ) -> Result<CursorAdvance, RotatorError>;

    /// Reads the cursor without advancing it.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if the link is absent.
    async fn cursor(&self, link_id: LinkId) -> Result<RotationCursor, RotatorError>;
}

/// Append-only lead records.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Persists a lead.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::PersistenceError`] on storage failure.
    async fn insert_lead(&self, lead: &Lead) -> Result<(), RotatorError>;

    /// Lists a link's leads, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if the link is absent.
    async fn list_leads(
        &self,
        link_id: LinkId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Lead>, RotatorError>;
}

/// Everything the services need from a backend.
pub trait RotationStore:
    LinkStore + ContactListStore + CursorStore + LeadStore + fmt::Debug
{
}

impl<T> RotationStore for T where
    T: LinkStore + ContactListStore + CursorStore + LeadStore + fmt::Debug
{
}
