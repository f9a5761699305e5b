//! Link service: link lifecycle, contact-list edits, visits, and reporting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::link::normalize_slug;
use crate::domain::{
    Contact, EventBus, Lead, Link, LinkFilter, LinkId, LinkPatch, LinkStatus, LinkSummary,
    NewLink, RotationEvent,
};
use crate::error::RotatorError;
use crate::store::{ContactListStore, CursorStore, LeadStore, LinkStore, RotationStore};

/// Reporting snapshot for one link.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LinkStats {
    /// Link identifier.
    pub link_id: LinkId,
    /// Derived status.
    pub status: LinkStatus,
    /// Recorded visits.
    pub total_clicks: u64,
    /// Recorded leads.
    pub total_leads: u64,
    /// `leads / clicks * 100` with one decimal, `"0.0"` without visits.
    pub conversion_rate: String,
    /// Most recent lead.
    pub last_lead_at: Option<DateTime<Utc>>,
    /// Current number of contacts.
    pub contact_count: usize,
    /// Slots consumed so far; `None` before the first assignment.
    pub rotation_cursor: Option<u64>,
}

/// Operator-facing orchestration over the store.
///
/// Every mutation commits to the store first, then emits a
/// [`RotationEvent`] and returns.
#[derive(Debug, Clone)]
pub struct LinkService {
    store: Arc<dyn RotationStore>,
    event_bus: EventBus,
}

impl LinkService {
    /// Creates a new `LinkService`.
    #[must_use]
    pub fn new(store: Arc<dyn RotationStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Creates a link and, if given, its initial contact list.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::SlugTaken`] if the slug is in use, or a
    /// storage error.
    pub async fn create_link(
        &self,
        new: NewLink,
        contacts: Vec<String>,
    ) -> Result<(Link, Vec<Contact>), RotatorError> {
        let link = self.store.create_link(new).await?;

        let _ = self.event_bus.publish(RotationEvent::LinkCreated {
            link_id: link.id,
            slug: link.slug.clone(),
            timestamp: link.created_at,
        });
        tracing::info!(link_id = %link.id, slug = %link.slug, "link created");

        let contacts = if contacts.is_empty() {
            Vec::new()
        } else {
            self.replace_contacts(link.id, contacts).await?
        };
        Ok((link, contacts))
    }

    /// Loads a link by id.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if absent.
    pub async fn get_link(&self, id: LinkId) -> Result<Link, RotatorError> {
        self.store.get_link(id).await
    }

    /// Loads a link by slug; the slug is normalized first.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if absent.
    pub async fn get_link_by_slug(&self, slug: &str) -> Result<Link, RotatorError> {
        self.store.get_link_by_slug(&normalize_slug(slug)).await
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] or [`RotatorError::SlugTaken`].
    pub async fn update_link(&self, id: LinkId, patch: LinkPatch) -> Result<Link, RotatorError> {
        let link = self.store.update_link(id, patch).await?;
        let _ = self.event_bus.publish(RotationEvent::LinkUpdated {
            link_id: id,
            enabled: link.enabled,
            timestamp: link.updated_at,
        });
        tracing::info!(link_id = %id, enabled = link.enabled, "link updated");
        Ok(link)
    }

    /// Deletes a link together with its contacts, cursor, and leads.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if absent.
    pub async fn delete_link(&self, id: LinkId) -> Result<(), RotatorError> {
        self.store.delete_link(id).await?;
        let _ = self.event_bus.publish(RotationEvent::LinkRemoved {
            link_id: id,
            timestamp: Utc::now(),
        });
        tracing::info!(link_id = %id, "link removed");
        Ok(())
    }

    /// Lists links matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn list_links(&self, filter: &LinkFilter) -> Result<Vec<LinkSummary>, RotatorError> {
        self.store.list_links(filter).await
    }

    /// Returns a link's contacts ordered by position.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if absent.
    pub async fn list_contacts(&self, link_id: LinkId) -> Result<Vec<Contact>, RotatorError> {
        self.store.list_contacts(link_id).await
    }

    /// Replaces the whole contact list.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if absent.
    pub async fn replace_contacts(
        &self,
        link_id: LinkId,
        phones: Vec<String>,
    ) -> Result<Vec<Contact>, RotatorError> {
        let contacts = self.store.replace_contacts(link_id, phones).await?;
        let _ = self.event_bus.publish(RotationEvent::ContactsReplaced {
            link_id,
            contact_count: contacts.len(),
            timestamp: Utc::now(),
        });
        tracing::info!(%link_id, contact_count = contacts.len(), "contacts replaced");
        Ok(contacts)
    }

    /// Moves one contact. An out-of-range `to` leaves the list unchanged
    /// and emits nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] or
    /// [`RotatorError::PositionOutOfRange`] for a bad `from`.
    pub async fn move_contact(
        &self,
        link_id: LinkId,
        from: usize,
        to: usize,
    ) -> Result<Vec<Contact>, RotatorError> {
        let contacts = self.store.move_contact(link_id, from, to).await?;
        if from != to && to < contacts.len() {
            let _ = self.event_bus.publish(RotationEvent::ContactMoved {
                link_id,
                from,
                to,
                timestamp: Utc::now(),
            });
            tracing::debug!(%link_id, from, to, "contact moved");
        }
        Ok(contacts)
    }

    /// Counts a visit. Counter failures are logged and swallowed.
    pub async fn record_visit(&self, link_id: LinkId) {
        match self.store.record_visit(link_id).await {
            Ok(()) => {
                let _ = self.event_bus.publish(RotationEvent::VisitRecorded {
                    link_id,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => tracing::warn!(%link_id, error = %e, "visit not counted"),
        }
    }

    /// Builds the reporting snapshot of a link.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if absent.
    pub async fn stats(&self, link_id: LinkId) -> Result<LinkStats, RotatorError> {
        let link = self.store.get_link(link_id).await?;
        let contacts = self.store.list_contacts(link_id).await?;
        let cursor = self.store.cursor(link_id).await?;
        Ok(LinkStats {
            link_id,
            status: LinkStatus::derive(link.enabled, contacts.len()),
            total_clicks: link.total_clicks,
            total_leads: link.total_leads,
            conversion_rate: conversion_rate(link.total_leads, link.total_clicks),
            last_lead_at: link.last_lead_at,
            contact_count: contacts.len(),
            rotation_cursor: cursor.current_index,
        })
    }

    /// Lists a link's leads, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if absent.
    pub async fn list_leads(
        &self,
        link_id: LinkId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Lead>, RotatorError> {
        self.store.list_leads(link_id, limit, offset).await
    }
}

/// Formats `leads / clicks * 100` with one decimal, rounding half up.
#[must_use]
pub fn conversion_rate(leads: u64, clicks: u64) -> String {
    if clicks == 0 {
        return "0.0".to_string();
    }
    let leads = u128::from(leads);
    let clicks = u128::from(clicks);
    let tenths = (leads * 1000 + clicks / 2) / clicks;
    format!("{}.{}", tenths / 10, tenths % 10)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> LinkService {
        LinkService::new(Arc::new(MemoryStore::new()), EventBus::new(64))
    }

    fn new_link(slug: &str) -> NewLink {
        let Ok(new) = NewLink::new("Promo", slug) else {
            panic!("valid link");
        };
        new
    }

    #[test]
    fn conversion_rate_formatting() {
        assert_eq!(conversion_rate(0, 0), "0.0");
        assert_eq!(conversion_rate(5, 0), "0.0");
        assert_eq!(conversion_rate(1, 3), "33.3");
        assert_eq!(conversion_rate(2, 3), "66.7");
        assert_eq!(conversion_rate(4, 4), "100.0");
    }

    #[tokio::test]
    async fn create_with_contacts_emits_events() {
        let service = service();
        let mut rx = service.event_bus().subscribe();
        let Ok((link, contacts)) = service
            .create_link(new_link("promo"), vec!["+551111".into(), " ".into()])
            .await
        else {
            panic!("create failed");
        };
        assert_eq!(contacts.len(), 1);

        let Ok(RotationEvent::LinkCreated { link_id, .. }) = rx.recv().await else {
            panic!("expected LinkCreated");
        };
        assert_eq!(link_id, link.id);
        let Ok(RotationEvent::ContactsReplaced { contact_count, .. }) = rx.recv().await else {
            panic!("expected ContactsReplaced");
        };
        assert_eq!(contact_count, 1);
    }

    #[tokio::test]
    async fn slug_lookup_normalizes() {
        let service = service();
        let Ok((link, _)) = service.create_link(new_link("Promo Verão"), Vec::new()).await else {
            panic!("create failed");
        };
        let Ok(found) = service.get_link_by_slug("PROMO VERÃO").await else {
            panic!("lookup failed");
        };
        assert_eq!(found.id, link.id);
    }

    #[tokio::test]
    async fn visits_feed_stats() {
        let service = service();
        let Ok((link, _)) = service
            .create_link(new_link("promo"), vec!["+551111".into()])
            .await
        else {
            panic!("create failed");
        };
        service.record_visit(link.id).await;
        service.record_visit(link.id).await;

        let Ok(stats) = service.stats(link.id).await else {
            panic!("stats failed");
        };
        assert_eq!(stats.total_clicks, 2);
        assert_eq!(stats.conversion_rate, "0.0");
        assert_eq!(stats.status, LinkStatus::Active);
        assert_eq!(stats.rotation_cursor, None);
    }

    #[tokio::test]
    async fn visit_on_missing_link_is_swallowed() {
        let service = service();
        service.record_visit(LinkId::new()).await;
    }

    #[tokio::test]
    async fn noop_move_emits_nothing() {
        let service = service();
        let Ok((link, _)) = service
            .create_link(new_link("promo"), vec!["a".into(), "b".into()])
            .await
        else {
            panic!("create failed");
        };
        let mut rx = service.event_bus().subscribe();
        let Ok(contacts) = service.move_contact(link.id, 0, 9).await else {
            panic!("move failed");
        };
        assert_eq!(contacts.len(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn delete_then_lookup_fails() {
        let service = service();
        let Ok((link, _)) = service.create_link(new_link("promo"), Vec::new()).await else {
            panic!("create failed");
        };
        assert!(service.delete_link(link.id).await.is_ok());
        assert!(matches!(
            service.get_link(link.id).await,
            Err(RotatorError::LinkNotFound(_))
        ));
    }
}
