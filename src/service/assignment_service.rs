//! Assignment service: picks the next contact for a visitor and records
//! the lead.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    Contact, CursorAdvance, EventBus, Lead, LinkId, LinkStatus, RotationEvent, VisitorInfo,
};
use crate::error::RotatorError;
use crate::store::{ContactListStore, CursorStore, LeadStore, LinkStore, RotationStore};

const DEFAULT_LEAD_WRITE_ATTEMPTS: u32 = 5;
const DEFAULT_LEAD_WRITE_BACKOFF: Duration = Duration::from_millis(25);
/// Upper bound on the backoff between background lead-write attempts.
const MAX_RECOVERY_BACKOFF: Duration = Duration::from_secs(30);

/// Outcome of a successful assignment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Assignment {
    /// Contact selected for the visitor.
    pub contact: Contact,
    /// Lead recorded for this assignment.
    pub lead: Lead,
}

/// Round-robin assignment over a link's contact list.
///
/// Every call follows the same pattern: validate the link → read the
/// contact list → advance the cursor → write the lead → bump counters →
/// emit an event. Nothing before the advance has side effects. After it
/// the advance is authoritative: the lead write is retried until it
/// succeeds, in the background once the in-request attempts run out, and
/// counters are best-effort.
#[derive(Debug, Clone)]
pub struct AssignmentService {
    store: Arc<dyn RotationStore>,
    event_bus: EventBus,
    lead_write_attempts: u32,
    lead_write_backoff: Duration,
}

impl AssignmentService {
    /// Creates a new `AssignmentService` with default lead-write retries.
    #[must_use]
    pub fn new(store: Arc<dyn RotationStore>, event_bus: EventBus) -> Self {
        Self {
            store,
            event_bus,
            lead_write_attempts: DEFAULT_LEAD_WRITE_ATTEMPTS,
            lead_write_backoff: DEFAULT_LEAD_WRITE_BACKOFF,
        }
    }

    /// Overrides the lead-write retry policy. `attempts` is at least 1.
    #[must_use]
    pub fn with_lead_write_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.lead_write_attempts = attempts.max(1);
        self.lead_write_backoff = backoff;
        self
    }

    /// Assigns a visitor to the next contact of `link_id`.
    ///
    /// # Errors
    ///
    /// - [`RotatorError::LinkNotFound`] if the link does not exist.
    /// - [`RotatorError::LinkInactive`] if the operator disabled it.
    /// - [`RotatorError::NoContacts`] if the contact list is empty.
    /// - [`RotatorError::Transient`] if the cursor could not be advanced in
    ///   time; the cursor is unchanged and the call may be retried.
    /// - [`RotatorError::LinkNotFound`] also if the link is deleted between
    ///   the advance and the lead write.
    pub async fn assign(
        &self,
        link_id: LinkId,
        visitor: Option<VisitorInfo>,
    ) -> Result<Assignment, RotatorError> {
        let link = self.store.get_link(link_id).await?;
        if !link.enabled {
            return Err(RotatorError::LinkInactive(*link_id.as_uuid()));
        }

        let contacts = self.store.list_contacts(link_id).await?;
        if contacts.is_empty() {
            tracing::debug!(%link_id, "no contacts configured");
            return Err(RotatorError::NoContacts(*link_id.as_uuid()));
        }

        let advance = self.store.advance(link_id, contacts.len()).await?;
        let contact = pick(&contacts, advance)?;

        let lead = Lead::record(&contact, advance, visitor.unwrap_or_default().normalized());
        self.write_lead(&lead).await?;

        if let Err(e) = self.store.record_lead_counters(link_id, lead.created_at).await {
            tracing::warn!(%link_id, error = %e, "lead counters not updated");
        }

        let _ = self.event_bus.publish(RotationEvent::LeadAssigned {
            link_id,
            lead_id: lead.id,
            contact_id: contact.id,
            assigned_to: contact.phone.clone(),
            rotation_slot: advance.slot,
            position: advance.selected_index,
            timestamp: lead.created_at,
        });

        tracing::info!(
            %link_id,
            lead_id = %lead.id,
            slot = advance.slot,
            position = advance.selected_index,
            "lead assigned"
        );
        Ok(Assignment { contact, lead })
    }

    /// Returns the derived availability of a link.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::LinkNotFound`] if the link does not exist.
    pub async fn status(&self, link_id: LinkId) -> Result<LinkStatus, RotatorError> {
        let link = self.store.get_link(link_id).await?;
        if !link.enabled {
            return Ok(LinkStatus::Inactive);
        }
        let contacts = self.store.list_contacts(link_id).await?;
        Ok(LinkStatus::derive(link.enabled, contacts.len()))
    }

    /// Writes the lead, retrying with linear backoff. The slot is already
    /// consumed, so a lead still unwritten after the in-request attempts is
    /// handed to [`Self::spawn_lead_recovery`] instead of being dropped.
    async fn write_lead(&self, lead: &Lead) -> Result<(), RotatorError> {
        let mut attempt = 1;
        loop {
            match self.store.insert_lead(lead).await {
                Ok(()) => return Ok(()),
                Err(e @ RotatorError::LinkNotFound(_)) => return Err(e),
                Err(e) if attempt < self.lead_write_attempts => {
                    tracing::warn!(
                        link_id = %lead.link_id,
                        lead_id = %lead.id,
                        attempt,
                        error = %e,
                        "lead write failed, retrying"
                    );
                    tokio::time::sleep(self.lead_write_backoff.saturating_mul(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        link_id = %lead.link_id,
                        lead_id = %lead.id,
                        slot = lead.rotation_slot,
                        attempts = attempt,
                        error = %e,
                        "lead write deferred to background recovery"
                    );
                    self.spawn_lead_recovery(lead.clone());
                    return Ok(());
                }
            }
        }
    }

    /// Keeps retrying a lead write off the request path, doubling the
    /// backoff up to [`MAX_RECOVERY_BACKOFF`], until the lead is stored or
    /// its link has been deleted.
    fn spawn_lead_recovery(&self, lead: Lead) {
        let store = Arc::clone(&self.store);
        let mut backoff = self.lead_write_backoff.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut attempt: u32 = 0;
            loop {
                tokio::time::sleep(backoff).await;
                attempt = attempt.saturating_add(1);
                match store.insert_lead(&lead).await {
                    Ok(()) => {
                        tracing::info!(
                            link_id = %lead.link_id,
                            lead_id = %lead.id,
                            slot = lead.rotation_slot,
                            attempt,
                            "deferred lead recorded"
                        );
                        return;
                    }
                    Err(RotatorError::LinkNotFound(_)) => {
                        tracing::warn!(
                            link_id = %lead.link_id,
                            lead_id = %lead.id,
                            "link removed before deferred lead was recorded"
                        );
                        return;
                    }
                    Err(e) => {
                        tracing::error!(
                            link_id = %lead.link_id,
                            lead_id = %lead.id,
                            slot = lead.rotation_slot,
                            attempt,
                            error = %e,
                            "deferred lead write failed"
                        );
                        backoff = backoff.saturating_mul(2).min(MAX_RECOVERY_BACKOFF);
                    }
                }
            }
        });
    }
}

fn pick(contacts: &[Contact], advance: CursorAdvance) -> Result<Contact, RotatorError> {
    contacts.get(advance.selected_index).cloned().ok_or_else(|| {
        RotatorError::Internal(format!(
            "selected index {} outside {} contacts",
            advance.selected_index,
            contacts.len()
        ))
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{LinkPatch, NewLink};
    use crate::store::MemoryStore;

    async fn setup(phones: &[&str]) -> (Arc<MemoryStore>, AssignmentService, LinkId) {
        let store = Arc::new(MemoryStore::new());
        let Ok(new) = NewLink::new("Promo", "promo") else {
            panic!("valid link");
        };
        let Ok(link) = store.create_link(new).await else {
            panic!("create failed");
        };
        let phones = phones.iter().map(ToString::to_string).collect();
        let Ok(_) = store.replace_contacts(link.id, phones).await else {
            panic!("replace failed");
        };
        let dyn_store: Arc<dyn RotationStore> = Arc::<MemoryStore>::clone(&store);
        let service = AssignmentService::new(dyn_store, EventBus::new(64));
        (store, service, link.id)
    }

    #[tokio::test]
    async fn assigns_round_robin() {
        let (_, service, link_id) = setup(&["+551111", "+552222", "+553333"]).await;
        let mut seen = Vec::new();
        for _ in 0..6 {
            let Ok(assignment) = service.assign(link_id, None).await else {
                panic!("assign failed");
            };
            seen.push(assignment.contact.phone);
        }
        assert_eq!(
            seen,
            ["+551111", "+552222", "+553333", "+551111", "+552222", "+553333"]
        );
    }

    #[tokio::test]
    async fn empty_list_leaves_cursor_untouched() {
        let (store, service, link_id) = setup(&[]).await;
        let result = service.assign(link_id, None).await;
        assert!(matches!(result, Err(RotatorError::NoContacts(_))));
        let Ok(cursor) = store.cursor(link_id).await else {
            panic!("cursor missing");
        };
        assert_eq!(cursor.current_index, None);
    }

    #[tokio::test]
    async fn disabled_link_is_inactive() {
        let (store, service, link_id) = setup(&["+551111"]).await;
        let patch = LinkPatch {
            enabled: Some(false),
            ..LinkPatch::default()
        };
        let Ok(_) = store.update_link(link_id, patch).await else {
            panic!("update failed");
        };
        assert!(matches!(
            service.assign(link_id, None).await,
            Err(RotatorError::LinkInactive(_))
        ));
        assert!(matches!(
            service.status(link_id).await,
            Ok(LinkStatus::Inactive)
        ));
    }

    #[tokio::test]
    async fn unknown_link_is_not_found() {
        let (_, service, _) = setup(&["+551111"]).await;
        assert!(matches!(
            service.assign(LinkId::new(), None).await,
            Err(RotatorError::LinkNotFound(_))
        ));
    }

    #[tokio::test]
    async fn lead_copies_contact_phone_and_visitor() {
        let (store, service, link_id) = setup(&["+551111"]).await;
        let visitor = VisitorInfo {
            name: Some(" Ana ".to_string()),
            ..VisitorInfo::default()
        };
        let Ok(assignment) = service.assign(link_id, Some(visitor)).await else {
            panic!("assign failed");
        };
        assert_eq!(assignment.lead.assigned_to, "+551111");
        assert_eq!(assignment.lead.contact_id, assignment.contact.id);
        assert_eq!(assignment.lead.visitor.name.as_deref(), Some("Ana"));

        let Ok(link) = store.get_link(link_id).await else {
            panic!("link missing");
        };
        assert_eq!(link.total_leads, 1);
        assert_eq!(link.last_lead_at, Some(assignment.lead.created_at));
    }

    #[tokio::test]
    async fn publishes_lead_assigned() {
        let (_, service, link_id) = setup(&["+551111", "+552222"]).await;
        let mut rx = service.event_bus.subscribe();
        let Ok(_) = service.assign(link_id, None).await else {
            panic!("assign failed");
        };
        let Ok(RotationEvent::LeadAssigned {
            rotation_slot,
            position,
            ..
        }) = rx.recv().await
        else {
            panic!("expected LeadAssigned");
        };
        assert_eq!(rotation_slot, 0);
        assert_eq!(position, 0);
    }

    #[tokio::test]
    async fn status_reflects_contact_list() {
        let (store, service, link_id) = setup(&[]).await;
        assert!(matches!(
            service.status(link_id).await,
            Ok(LinkStatus::NoContacts)
        ));
        let Ok(_) = store
            .replace_contacts(link_id, vec!["+551111".to_string()])
            .await
        else {
            panic!("replace failed");
        };
        assert!(matches!(service.status(link_id).await, Ok(LinkStatus::Active)));
    }
}
