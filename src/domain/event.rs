//! Domain events reflecting link, contact-list, and assignment changes.
//!
//! Every state change emits a [`RotationEvent`] through the
//! [`super::EventBus`] after it has been committed to the store. Events are
//! broadcast to WebSocket subscribers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ContactId, LeadId, LinkId};

/// Domain event emitted after every committed mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RotationEvent {
    /// Emitted when a new link is created.
    LinkCreated {
        /// Link identifier.
        link_id: LinkId,
        /// Normalized slug.
        slug: String,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after an operator edits link fields.
    LinkUpdated {
        /// Link identifier.
        link_id: LinkId,
        /// Whether the link is enabled after the edit.
        enabled: bool,
        /// Edit timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a link is removed.
    LinkRemoved {
        /// Link identifier.
        link_id: LinkId,
        /// Removal timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after the whole contact list is replaced.
    ContactsReplaced {
        /// Link identifier.
        link_id: LinkId,
        /// Number of contacts after the replacement.
        contact_count: usize,
        /// Replacement timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after one contact is relocated.
    ContactMoved {
        /// Link identifier.
        link_id: LinkId,
        /// Original position.
        from: usize,
        /// New position.
        to: usize,
        /// Move timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a visit is counted for a link.
    VisitRecorded {
        /// Link identifier.
        link_id: LinkId,
        /// Visit timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Emitted after a visitor is assigned to a contact.
    LeadAssigned {
        /// Link identifier.
        link_id: LinkId,
        /// Recorded lead.
        lead_id: LeadId,
        /// Selected contact.
        contact_id: ContactId,
        /// Contact phone at assignment time.
        assigned_to: String,
        /// Raw cursor slot consumed.
        rotation_slot: u64,
        /// Selected position in the contact list.
        position: usize,
        /// Assignment timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl RotationEvent {
    /// Returns the link ID associated with this event.
    #[must_use]
    pub fn link_id(&self) -> LinkId {
        match self {
            Self::LinkCreated { link_id, .. }
            | Self::LinkUpdated { link_id, .. }
            | Self::LinkRemoved { link_id, .. }
            | Self::ContactsReplaced { link_id, .. }
            | Self::ContactMoved { link_id, .. }
            | Self::VisitRecorded { link_id, .. }
            | Self::LeadAssigned { link_id, .. } => *link_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::LinkCreated { .. } => "link_created",
            Self::LinkUpdated { .. } => "link_updated",
            Self::LinkRemoved { .. } => "link_removed",
            Self::ContactsReplaced { .. } => "contacts_replaced",
            Self::ContactMoved { .. } => "contact_moved",
            Self::VisitRecorded { .. } => "visit_recorded",
            Self::LeadAssigned { .. } => "lead_assigned",
        }
    }
}
