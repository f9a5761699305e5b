//! Contact-list DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Contact, LinkId};

/// Request body for `PUT /links/{id}/contacts`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReplaceContactsRequest {
    /// Phones in rotation order; blank entries are dropped.
    pub contacts: Vec<String>,
}

/// Request body for `POST /links/{id}/contacts/move`.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct MoveContactRequest {
    /// Current position of the contact.
    pub from: usize,
    /// Target position; outside the list leaves it unchanged.
    pub to: usize,
}

/// Contact list of one link.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContactListResponse {
    /// Link identifier.
    pub link_id: LinkId,
    /// Contacts in rotation order.
    pub contacts: Vec<Contact>,
}
