//! Link DTOs for create, update, get, list, status, and lead listing.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{PaginationMeta, PaginationParams, default_page, default_per_page, double_option};
use crate::domain::link::{validate_name, validate_slug};
use crate::domain::{
    Contact, Lead, Link, LinkFilter, LinkId, LinkMode, LinkPatch, LinkStatus, LinkSummary, NewLink,
};
use crate::error::RotatorError;

/// Request body for `POST /links`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLinkRequest {
    /// Human-readable name.
    pub name: String,
    /// URL slug; derived from the name when omitted.
    #[serde(default)]
    pub slug: Option<String>,
    /// Hand-off mode. Defaults to `form`.
    #[serde(default)]
    pub mode: Option<LinkMode>,
    /// Outbound message template (`{name}` is replaced by the visitor name).
    #[serde(default)]
    pub message_template: Option<String>,
    /// Ask for the visitor's name. Defaults to `true` in form mode.
    #[serde(default)]
    pub capture_name: Option<bool>,
    /// Ask for the visitor's phone. Defaults to `true` in form mode.
    #[serde(default)]
    pub capture_phone: Option<bool>,
    /// Tracking pixel id.
    #[serde(default)]
    pub pixel_id: Option<String>,
    /// Tracking pixel event.
    #[serde(default)]
    pub pixel_event: Option<String>,
    /// Campaign label.
    #[serde(default)]
    pub campaign: Option<String>,
    /// Initial contact list in rotation order.
    #[serde(default)]
    pub contacts: Vec<String>,
}

impl CreateLinkRequest {
    /// Validates the request into a [`NewLink`] and the initial contacts.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::InvalidRequest`] on a blank name or a slug
    /// that normalizes to nothing.
    pub fn into_new_link(self) -> Result<(NewLink, Vec<String>), RotatorError> {
        let slug_source = self.slug.as_deref().unwrap_or(&self.name);
        let mut new = NewLink::new(&self.name, slug_source)?;
        let mode = self.mode.unwrap_or_default();
        let capture_default = mode == LinkMode::Form;
        new.mode = mode;
        new.message_template = self.message_template;
        new.capture_name = self.capture_name.unwrap_or(capture_default);
        new.capture_phone = self.capture_phone.unwrap_or(capture_default);
        new.pixel_id = self.pixel_id;
        new.pixel_event = self.pixel_event;
        new.campaign = self.campaign;
        Ok((new, self.contacts))
    }
}

/// Request body for `PATCH /links/{id}`. Absent fields are left untouched;
/// `null` clears a nullable field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateLinkRequest {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New slug.
    #[serde(default)]
    pub slug: Option<String>,
    /// New mode.
    #[serde(default)]
    pub mode: Option<LinkMode>,
    /// New template, or `null` to clear.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub message_template: Option<Option<String>>,
    /// New name-capture flag.
    #[serde(default)]
    pub capture_name: Option<bool>,
    /// New phone-capture flag.
    #[serde(default)]
    pub capture_phone: Option<bool>,
    /// New pixel id, or `null` to clear.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub pixel_id: Option<Option<String>>,
    /// New pixel event, or `null` to clear.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub pixel_event: Option<Option<String>>,
    /// New campaign, or `null` to clear.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub campaign: Option<Option<String>>,
    /// Enable or disable the link.
    #[serde(default)]
    pub enabled: Option<bool>,
}

impl UpdateLinkRequest {
    /// Validates the request into a [`LinkPatch`].
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::InvalidRequest`] on a blank name or slug.
    pub fn into_patch(self) -> Result<LinkPatch, RotatorError> {
        Ok(LinkPatch {
            name: self.name.as_deref().map(validate_name).transpose()?,
            slug: self.slug.as_deref().map(validate_slug).transpose()?,
            mode: self.mode,
            message_template: self.message_template,
            capture_name: self.capture_name,
            capture_phone: self.capture_phone,
            pixel_id: self.pixel_id,
            pixel_event: self.pixel_event,
            campaign: self.campaign,
            enabled: self.enabled,
        })
    }
}

/// Query parameters for `GET /links`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LinkListQuery {
    /// Case-insensitive search over name and slug.
    #[serde(default)]
    pub q: Option<String>,
    /// Exact campaign match.
    #[serde(default)]
    pub campaign: Option<String>,
    /// Derived status filter.
    #[serde(default)]
    pub status: Option<LinkStatus>,
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 20.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl LinkListQuery {
    /// Splits the query into a store filter and clamped pagination.
    #[must_use]
    pub fn into_parts(self) -> (LinkFilter, PaginationParams) {
        let filter = LinkFilter {
            query: self.q.filter(|q| !q.trim().is_empty()),
            campaign: self.campaign.filter(|c| !c.trim().is_empty()),
            status: self.status,
        };
        let pagination = PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
        .clamped();
        (filter, pagination)
    }
}

/// Full link view for `GET /links/{id}` and create/update responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LinkDetailResponse {
    /// Link record.
    #[serde(flatten)]
    pub link: Link,
    /// Derived status.
    pub status: LinkStatus,
    /// Contacts in rotation order.
    pub contacts: Vec<Contact>,
}

impl LinkDetailResponse {
    /// Builds the view and derives the status from the contact list.
    #[must_use]
    pub fn new(link: Link, contacts: Vec<Contact>) -> Self {
        Self {
            status: LinkStatus::derive(link.enabled, contacts.len()),
            link,
            contacts,
        }
    }
}

/// Paginated list response for `GET /links`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LinkListResponse {
    /// Link summaries for the current page.
    pub data: Vec<LinkSummary>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// Response body for `GET /links/{id}/status`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LinkStatusResponse {
    /// Link identifier.
    pub link_id: LinkId,
    /// Derived status.
    pub status: LinkStatus,
}

/// Paginated list response for `GET /links/{id}/leads`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeadListResponse {
    /// Leads for the current page, newest first.
    pub data: Vec<Lead>,
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn direct_mode_defaults_capture_off() {
        let req: CreateLinkRequest = match serde_json::from_value(serde_json::json!({
            "name": "Black Friday",
            "mode": "direct"
        })) {
            Ok(req) => req,
            Err(e) => panic!("bad request body: {e}"),
        };
        let Ok((new, contacts)) = req.into_new_link() else {
            panic!("validation failed");
        };
        assert_eq!(new.slug, "black-friday");
        assert!(!new.capture_name);
        assert!(!new.capture_phone);
        assert!(contacts.is_empty());
    }

    #[test]
    fn patch_distinguishes_null_from_absent() {
        let req: UpdateLinkRequest = match serde_json::from_value(serde_json::json!({
            "campaign": null,
            "enabled": false
        })) {
            Ok(req) => req,
            Err(e) => panic!("bad request body: {e}"),
        };
        let Ok(patch) = req.into_patch() else {
            panic!("validation failed");
        };
        assert_eq!(patch.campaign, Some(None));
        assert_eq!(patch.pixel_id, None);
        assert_eq!(patch.enabled, Some(false));
    }

    #[test]
    fn blank_patch_name_rejected() {
        let req = UpdateLinkRequest {
            name: Some("   ".to_string()),
            ..UpdateLinkRequest::default()
        };
        assert!(matches!(
            req.into_patch(),
            Err(RotatorError::InvalidRequest(_))
        ));
    }
}
