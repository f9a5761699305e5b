//! Assignment and public redirect DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::handoff::whatsapp_url;
use crate::domain::{Attribution, Contact, Lead, LeadId, Link, LinkId, LinkMode, VisitorInfo};
use crate::service::Assignment;

/// Response body for a completed assignment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AssignmentResponse {
    /// Selected contact.
    pub contact: Contact,
    /// Recorded lead.
    pub lead: Lead,
    /// WhatsApp deep link for the hand-off.
    pub whatsapp_url: String,
}

impl AssignmentResponse {
    /// Builds the response and composes the hand-off URL for `link`.
    #[must_use]
    pub fn new(link: &Link, assignment: Assignment) -> Self {
        let url = whatsapp_url(
            &assignment.contact.phone,
            link.message_template.as_deref(),
            assignment.lead.visitor.name.as_deref(),
        );
        Self {
            contact: assignment.contact,
            lead: assignment.lead,
            whatsapp_url: url,
        }
    }
}

/// Traffic-source query parameters on `/r/{slug}`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RedirectQuery {
    /// `utm_source` tag.
    #[serde(default)]
    pub utm_source: Option<String>,
    /// `utm_campaign` tag.
    #[serde(default)]
    pub utm_campaign: Option<String>,
}

/// Form shown to the visitor of a `form`-mode link.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FormDescriptor {
    /// Link identifier.
    pub link_id: LinkId,
    /// Link name.
    pub name: String,
    /// Link slug.
    pub slug: String,
    /// Hand-off mode (always `form` here).
    pub mode: LinkMode,
    /// The form asks for the visitor's name.
    pub capture_name: bool,
    /// The form asks for the visitor's phone.
    pub capture_phone: bool,
    /// Tracking pixel id.
    pub pixel_id: Option<String>,
    /// Tracking pixel event.
    pub pixel_event: Option<String>,
}

impl From<&Link> for FormDescriptor {
    fn from(link: &Link) -> Self {
        Self {
            link_id: link.id,
            name: link.name.clone(),
            slug: link.slug.clone(),
            mode: link.mode,
            capture_name: link.capture_name,
            capture_phone: link.capture_phone,
            pixel_id: link.pixel_id.clone(),
            pixel_event: link.pixel_event.clone(),
        }
    }
}

/// Request body for `POST /r/{slug}`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FormSubmission {
    /// Visitor name.
    #[serde(default)]
    pub name: Option<String>,
    /// Visitor phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// `utm_source` tag carried over from the landing URL.
    #[serde(default)]
    pub utm_source: Option<String>,
    /// `utm_campaign` tag carried over from the landing URL.
    #[serde(default)]
    pub utm_campaign: Option<String>,
}

impl FormSubmission {
    /// Converts the submission into normalized visitor details.
    #[must_use]
    pub fn into_visitor(self, attribution: Attribution) -> VisitorInfo {
        VisitorInfo {
            name: self.name,
            phone: self.phone,
            attribution: Attribution {
                utm_source: self.utm_source.or(attribution.utm_source),
                utm_campaign: self.utm_campaign.or(attribution.utm_campaign),
                ..attribution
            },
        }
        .normalized()
    }
}

/// Hand-off answer for a submitted form.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HandoffResponse {
    /// WhatsApp deep link for the hand-off.
    pub whatsapp_url: String,
    /// Contact phone the visitor was assigned to.
    pub assigned_to: String,
    /// Recorded lead.
    pub lead_id: LeadId,
    /// Tracking pixel id to fire before redirecting.
    pub pixel_id: Option<String>,
    /// Tracking pixel event to fire before redirecting.
    pub pixel_event: Option<String>,
}

impl HandoffResponse {
    /// Builds the hand-off answer for `link`.
    #[must_use]
    pub fn new(link: &Link, assignment: &Assignment) -> Self {
        Self {
            whatsapp_url: whatsapp_url(
                &assignment.contact.phone,
                link.message_template.as_deref(),
                assignment.lead.visitor.name.as_deref(),
            ),
            assigned_to: assignment.contact.phone.clone(),
            lead_id: assignment.lead.id,
            pixel_id: link.pixel_id.clone(),
            pixel_event: link.pixel_event.clone(),
        }
    }
}
