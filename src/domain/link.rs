//! Redirect link aggregate with its denormalized counters.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::LinkId;
use crate::error::RotatorError;

/// How a link hands visitors off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// Collect visitor details first, then assign on submission.
    #[default]
    Form,
    /// Assign immediately on visit and redirect.
    Direct,
}

impl LinkMode {
    /// Returns the mode as a static string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Form => "form",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkMode {
    type Err = RotatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "form" => Ok(Self::Form),
            "direct" => Ok(Self::Direct),
            other => Err(RotatorError::InvalidRequest(format!(
                "invalid link mode: {other}"
            ))),
        }
    }
}

/// Derived availability of a link.
///
/// Computed from the operator switch and the current contact list; never
/// stored authoritatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    /// Enabled and has at least one attendant.
    Active,
    /// Disabled by the operator.
    Inactive,
    /// Enabled but no attendants are configured.
    NoContacts,
}

impl LinkStatus {
    /// Derives the status: `inactive` wins over `no_contacts`.
    #[must_use]
    pub const fn derive(enabled: bool, contact_count: usize) -> Self {
        if !enabled {
            Self::Inactive
        } else if contact_count == 0 {
            Self::NoContacts
        } else {
            Self::Active
        }
    }
}

/// A published redirect configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Link {
    /// Unique link identifier (immutable after creation).
    pub id: LinkId,
    /// Human-readable name.
    pub name: String,
    /// Unique, normalized URL slug.
    pub slug: String,
    /// Hand-off mode.
    pub mode: LinkMode,
    /// Outbound message template; `{name}` is replaced by the visitor name.
    pub message_template: Option<String>,
    /// Whether the form asks for the visitor's name.
    pub capture_name: bool,
    /// Whether the form asks for the visitor's phone.
    pub capture_phone: bool,
    /// Tracking pixel id, passed through untouched.
    pub pixel_id: Option<String>,
    /// Tracking pixel event fired on hand-off.
    pub pixel_event: Option<String>,
    /// Free-form campaign label used for filtering.
    pub campaign: Option<String>,
    /// Operator switch; disabled links refuse assignments.
    pub enabled: bool,
    /// Number of recorded visits (cache).
    pub total_clicks: u64,
    /// Number of recorded leads (cache).
    pub total_leads: u64,
    /// Timestamp of the most recent lead (cache).
    pub last_lead_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last operator edit.
    pub updated_at: DateTime<Utc>,
}

impl Link {
    /// Builds a fresh link from a validated [`NewLink`].
    #[must_use]
    pub fn from_new(new: NewLink) -> Self {
        let now = Utc::now();
        Self {
            id: LinkId::new(),
            name: new.name,
            slug: new.slug,
            mode: new.mode,
            message_template: new.message_template,
            capture_name: new.capture_name,
            capture_phone: new.capture_phone,
            pixel_id: new.pixel_id,
            pixel_event: new.pixel_event,
            campaign: new.campaign,
            enabled: true,
            total_clicks: 0,
            total_leads: 0,
            last_lead_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a validated patch in place and bumps `updated_at`.
    pub fn apply(&mut self, patch: LinkPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(slug) = patch.slug {
            self.slug = slug;
        }
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }
        if let Some(template) = patch.message_template {
            self.message_template = template;
        }
        if let Some(capture_name) = patch.capture_name {
            self.capture_name = capture_name;
        }
        if let Some(capture_phone) = patch.capture_phone {
            self.capture_phone = capture_phone;
        }
        if let Some(pixel_id) = patch.pixel_id {
            self.pixel_id = pixel_id;
        }
        if let Some(pixel_event) = patch.pixel_event {
            self.pixel_event = pixel_event;
        }
        if let Some(campaign) = patch.campaign {
            self.campaign = campaign;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        self.updated_at = Utc::now();
    }
}

/// Validated input for creating a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    /// Human-readable name (non-blank).
    pub name: String,
    /// Normalized slug (non-empty).
    pub slug: String,
    /// Hand-off mode.
    pub mode: LinkMode,
    /// Outbound message template.
    pub message_template: Option<String>,
    /// Whether the form asks for the visitor's name.
    pub capture_name: bool,
    /// Whether the form asks for the visitor's phone.
    pub capture_phone: bool,
    /// Tracking pixel id.
    pub pixel_id: Option<String>,
    /// Tracking pixel event.
    pub pixel_event: Option<String>,
    /// Campaign label.
    pub campaign: Option<String>,
}

impl NewLink {
    /// Creates a form-mode link input with both capture flags on.
    ///
    /// # Errors
    ///
    /// Returns [`RotatorError::InvalidRequest`] if the name is blank or the
    /// slug normalizes to an empty string.
    pub fn new(name: &str, slug: &str) -> Result<Self, RotatorError> {
        Ok(Self {
            name: validate_name(name)?,
            slug: validate_slug(slug)?,
            mode: LinkMode::Form,
            message_template: None,
            capture_name: true,
            capture_phone: true,
            pixel_id: None,
            pixel_event: None,
            campaign: None,
        })
    }

    /// Sets the hand-off mode.
    #[must_use]
    pub fn with_mode(mut self, mode: LinkMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the message template.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.message_template = Some(template.into());
        self
    }
}

/// Partial update of a link. `None` leaves a field untouched; the inner
/// `Option` of nullable fields clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPatch {
    /// New name.
    pub name: Option<String>,
    /// New slug (already normalized).
    pub slug: Option<String>,
    /// New mode.
    pub mode: Option<LinkMode>,
    /// New or cleared template.
    pub message_template: Option<Option<String>>,
    /// New name-capture flag.
    pub capture_name: Option<bool>,
    /// New phone-capture flag.
    pub capture_phone: Option<bool>,
    /// New or cleared pixel id.
    pub pixel_id: Option<Option<String>>,
    /// New or cleared pixel event.
    pub pixel_event: Option<Option<String>>,
    /// New or cleared campaign.
    pub campaign: Option<Option<String>>,
    /// Operator enable/disable switch.
    pub enabled: Option<bool>,
}

/// Filter for link listings.
#[derive(Debug, Clone, Default)]
pub struct LinkFilter {
    /// Case-insensitive substring over name and slug.
    pub query: Option<String>,
    /// Exact campaign match.
    pub campaign: Option<String>,
    /// Derived status match.
    pub status: Option<LinkStatus>,
}

impl LinkFilter {
    /// Returns `true` if the summary passes every set criterion.
    #[must_use]
    pub fn matches(&self, summary: &LinkSummary) -> bool {
        if let Some(q) = self.query.as_deref() {
            let q = q.to_lowercase();
            if !summary.name.to_lowercase().contains(&q) && !summary.slug.contains(&q) {
                return false;
            }
        }
        if let Some(campaign) = self.campaign.as_deref()
            && summary.campaign.as_deref() != Some(campaign)
        {
            return false;
        }
        if let Some(status) = self.status
            && summary.status != status
        {
            return false;
        }
        true
    }
}

/// Lightweight summary of a link for list endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LinkSummary {
    /// Link identifier.
    pub id: LinkId,
    /// Link name.
    pub name: String,
    /// Link slug.
    pub slug: String,
    /// Hand-off mode.
    pub mode: LinkMode,
    /// Campaign label.
    pub campaign: Option<String>,
    /// Derived status.
    pub status: LinkStatus,
    /// Number of attendants.
    pub contact_count: usize,
    /// Recorded visits.
    pub total_clicks: u64,
    /// Recorded leads.
    pub total_leads: u64,
    /// Most recent lead.
    pub last_lead_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl LinkSummary {
    /// Builds a summary from a link and its current contact count.
    #[must_use]
    pub fn new(link: &Link, contact_count: usize) -> Self {
        Self {
            id: link.id,
            name: link.name.clone(),
            slug: link.slug.clone(),
            mode: link.mode,
            campaign: link.campaign.clone(),
            status: LinkStatus::derive(link.enabled, contact_count),
            contact_count,
            total_clicks: link.total_clicks,
            total_leads: link.total_leads,
            last_lead_at: link.last_lead_at,
            created_at: link.created_at,
        }
    }
}

/// Normalizes a slug: lowercase, and every character outside `[a-z0-9-]`
/// becomes `-`.
#[must_use]
pub fn normalize_slug(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Normalizes and validates a slug.
///
/// # Errors
///
/// Returns [`RotatorError::InvalidRequest`] if the slug is empty.
pub fn validate_slug(raw: &str) -> Result<String, RotatorError> {
    let slug = normalize_slug(raw);
    if slug.is_empty() {
        return Err(RotatorError::InvalidRequest(
            "slug must not be empty".to_string(),
        ));
    }
    Ok(slug)
}

/// Trims and validates a link name.
///
/// # Errors
///
/// Returns [`RotatorError::InvalidRequest`] if the name is blank.
pub fn validate_name(raw: &str) -> Result<String, RotatorError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(RotatorError::InvalidRequest(
            "name must not be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}
