//! Immutable assignment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Contact, ContactId, CursorAdvance, LeadId, LinkId};

/// Traffic-source tags supplied by the request layer, stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Attribution {
    /// `utm_source` query parameter.
    #[serde(default)]
    pub utm_source: Option<String>,
    /// `utm_campaign` query parameter.
    #[serde(default)]
    pub utm_campaign: Option<String>,
    /// Visitor user agent.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Visitor IP address as seen by the request layer.
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// Optional visitor details collected before assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct VisitorInfo {
    /// Visitor name (form mode).
    #[serde(default)]
    pub name: Option<String>,
    /// Visitor phone (form mode).
    #[serde(default)]
    pub phone: Option<String>,
    /// Traffic-source tags.
    #[serde(default, flatten)]
    pub attribution: Attribution,
}

impl VisitorInfo {
    /// Drops blank name/phone values and trims the rest.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            name: non_blank(self.name),
            phone: non_blank(self.phone),
            attribution: self.attribution,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// One completed visitor-to-contact assignment.
///
/// `assigned_to` is copied from the contact at assignment time, so the
/// record stays meaningful after the contact is edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Lead {
    /// Lead identifier.
    pub id: LeadId,
    /// Link the visitor came through.
    pub link_id: LinkId,
    /// Contact selected for this visitor.
    pub contact_id: ContactId,
    /// Contact phone as resolved at assignment time.
    pub assigned_to: String,
    /// Raw cursor slot consumed by this assignment.
    pub rotation_slot: u64,
    /// Visitor details and attribution.
    pub visitor: VisitorInfo,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Builds the lead for a contact selected by `advance`.
    #[must_use]
    pub fn record(contact: &Contact, advance: CursorAdvance, visitor: VisitorInfo) -> Self {
        Self {
            id: LeadId::new(),
            link_id: contact.link_id,
            contact_id: contact.id,
            assigned_to: contact.phone.clone(),
            rotation_slot: advance.slot,
            visitor,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn normalized_drops_blank_fields() {
        let visitor = VisitorInfo {
            name: Some("  Ana ".to_string()),
            phone: Some("   ".to_string()),
            attribution: Attribution::default(),
        }
        .normalized();
        assert_eq!(visitor.name.as_deref(), Some("Ana"));
        assert_eq!(visitor.phone, None);
    }

    #[test]
    fn lead_copies_contact_phone() {
        let contact = Contact {
            id: ContactId::new(),
            link_id: LinkId::new(),
            phone: "+551111".to_string(),
            position: 0,
            created_at: Utc::now(),
        };
        let advance = CursorAdvance {
            slot: 9,
            selected_index: 0,
        };
        let lead = Lead::record(&contact, advance, VisitorInfo::default());
        assert_eq!(lead.assigned_to, "+551111");
        assert_eq!(lead.contact_id, contact.id);
        assert_eq!(lead.link_id, contact.link_id);
        assert_eq!(lead.rotation_slot, 9);
    }

    #[test]
    fn attribution_flattens_into_visitor_json() {
        let json = r#"{"name":"Ana","utm_source":"ig","user_agent":"curl"}"#;
        let Ok(visitor) = serde_json::from_str::<VisitorInfo>(json) else {
            panic!("valid visitor json");
        };
        assert_eq!(visitor.attribution.utm_source.as_deref(), Some("ig"));
        assert_eq!(visitor.attribution.user_agent.as_deref(), Some("curl"));
        assert_eq!(visitor.phone, None);
    }
}
