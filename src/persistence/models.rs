//! Database row models and their conversion into domain types.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{
    Attribution, Contact, ContactId, Lead, LeadId, Link, LinkId, LinkSummary, RotationCursor,
    VisitorInfo,
};
use crate::error::RotatorError;

/// A row from the `links` table.
#[derive(Debug, Clone, FromRow)]
pub struct LinkRow {
    /// Primary key.
    pub id: Uuid,
    /// Link name.
    pub name: String,
    /// Unique slug.
    pub slug: String,
    /// `form` or `direct`.
    pub mode: String,
    /// Message template.
    pub message_template: Option<String>,
    /// Name-capture flag.
    pub capture_name: bool,
    /// Phone-capture flag.
    pub capture_phone: bool,
    /// Pixel id.
    pub pixel_id: Option<String>,
    /// Pixel event.
    pub pixel_event: Option<String>,
    /// Campaign label.
    pub campaign: Option<String>,
    /// Operator switch.
    pub enabled: bool,
    /// Visit counter.
    pub total_clicks: i64,
    /// Lead counter.
    pub total_leads: i64,
    /// Last lead timestamp.
    pub last_lead_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last edit timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A `links` row joined with its contact count.
#[derive(Debug, Clone, FromRow)]
pub struct LinkListRow {
    /// Link columns.
    #[sqlx(flatten)]
    pub link: LinkRow,
    /// Number of contacts.
    pub contact_count: i64,
}

/// A row from the `contacts` table.
#[derive(Debug, Clone, FromRow)]
pub struct ContactRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning link.
    pub link_id: Uuid,
    /// Phone or handle.
    pub phone: String,
    /// Zero-based position.
    pub position: i32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A row from the `rotation_cursors` table.
#[derive(Debug, Clone, FromRow)]
pub struct CursorRow {
    /// Owning link.
    pub link_id: Uuid,
    /// Consumed slot count; `NULL` before the first assignment.
    pub current_index: Option<i64>,
    /// Last advance.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A row from the `leads` table.
#[derive(Debug, Clone, FromRow)]
pub struct LeadRow {
    /// Primary key.
    pub id: Uuid,
    /// Link the visitor came through.
    pub link_id: Uuid,
    /// Selected contact (no foreign key).
    pub contact_id: Uuid,
    /// Contact phone at assignment time.
    pub assigned_to: String,
    /// Raw cursor slot consumed.
    pub rotation_slot: i64,
    /// Visitor name.
    pub name: Option<String>,
    /// Visitor phone.
    pub phone: Option<String>,
    /// `utm_source`.
    pub utm_source: Option<String>,
    /// `utm_campaign`.
    pub utm_campaign: Option<String>,
    /// User agent.
    pub user_agent: Option<String>,
    /// IP address.
    pub ip_address: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

fn non_negative(value: i64, column: &str) -> Result<u64, RotatorError> {
    u64::try_from(value)
        .map_err(|_| RotatorError::PersistenceError(format!("negative {column}: {value}")))
}

impl TryFrom<LinkRow> for Link {
    type Error = RotatorError;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: LinkId::from_uuid(row.id),
            name: row.name,
            slug: row.slug,
            mode: row
                .mode
                .parse()
                .map_err(|e| RotatorError::PersistenceError(format!("bad link row: {e}")))?,
            message_template: row.message_template,
            capture_name: row.capture_name,
            capture_phone: row.capture_phone,
            pixel_id: row.pixel_id,
            pixel_event: row.pixel_event,
            campaign: row.campaign,
            enabled: row.enabled,
            total_clicks: non_negative(row.total_clicks, "total_clicks")?,
            total_leads: non_negative(row.total_leads, "total_leads")?,
            last_lead_at: row.last_lead_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<LinkListRow> for LinkSummary {
    type Error = RotatorError;

    fn try_from(row: LinkListRow) -> Result<Self, Self::Error> {
        let count = usize::try_from(row.contact_count).map_err(|_| {
            RotatorError::PersistenceError(format!("bad contact count: {}", row.contact_count))
        })?;
        let link = Link::try_from(row.link)?;
        Ok(Self::new(&link, count))
    }
}

impl TryFrom<ContactRow> for Contact {
    type Error = RotatorError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ContactId::from_uuid(row.id),
            link_id: LinkId::from_uuid(row.link_id),
            phone: row.phone,
            position: usize::try_from(row.position).map_err(|_| {
                RotatorError::PersistenceError(format!("negative position: {}", row.position))
            })?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<CursorRow> for RotationCursor {
    type Error = RotatorError;

    fn try_from(row: CursorRow) -> Result<Self, Self::Error> {
        Ok(Self {
            link_id: LinkId::from_uuid(row.link_id),
            current_index: row
                .current_index
                .map(|v| non_negative(v, "current_index"))
                .transpose()?,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<LeadRow> for Lead {
    type Error = RotatorError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: LeadId::from_uuid(row.id),
            link_id: LinkId::from_uuid(row.link_id),
            contact_id: ContactId::from_uuid(row.contact_id),
            assigned_to: row.assigned_to,
            rotation_slot: non_negative(row.rotation_slot, "rotation_slot")?,
            visitor: VisitorInfo {
                name: row.name,
                phone: row.phone,
                attribution: Attribution {
                    utm_source: row.utm_source,
                    utm_campaign: row.utm_campaign,
                    user_agent: row.user_agent,
                    ip_address: row.ip_address,
                },
            },
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{LinkMode, LinkStatus};

    fn link_row() -> LinkRow {
        let now = Utc::now();
        LinkRow {
            id: Uuid::new_v4(),
            name: "Promo".to_string(),
            slug: "promo".to_string(),
            mode: "direct".to_string(),
            message_template: None,
            capture_name: false,
            capture_phone: false,
            pixel_id: None,
            pixel_event: None,
            campaign: None,
            enabled: true,
            total_clicks: 10,
            total_leads: 4,
            last_lead_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn link_row_converts() {
        let Ok(link) = Link::try_from(link_row()) else {
            panic!("conversion failed");
        };
        assert_eq!(link.mode, LinkMode::Direct);
        assert_eq!(link.total_clicks, 10);
    }

    #[test]
    fn bad_mode_is_persistence_error() {
        let mut row = link_row();
        row.mode = "carousel".to_string();
        assert!(matches!(
            Link::try_from(row),
            Err(RotatorError::PersistenceError(_))
        ));
    }

    #[test]
    fn list_row_derives_status() {
        let row = LinkListRow {
            link: link_row(),
            contact_count: 0,
        };
        let Ok(summary) = LinkSummary::try_from(row) else {
            panic!("conversion failed");
        };
        assert_eq!(summary.status, LinkStatus::NoContacts);
    }

    #[test]
    fn null_cursor_is_unstarted() {
        let row = CursorRow {
            link_id: Uuid::new_v4(),
            current_index: None,
            updated_at: None,
        };
        let Ok(cursor) = RotationCursor::try_from(row) else {
            panic!("conversion failed");
        };
        assert_eq!(cursor.next_slot(), 0);
    }
}
