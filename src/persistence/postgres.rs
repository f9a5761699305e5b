//! PostgreSQL implementation of the storage traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::models::{ContactRow, CursorRow, LeadRow, LinkListRow, LinkRow};
use crate::config::RotatorConfig;
use crate::domain::contact::{build_contacts, relocate, renumber, sanitize_phones};
use crate::domain::cursor::select_index;
use crate::domain::{
    Contact, CursorAdvance, Lead, Link, LinkFilter, LinkId, LinkPatch, LinkSummary, NewLink,
    RotationCursor,
};
use crate::error::RotatorError;
use crate::store::{ContactListStore, CursorStore, LeadStore, LinkStore};

const LINK_COLUMNS: &str = "id, name, slug, mode, message_template, capture_name, \
     capture_phone, pixel_id, pixel_event, campaign, enabled, total_clicks, total_leads, \
     last_lead_at, created_at, updated_at";

/// SQLSTATE codes that mean "try again": lock_not_available,
/// serialization_failure, deadlock_detected, query_canceled.
const TRANSIENT_SQLSTATES: [&str; 4] = ["55P03", "40001", "40P01", "57014"];

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    cursor_lock_timeout: Duration,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool, cursor_lock_timeout: Duration) -> Self {
        Self {
            pool,
            cursor_lock_timeout,
        }
    }

    /// Opens a connection pool from configuration and applies migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`RotatorError::PersistenceError`] if the database is
    /// unreachable or a migration fails.
    pub async fn connect(config: &RotatorConfig) -> Result<Self, RotatorError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| RotatorError::PersistenceError(e.to_string()))?;
        let store = Self::new(pool, config.cursor_lock_timeout());
        store.migrate().await?;
        Ok(store)
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`RotatorError::PersistenceError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), RotatorError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RotatorError::PersistenceError(e.to_string()))
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, RotatorError> {
        self.pool.begin().await.map_err(map_db_error)
    }

    /// Locks the link row for the rest of the transaction.
    async fn lock_link(
        tx: &mut Transaction<'static, Postgres>,
        link_id: LinkId,
    ) -> Result<(), RotatorError> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM links WHERE id = $1 FOR UPDATE")
            .bind(link_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_db_error)?
            .map(|_| ())
            .ok_or_else(|| RotatorError::link_not_found(link_id))
    }

    async fn ensure_link(&self, link_id: LinkId) -> Result<(), RotatorError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM links WHERE id = $1)")
            .bind(link_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        if exists {
            Ok(())
        } else {
            Err(RotatorError::link_not_found(link_id))
        }
    }

    async fn fetch_contacts(
        executor: impl sqlx::PgExecutor<'_>,
        link_id: LinkId,
    ) -> Result<Vec<Contact>, RotatorError> {
        sqlx::query_as::<_, ContactRow>(
            "SELECT id, link_id, phone, position, created_at FROM contacts \
             WHERE link_id = $1 ORDER BY position ASC",
        )
        .bind(link_id.as_uuid())
        .fetch_all(executor)
        .await
        .map_err(map_db_error)?
        .into_iter()
        .map(Contact::try_from)
        .collect()
    }
}

/// Maps a `sqlx` error onto the rotator taxonomy.
fn map_db_error(err: sqlx::Error) -> RotatorError {
    match &err {
        sqlx::Error::PoolTimedOut => RotatorError::Transient(err.to_string()),
        sqlx::Error::Database(db)
            if db
                .code()
                .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&code.as_ref())) =>
        {
            RotatorError::Transient(err.to_string())
        }
        _ => RotatorError::PersistenceError(err.to_string()),
    }
}

/// Maps a write error, turning a slug unique violation into `SlugTaken`.
fn map_slug_error(err: sqlx::Error, slug: &str) -> RotatorError {
    if let sqlx::Error::Database(db) = &err
        && db.is_unique_violation()
        && db.constraint() == Some("links_slug_key")
    {
        return RotatorError::SlugTaken(slug.to_string());
    }
    map_db_error(err)
}

/// Maps a write error, turning a missing parent link into `LinkNotFound`.
fn map_fk_error(err: sqlx::Error, link_id: LinkId) -> RotatorError {
    if let sqlx::Error::Database(db) = &err
        && db.is_foreign_key_violation()
    {
        return RotatorError::link_not_found(link_id);
    }
    map_db_error(err)
}

fn to_i32(value: usize) -> Result<i32, RotatorError> {
    i32::try_from(value).map_err(|_| RotatorError::InvalidRequest(format!("position {value} too large")))
}

fn to_i64(value: u64) -> Result<i64, RotatorError> {
    i64::try_from(value).map_err(|_| RotatorError::Internal(format!("value {value} exceeds i64")))
}

#[async_trait]
impl LinkStore for PostgresStore {
    async fn create_link(&self, new: NewLink) -> Result<Link, RotatorError> {
        let link = Link::from_new(new);
        let mut tx = self.begin().await?;

        sqlx::query(
            "INSERT INTO links (id, name, slug, mode, message_template, capture_name, \
             capture_phone, pixel_id, pixel_event, campaign, enabled, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(link.id.as_uuid())
        .bind(&link.name)
        .bind(&link.slug)
        .bind(link.mode.as_str())
        .bind(&link.message_template)
        .bind(link.capture_name)
        .bind(link.capture_phone)
        .bind(&link.pixel_id)
        .bind(&link.pixel_event)
        .bind(&link.campaign)
        .bind(link.enabled)
        .bind(link.created_at)
        .bind(link.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_slug_error(e, &link.slug))?;

        sqlx::query("INSERT INTO rotation_cursors (link_id) VALUES ($1)")
            .bind(link.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(link)
    }

    async fn get_link(&self, id: LinkId) -> Result<Link, RotatorError> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| RotatorError::link_not_found(id))?;
        Link::try_from(row)
    }

    async fn get_link_by_slug(&self, slug: &str) -> Result<Link, RotatorError> {
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| RotatorError::link_not_found(slug))?;
        Link::try_from(row)
    }

    async fn update_link(&self, id: LinkId, patch: LinkPatch) -> Result<Link, RotatorError> {
        let mut tx = self.begin().await?;
        let row = sqlx::query_as::<_, LinkRow>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| RotatorError::link_not_found(id))?;

        let mut link = Link::try_from(row)?;
        link.apply(patch);

        sqlx::query(
            "UPDATE links SET name = $2, slug = $3, mode = $4, message_template = $5, \
             capture_name = $6, capture_phone = $7, pixel_id = $8, pixel_event = $9, \
             campaign = $10, enabled = $11, updated_at = $12 WHERE id = $1",
        )
        .bind(link.id.as_uuid())
        .bind(&link.name)
        .bind(&link.slug)
        .bind(link.mode.as_str())
        .bind(&link.message_template)
        .bind(link.capture_name)
        .bind(link.capture_phone)
        .bind(&link.pixel_id)
        .bind(&link.pixel_event)
        .bind(&link.campaign)
        .bind(link.enabled)
        .bind(link.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_slug_error(e, &link.slug))?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(link)
    }

    async fn delete_link(&self, id: LinkId) -> Result<(), RotatorError> {
        let result = sqlx::query("DELETE FROM links WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(RotatorError::link_not_found(id));
        }
        Ok(())
    }

    async fn list_links(&self, filter: &LinkFilter) -> Result<Vec<LinkSummary>, RotatorError> {
        let rows = sqlx::query_as::<_, LinkListRow>(
            "SELECT l.*, (SELECT COUNT(*) FROM contacts c WHERE c.link_id = l.id) AS contact_count \
             FROM links l \
             WHERE ($1::TEXT IS NULL OR strpos(lower(l.name), lower($1)) > 0 OR strpos(l.slug, lower($1)) > 0) \
               AND ($2::TEXT IS NULL OR l.campaign = $2) \
             ORDER BY l.created_at DESC",
        )
        .bind(filter.query.as_deref())
        .bind(filter.campaign.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let summary = LinkSummary::try_from(row)?;
            if filter.matches(&summary) {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }

    async fn record_visit(&self, id: LinkId) -> Result<(), RotatorError> {
        let result = sqlx::query("UPDATE links SET total_clicks = total_clicks + 1 WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| RotatorError::AnalyticsUpdateFailed(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(RotatorError::link_not_found(id));
        }
        Ok(())
    }

    async fn record_lead_counters(
        &self,
        id: LinkId,
        at: DateTime<Utc>,
    ) -> Result<(), RotatorError> {
        let result = sqlx::query(
            "UPDATE links SET total_leads = total_leads + 1, \
             last_lead_at = GREATEST(COALESCE(last_lead_at, $2), $2) WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| RotatorError::AnalyticsUpdateFailed(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(RotatorError::link_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl ContactListStore for PostgresStore {
    async fn list_contacts(&self, link_id: LinkId) -> Result<Vec<Contact>, RotatorError> {
        let contacts = Self::fetch_contacts(&self.pool, link_id).await?;
        if contacts.is_empty() {
            self.ensure_link(link_id).await?;
        }
        Ok(contacts)
    }

    async fn replace_contacts(
        &self,
        link_id: LinkId,
        phones: Vec<String>,
    ) -> Result<Vec<Contact>, RotatorError> {
        let contacts = build_contacts(link_id, &sanitize_phones(phones));
        let mut tx = self.begin().await?;
        Self::lock_link(&mut tx, link_id).await?;

        sqlx::query("DELETE FROM contacts WHERE link_id = $1")
            .bind(link_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        for contact in &contacts {
            sqlx::query(
                "INSERT INTO contacts (id, link_id, phone, position, created_at) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(contact.id.as_uuid())
            .bind(link_id.as_uuid())
            .bind(&contact.phone)
            .bind(to_i32(contact.position)?)
            .bind(contact.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        sqlx::query("UPDATE links SET updated_at = now() WHERE id = $1")
            .bind(link_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(contacts)
    }

    async fn move_contact(
        &self,
        link_id: LinkId,
        from: usize,
        to: usize,
    ) -> Result<Vec<Contact>, RotatorError> {
        let mut tx = self.begin().await?;
        Self::lock_link(&mut tx, link_id).await?;
        let mut contacts = Self::fetch_contacts(&mut *tx, link_id).await?;

        let len = contacts.len();
        if from >= len {
            return Err(RotatorError::PositionOutOfRange {
                position: from,
                len,
            });
        }
        if !relocate(&mut contacts, from, to) || from == to {
            return Ok(contacts);
        }

        let before: Vec<usize> = contacts.iter().map(|c| c.position).collect();
        renumber(&mut contacts);
        // The (link_id, position) constraint is deferred to commit.
        for (contact, old) in contacts.iter().zip(before) {
            if contact.position == old {
                continue;
            }
            sqlx::query("UPDATE contacts SET position = $2 WHERE id = $1")
                .bind(contact.id.as_uuid())
                .bind(to_i32(contact.position)?)
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
        }

        sqlx::query("UPDATE links SET updated_at = now() WHERE id = $1")
            .bind(link_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(contacts)
    }
}

#[async_trait]
impl CursorStore for PostgresStore {
    async fn advance(
        &self,
        link_id: LinkId,
        contact_count: usize,
    ) -> Result<CursorAdvance, RotatorError> {
        if contact_count == 0 {
            return Err(RotatorError::NoContacts(*link_id.as_uuid()));
        }

        let mut tx = self.begin().await?;
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.cursor_lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        // One statement: row lock, read, increment, and write.
        let advanced = sqlx::query_scalar::<_, i64>(
            "INSERT INTO rotation_cursors (link_id, current_index, updated_at) \
             VALUES ($1, 1, now()) \
             ON CONFLICT (link_id) DO UPDATE \
             SET current_index = COALESCE(rotation_cursors.current_index, 0) + 1, \
                 updated_at = now() \
             RETURNING current_index",
        )
        .bind(link_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_fk_error(e, link_id))?;

        tx.commit().await.map_err(map_db_error)?;

        let slot = u64::try_from(advanced.saturating_sub(1)).map_err(|_| {
            RotatorError::PersistenceError(format!("negative cursor value: {advanced}"))
        })?;
        let selected_index = select_index(slot, contact_count)
            .ok_or(RotatorError::NoContacts(*link_id.as_uuid()))?;
        Ok(CursorAdvance {
            slot,
            selected_index,
        })
    }

    async fn cursor(&self, link_id: LinkId) -> Result<RotationCursor, RotatorError> {
        let row = sqlx::query_as::<_, CursorRow>(
            "SELECT link_id, current_index, updated_at FROM rotation_cursors WHERE link_id = $1",
        )
        .bind(link_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?
        .ok_or_else(|| RotatorError::link_not_found(link_id))?;
        RotationCursor::try_from(row)
    }
}

#[async_trait]
impl LeadStore for PostgresStore {
    async fn insert_lead(&self, lead: &Lead) -> Result<(), RotatorError> {
        sqlx::query(
            "INSERT INTO leads (id, link_id, contact_id, assigned_to, rotation_slot, name, phone, \
             utm_source, utm_campaign, user_agent, ip_address, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(lead.id.as_uuid())
        .bind(lead.link_id.as_uuid())
        .bind(lead.contact_id.as_uuid())
        .bind(&lead.assigned_to)
        .bind(to_i64(lead.rotation_slot)?)
        .bind(&lead.visitor.name)
        .bind(&lead.visitor.phone)
        .bind(&lead.visitor.attribution.utm_source)
        .bind(&lead.visitor.attribution.utm_campaign)
        .bind(&lead.visitor.attribution.user_agent)
        .bind(&lead.visitor.attribution.ip_address)
        .bind(lead.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_fk_error(e, lead.link_id))?;
        Ok(())
    }

    async fn list_leads(
        &self,
        link_id: LinkId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Lead>, RotatorError> {
        self.ensure_link(link_id).await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        sqlx::query_as::<_, LeadRow>(
            "SELECT id, link_id, contact_id, assigned_to, rotation_slot, name, phone, \
             utm_source, utm_campaign, user_agent, ip_address, created_at \
             FROM leads WHERE link_id = $1 \
             ORDER BY created_at DESC, rotation_slot DESC LIMIT $2 OFFSET $3",
        )
        .bind(link_id.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?
        .into_iter()
        .map(Lead::try_from)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_is_transient() {
        assert!(map_db_error(sqlx::Error::PoolTimedOut).is_retryable());
    }

    #[test]
    fn row_not_found_is_persistence_error() {
        assert!(matches!(
            map_db_error(sqlx::Error::RowNotFound),
            RotatorError::PersistenceError(_)
        ));
    }

    #[test]
    fn position_conversion_bounds() {
        assert_eq!(to_i32(3).ok(), Some(3));
        assert!(to_i32(usize::MAX).is_err());
    }
}
