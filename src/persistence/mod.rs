//! Persistence layer: PostgreSQL storage for links, contacts, cursors,
//! and leads.
//!
//! [`PostgresStore`] implements every [`crate::store`] trait over a
//! `sqlx::PgPool`. The schema lives in `migrations/` and is applied on
//! connect.

pub mod models;
pub mod postgres;

pub use postgres::PostgresStore;
