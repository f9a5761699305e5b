//! # lead-rotator
//!
//! REST and WebSocket gateway that hands each visitor of a published
//! redirect link to one of several WhatsApp attendants in strict
//! round-robin order, and records the resulting lead.
//!
//! The rotation cursor of each link is the only serialization point: it
//! is advanced by a single atomic read-modify-write and interpreted modulo
//! the contact count at read time, so operators can add, remove, and
//! reorder attendants while traffic flows.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)      ── /api/v1, /r/{slug}, /health
//!     ├── WS Handler (ws/)          ── /ws
//!     │
//!     ├── AssignmentService, LinkService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── RotationStore traits (store/)
//!     │     ├── MemoryStore
//!     │     └── PostgresStore (persistence/)
//!     │
//!     └── Rotation rules, hand-off URLs (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod store;
pub mod ws;
