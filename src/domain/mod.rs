//! Domain layer: core types, rotation invariants, and the event system.
//!
//! This module contains the link, contact, cursor, and lead model, the
//! pure selection and reordering rules they obey, WhatsApp hand-off
//! composition, and the event bus for broadcasting state changes.

pub mod contact;
pub mod cursor;
pub mod event;
pub mod event_bus;
pub mod handoff;
pub mod ids;
pub mod lead;
pub mod link;

pub use contact::Contact;
pub use cursor::{CursorAdvance, RotationCursor};
pub use event::RotationEvent;
pub use event_bus::EventBus;
pub use ids::{ContactId, LeadId, LinkId};
pub use lead::{Attribution, Lead, VisitorInfo};
pub use link::{Link, LinkFilter, LinkMode, LinkPatch, LinkStatus, LinkSummary, NewLink};
