//! Service layer: business logic orchestration.
//!
//! [`AssignmentService`] runs the visitor-to-contact rotation and
//! [`LinkService`] covers everything operators do to links. Both talk to
//! a [`crate::store::RotationStore`] and emit events through the
//! [`super::domain::EventBus`].

pub mod assignment_service;
pub mod link_service;

pub use assignment_service::{Assignment, AssignmentService};
pub use link_service::{LinkService, LinkStats};
