//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::{AssignmentService, LinkService};
use crate::store::RotationStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Link lifecycle, contacts, and reporting.
    pub link_service: Arc<LinkService>,
    /// Round-robin visitor assignment.
    pub assignment_service: Arc<AssignmentService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires both services over one store and one event bus.
    #[must_use]
    pub fn new(store: Arc<dyn RotationStore>, event_bus: EventBus) -> Self {
        Self {
            link_service: Arc::new(LinkService::new(Arc::clone(&store), event_bus.clone())),
            assignment_service: Arc::new(AssignmentService::new(store, event_bus.clone())),
            event_bus,
        }
    }

    /// Replaces the assignment service, e.g. to apply a retry policy.
    #[must_use]
    pub fn with_assignment_service(mut self, service: AssignmentService) -> Self {
        self.assignment_service = Arc::new(service);
        self
    }
}
