//! Fan-out of committed rotation changes to live listeners.
//!
//! Services publish a [`RotationEvent`] after each mutation has been
//! stored. Every WebSocket connection holds its own receiver and filters
//! by link on its side, so publishing never waits on a slow client.

use tokio::sync::broadcast;

use super::RotationEvent;

/// Broadcast bus for [`RotationEvent`]s.
///
/// A bounded `tokio::broadcast` ring. A receiver that falls more than
/// `capacity` events behind loses the oldest ones and sees
/// [`broadcast::error::RecvError::Lagged`] on its next read.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RotationEvent>,
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undelivered events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event and returns how many listeners got it.
    ///
    /// With no listeners the event is dropped and `0` is returned.
    pub fn publish(&self, event: RotationEvent) -> usize {
        let link_id = event.link_id();
        let kind = event.event_type_str();
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!(%link_id, kind, delivered, "rotation event published");
        delivered
    }

    /// Opens a receiver for events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RotationEvent> {
        self.sender.subscribe()
    }

    /// Number of open receivers, one per live feed connection.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::LinkId;
    use chrono::Utc;

    fn visit(link_id: LinkId) -> RotationEvent {
        RotationEvent::VisitRecorded {
            link_id,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_listeners_is_dropped() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(visit(LinkId::new())), 0);
    }

    #[tokio::test]
    async fn every_listener_sees_the_event() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let id = LinkId::new();
        assert_eq!(bus.publish(visit(id)), 2);

        for rx in [&mut first, &mut second] {
            let Ok(event) = rx.recv().await else {
                panic!("listener missed the event");
            };
            assert_eq!(event.link_id(), id);
        }
    }

    #[tokio::test]
    async fn lagging_listener_loses_oldest_events() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        let ids: Vec<LinkId> = (0..3).map(|_| LinkId::new()).collect();
        for id in &ids {
            bus.publish(visit(*id));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        let Ok(event) = rx.recv().await else {
            panic!("expected the second event");
        };
        assert_eq!(Some(&event.link_id()), ids.get(1));
    }

    #[test]
    fn receiver_count_follows_connections() {
        let bus = EventBus::new(16);
        let rx = bus.subscribe();
        assert_eq!(bus.receiver_count(), 1);
        drop(rx);
        assert_eq!(bus.receiver_count(), 0);
    }
}
