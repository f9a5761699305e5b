//! Per-connection subscription manager.
//!
//! Tracks which links a WebSocket client follows and filters the event
//! stream server-side.

use std::collections::HashSet;

use crate::domain::{LinkId, RotationEvent};

/// Wildcard entry matching every link.
pub const WILDCARD: &str = "*";

/// Link targets parsed from a subscribe or unsubscribe command.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct LinkTargets {
    /// Well-formed link ids.
    pub ids: Vec<LinkId>,
    /// Whether `"*"` was present.
    pub wildcard: bool,
    /// Entries that were neither `"*"` nor a UUID.
    pub rejected: Vec<String>,
}

/// Splits raw command entries into ids, the wildcard, and rejects.
#[must_use]
pub fn parse_targets(raw: &[String]) -> LinkTargets {
    let mut targets = LinkTargets::default();
    for entry in raw {
        let entry = entry.trim();
        if entry == WILDCARD {
            targets.wildcard = true;
        } else if let Ok(uuid) = entry.parse::<uuid::Uuid>() {
            targets.ids.push(LinkId::from_uuid(uuid));
        } else {
            targets.rejected.push(entry.to_string());
        }
    }
    targets
}

/// Manages the set of link subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed link IDs. Ignored while `subscribe_all` is set.
    link_ids: HashSet<LinkId>,
    /// Whether the client follows every link (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the targets to the subscription set.
    pub fn subscribe(&mut self, targets: &LinkTargets) {
        self.subscribe_all |= targets.wildcard;
        self.link_ids.extend(targets.ids.iter().copied());
    }

    /// Removes the targets; `"*"` turns the wildcard off.
    pub fn unsubscribe(&mut self, targets: &LinkTargets) {
        if targets.wildcard {
            self.subscribe_all = false;
        }
        for id in &targets.ids {
            self.link_ids.remove(id);
        }
    }

    /// Returns `true` if events of `link_id` should be forwarded.
    #[must_use]
    pub fn matches(&self, link_id: LinkId) -> bool {
        self.subscribe_all || self.link_ids.contains(&link_id)
    }

    /// Returns `true` if `event` should be forwarded.
    #[must_use]
    pub fn wants(&self, event: &RotationEvent) -> bool {
        self.matches(event.link_id())
    }

    /// Returns the number of explicitly subscribed link IDs.
    #[must_use]
    pub fn count(&self) -> usize {
        self.link_ids.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
