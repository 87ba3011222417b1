//! Entity-local topic dispatch.
//!
//! Every entity owns one [`EventRegistry`]. Events raised on an entity only
//! reach handlers registered on that same entity; there is no global bus.

use std::collections::HashMap;

use tracing::warn;

use super::EntityId;

/// Longest chain of follow-up events a single broadcast will deliver.
pub const MAX_FOLLOW_UP_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub topic: String,
    pub source: Option<EntityId>,
    pub amount: Option<f32>,
}

impl Event {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            source: None,
            amount: None,
        }
    }

    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_amount(mut self, amount: f32) -> Self {
        self.amount = Some(amount);
        self
    }
}

/// Events a handler wants raised on the same entity once the current event
/// has been delivered to every handler.
pub type FollowUps = Vec<Event>;

pub type EventHandler = Box<dyn FnMut(&Event, &mut FollowUps) + Send>;

#[derive(Default)]
pub struct EventRegistry {
    handlers: HashMap<String, Vec<EventHandler>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the list for `topic`. Handlers are never
    /// deduplicated and live as long as the registry.
    pub fn register(&mut self, topic: impl Into<String>, handler: EventHandler) {
        self.handlers.entry(topic.into()).or_default().push(handler);
    }

    pub fn handler_count(&self, topic: &str) -> usize {
        self.handlers.get(topic).map_or(0, Vec::len)
    }

    /// Delivers `event` to its topic's handlers in registration order, then
    /// delivers any follow-ups they produced, breadth first.
    ///
    /// Returns how many handler invocations ran.
    pub fn broadcast(&mut self, event: &Event) -> usize {
        let mut invoked = 0;
        let mut current = vec![event.clone()];
        let mut depth = 0;

        while !current.is_empty() {
            if depth > MAX_FOLLOW_UP_DEPTH {
                warn!(
                    topic = %event.topic,
                    dropped = current.len(),
                    "follow-up chain too deep, dropping remaining events"
                );
                break;
            }
            let mut next = FollowUps::new();
            for event in &current {
                let Some(handlers) = self.handlers.get_mut(&event.topic) else {
                    continue;
                };
                for handler in handlers.iter_mut() {
                    handler(event, &mut next);
                    invoked += 1;
                }
            }
            current = next;
            depth += 1;
        }

        invoked
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut topics: Vec<_> = self
            .handlers
            .iter()
            .map(|(topic, list)| (topic.as_str(), list.len()))
            .collect();
        topics.sort();
        f.debug_struct("EventRegistry")
            .field("topics", &topics)
            .finish()
    }
}
