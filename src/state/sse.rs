use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Per-session fan-out hubs keyed by pin.
///
/// A hub is created lazily on the first subscribe or publish for a pin and
/// preserves publish order for that pin. Hubs for dead sessions are dropped by
/// the sweeper.
pub struct SseState {
    hubs: DashMap<String, SseHub>,
    capacity: usize,
}

impl SseState {
    /// Build the fan-out registry with a per-hub channel capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Register a new subscriber for `pin` that will receive subsequent events.
    pub fn subscribe(&self, pin: &str) -> broadcast::Receiver<ServerEvent> {
        self.hubs
            .entry(pin.to_string())
            .or_insert_with(|| SseHub::new(self.capacity))
            .subscribe()
    }

    /// Deliver an event to all current subscribers of `pin`, in publish order.
    /// Publishing to a pin nobody observes yet is not an error.
    pub fn broadcast(&self, pin: &str, event: ServerEvent) {
        self.hubs
            .entry(pin.to_string())
            .or_insert_with(|| SseHub::new(self.capacity))
            .broadcast(event);
    }

    /// Drop the hub for a session that no longer exists, disconnecting its
    /// remaining subscribers.
    pub fn remove(&self, pin: &str) {
        self.hubs.remove(pin);
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
