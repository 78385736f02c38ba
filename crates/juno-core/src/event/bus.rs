//! Broadcast bus for `ShellEvent`s.
//!
//! Built on `tokio::sync::broadcast`: any number of presenters can subscribe,
//! and publishing with no subscribers is a no-op.

use juno_types::event::ShellEvent;
use juno_types::llm::LlmError;
use tokio::sync::broadcast;

use crate::conversation::ConversationObserver;

/// Multi-consumer bus for UI notifications.
///
/// Cloning the bus clones the sender.
pub struct EventBus {
    sender: broadcast::Sender<ShellEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity. Slow subscribers that
    /// fall more than `capacity` events behind observe `Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShellEvent> {
        self.sender.subscribe()
    }

    /// Publish to all current subscribers; dropped if there are none.
    pub fn publish(&self, event: ShellEvent) {
        let _ = self.sender.send(event);
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

/// Conversation observer that republishes every callback on an [`EventBus`].
#[derive(Debug, Clone)]
pub struct BusObserver {
    bus: EventBus,
}

impl BusObserver {
    pub fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl ConversationObserver for BusObserver {
    fn on_start(&self) {
        self.bus.publish(ShellEvent::StreamStart);
    }

    fn on_chunk(&self, delta: &str) {
        self.bus.publish(ShellEvent::Chunk(delta.to_string()));
    }

    fn on_update(&self, text: &str) {
        self.bus.publish(ShellEvent::StreamUpdate(text.to_string()));
    }

    fn on_end(&self, text: &str) {
        self.bus.publish(ShellEvent::StreamEnd(text.to_string()));
    }

    fn on_error(&self, error: &LlmError) {
        self.bus.publish(ShellEvent::Error(error.to_string()));
    }

    fn on_function_call(&self, description: &str) {
        self.bus.publish(ShellEvent::FunctionCall(description.to_string()));
    }
}
