//! Inbound event queue.
//!
//! The host reports user interaction as [`InboundEvent`] triples. They are
//! queued with `push` and routed into a [`LifecycleRegistry`] by `dispatch`.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::component::LifecycleRegistry;

// ---------------------------------------------------------------------------
// InboundEvent
// ---------------------------------------------------------------------------

/// An event addressed to one component's named handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub component_id: String,
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

impl InboundEvent {
    pub fn new(component_id: impl Into<String>, name: impl Into<String>, payload: Value) -> Self {
        Self {
            component_id: component_id.into(),
            name: name.into(),
            payload,
        }
    }

    /// Decode an event from its JSON form.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// ---------------------------------------------------------------------------
// EventQueue
// ---------------------------------------------------------------------------

/// FIFO of inbound events awaiting dispatch.
#[derive(Debug, Default)]
pub struct EventQueue {
    queue: VecDeque<InboundEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InboundEvent) {
        self.queue.push_back(event);
    }

    /// Take every pending event, oldest first.
    pub fn drain(&mut self) -> Vec<InboundEvent> {
        self.queue.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Route every pending event into `registry`, in order.
    ///
    /// Returns how many events reached a handler that completed.
    pub fn dispatch(&mut self, registry: &mut LifecycleRegistry) -> usize {
        self.drain()
            .into_iter()
            .filter(|event| registry.trigger_event(&event.component_id, &event.name, &event.payload))
            .count()
    }
}
