//! Event plumbing: inbound events from the host, outbound actions to it.

pub mod bridge;
pub mod queue;

pub use bridge::{Action, Bridge, JsonLinesBridge, Outbox};
pub use queue::{EventQueue, InboundEvent};
