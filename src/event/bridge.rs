//! Outbound actions and the bridge that carries them to the host.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Error, Result};

/// An opaque request for the host (open a file, show a message, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Outbound transport to the host.
pub trait Bridge {
    fn send(&mut self, action: &Action) -> Result<(), BridgeError>;
}

impl<B: Bridge + ?Sized> Bridge for &mut B {
    fn send(&mut self, action: &Action) -> Result<(), BridgeError> {
        (**self).send(action)
    }
}

// ---------------------------------------------------------------------------
// JsonLinesBridge
// ---------------------------------------------------------------------------

/// Writes each action as one line of JSON.
#[derive(Debug)]
pub struct JsonLinesBridge<W> {
    writer: W,
}

impl<W: Write> JsonLinesBridge<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Bridge for JsonLinesBridge<W> {
    fn send(&mut self, action: &Action) -> Result<(), BridgeError> {
        let mut line = serde_json::to_vec(action)?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .and_then(|()| self.writer.flush())
            .map_err(|err| BridgeError::Other(err.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Shared queue of actions waiting for a bridge.
///
/// Clones share the queue, so hooks can hold an `Outbox` and push actions
/// while the app owns the bridge.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    queue: Rc<RefCell<VecDeque<Action>>>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, action: Action) {
        self.queue.borrow_mut().push_back(action);
    }

    /// Queue an action built from `name` and `payload`.
    pub fn send(&self, name: impl Into<String>, payload: Value) {
        self.push(Action::new(name, payload));
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Send queued actions in order.
    ///
    /// Stops at the first bridge failure; that action and everything after
    /// it stay queued. Returns how many actions were delivered.
    pub fn flush(&self, bridge: &mut impl Bridge) -> Result<usize> {
        let mut delivered = 0;
        loop {
            let next = self.queue.borrow().front().cloned();
            let Some(action) = next else {
                break;
            };
            bridge.send(&action).map_err(|source| Error::Bridge {
                action: action.name.clone(),
                source,
            })?;
            self.queue.borrow_mut().pop_front();
            delivered += 1;
        }
        if delivered > 0 {
            tracing::debug!(delivered, "actions flushed");
        }
        Ok(delivered)
    }
}
