//! In-memory collaborators for tests.
//!
//! [`MemorySink`] applies patches to per-destination line buffers and records
//! every patch it receives. [`MemoryBridge`] records outbound actions. Both are
//! cheap handles: clones share state, so a test can keep one clone while the
//! driver or app owns another.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::BridgeError;
use crate::event::{Action, Bridge};
use crate::render::{AsyncBufferSink, BufferSink, DestinationId, Patch, SinkError};

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SinkState {
    buffers: HashMap<DestinationId, Vec<String>>,
    patches: Vec<(DestinationId, Patch)>,
    fail_next: Option<SinkError>,
}

/// Buffer sink backed by in-memory line vectors.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Rc<RefCell<SinkState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of `destination`.
    pub fn lines(&self, destination: DestinationId) -> Vec<String> {
        self.state
            .borrow()
            .buffers
            .get(&destination)
            .cloned()
            .unwrap_or_default()
    }

    /// Accepted patches for `destination`, oldest first.
    pub fn patches(&self, destination: DestinationId) -> Vec<Patch> {
        self.state
            .borrow()
            .patches
            .iter()
            .filter(|(dest, _)| *dest == destination)
            .map(|(_, patch)| patch.clone())
            .collect()
    }

    /// The most recently accepted patch for `destination`.
    pub fn last_patch(&self, destination: DestinationId) -> Option<Patch> {
        self.patches(destination).pop()
    }

    /// Number of accepted patches across all destinations.
    pub fn call_count(&self) -> usize {
        self.state.borrow().patches.len()
    }

    /// Make the next `update_content` call fail with `err`.
    pub fn fail_next(&self, err: SinkError) {
        self.state.borrow_mut().fail_next = Some(err);
    }

    fn apply(&self, destination: DestinationId, patch: &Patch) -> Result<(), SinkError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        let buffer = state.buffers.entry(destination).or_default();
        *buffer = patch.apply(buffer.as_slice());
        state.patches.push((destination, patch.clone()));
        Ok(())
    }
}

impl BufferSink for MemorySink {
    fn update_content(
        &mut self,
        destination: DestinationId,
        patch: &Patch,
    ) -> Result<(), SinkError> {
        self.apply(destination, patch)
    }
}

impl AsyncBufferSink for MemorySink {
    async fn update_content(
        &self,
        destination: DestinationId,
        patch: &Patch,
    ) -> Result<(), SinkError> {
        tokio::task::yield_now().await;
        self.apply(destination, patch)
    }
}

// ---------------------------------------------------------------------------
// MemoryBridge
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct BridgeState {
    actions: Vec<Action>,
    fail_next: Option<BridgeError>,
}

/// Bridge that records every delivered action.
#[derive(Debug, Clone, Default)]
pub struct MemoryBridge {
    state: Rc<RefCell<BridgeState>>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivered actions, oldest first.
    pub fn actions(&self) -> Vec<Action> {
        self.state.borrow().actions.clone()
    }

    /// Make the next `send` fail with `err`.
    pub fn fail_next(&self, err: BridgeError) {
        self.state.borrow_mut().fail_next = Some(err);
    }
}

impl Bridge for MemoryBridge {
    fn send(&mut self, action: &Action) -> Result<(), BridgeError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.fail_next.take() {
            return Err(err);
        }
        state.actions.push(action.clone());
        Ok(())
    }
}
