//! Asynchronous patch driver.
//!
//! Each destination's cached lines sit behind a `tokio::sync::Mutex`. The
//! lock is held across the sink call, so overlapping `apply_diff` calls for
//! one destination complete in call order and each diffs against the lines
//! the previous call left behind. Different destinations do not wait on each
//! other.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tokio::sync::Mutex;

use crate::error::{Error, Result};

use super::diff::{diff_lines_bounded, Patch, DEFAULT_MAX_DIFF_CELLS};
use super::sink::{AsyncBufferSink, DestinationId};

type Slot = Rc<Mutex<Vec<String>>>;

/// Diff-and-apply pipeline over an asynchronous buffer sink.
#[derive(Debug)]
pub struct AsyncDriver<S> {
    sink: S,
    slots: RefCell<HashMap<DestinationId, Slot>>,
    max_diff_cells: usize,
}

impl<S: AsyncBufferSink> AsyncDriver<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            slots: RefCell::new(HashMap::new()),
            max_diff_cells: DEFAULT_MAX_DIFF_CELLS,
        }
    }

    pub fn with_max_diff_cells(mut self, max_diff_cells: usize) -> Self {
        self.max_diff_cells = max_diff_cells;
        self
    }

    /// Diff `new_lines` against the cached lines for `destination`, await the
    /// sink, then store `new_lines`. The cache is untouched on failure.
    pub async fn apply_diff(
        &self,
        destination: DestinationId,
        new_lines: Vec<String>,
    ) -> Result<Patch> {
        let slot = self.slot(destination);
        let mut cached = slot.lock().await;
        let patch = diff_lines_bounded(cached.as_slice(), new_lines.as_slice(), self.max_diff_cells);
        self.sink
            .update_content(destination, &patch)
            .await
            .map_err(|source| Error::Sink {
                destination,
                source,
            })?;
        tracing::debug!(
            destination = %destination,
            ops = patch.len(),
            changes = patch.change_count(),
            "patch applied"
        );
        *cached = new_lines;
        Ok(patch)
    }

    /// Lines last accepted for `destination`, once pending calls finish.
    pub async fn lines(&self, destination: DestinationId) -> Vec<String> {
        let slot = self.slot(destination);
        let cached = slot.lock().await;
        cached.clone()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn slot(&self, destination: DestinationId) -> Slot {
        self.slots
            .borrow_mut()
            .entry(destination)
            .or_default()
            .clone()
    }
}
