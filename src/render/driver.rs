//! Synchronous patch driver.
//!
//! The `Driver` owns a [`BufferSink`] and the [`LineCache`]. `apply_diff`
//! diffs new lines against the cached ones, hands the patch to the sink
//! exactly once, and replaces the cache only after the sink accepted it.

use crate::error::{Error, Result};

use super::cache::LineCache;
use super::diff::{diff_lines_bounded, Patch, DEFAULT_MAX_DIFF_CELLS};
use super::sink::{BufferSink, DestinationId};

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Diff-and-apply pipeline over a synchronous buffer sink.
#[derive(Debug)]
pub struct Driver<S> {
    sink: S,
    cache: LineCache,
    max_diff_cells: usize,
}

impl<S: BufferSink> Driver<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            cache: LineCache::new(),
            max_diff_cells: DEFAULT_MAX_DIFF_CELLS,
        }
    }

    /// Set the alignment table limit passed to the diff.
    pub fn with_max_diff_cells(mut self, max_diff_cells: usize) -> Self {
        self.max_diff_cells = max_diff_cells;
        self
    }

    /// Diff `new_lines` against the cached lines for `destination` and send
    /// the patch to the sink.
    ///
    /// On success the cache holds `new_lines` verbatim. On sink failure the
    /// cache is untouched and the error is returned.
    pub fn apply_diff(&mut self, destination: DestinationId, new_lines: Vec<String>) -> Result<Patch> {
        let patch = diff_lines_bounded(
            self.cache.get(destination),
            new_lines.as_slice(),
            self.max_diff_cells,
        );
        self.sink
            .update_content(destination, &patch)
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
        self.cache.store(destination, new_lines);
        Ok(patch)
    }

    /// Truncate `destination` to nothing and forget its cached lines.
    pub fn clear_destination(&mut self, destination: DestinationId) -> Result<Patch> {
        let patch = self.apply_diff(destination, Vec::new())?;
        self.cache.evict(destination);
        Ok(patch)
    }

    /// Lines last accepted by the sink for `destination`.
    pub fn lines(&self, destination: DestinationId) -> &[String] {
        self.cache.get(destination)
    }

    /// Drop the cached lines for `destination` without touching the sink.
    /// The next `apply_diff` diffs against an empty baseline.
    pub fn forget(&mut self, destination: DestinationId) -> Option<Vec<String>> {
        self.cache.evict(destination)
    }

    pub fn cache(&self) -> &LineCache {
        &self.cache
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

// ===========================================================================
// Tests
// ===========================================================================
