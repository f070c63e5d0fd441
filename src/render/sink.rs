//! Buffer sink collaborators: the host side that applies patches.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use super::diff::Patch;

/// Addressable text region in the host editor (a buffer handle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(pub u64);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DestinationId {
    fn from(raw: u64) -> Self {
        DestinationId(raw)
    }
}

/// Failure reported by a buffer sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("patch rejected: {0}")]
    Rejected(String),
    #[error("destination is closed")]
    Closed,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Applies a patch to a destination's text, synchronously.
pub trait BufferSink {
    fn update_content(&mut self, destination: DestinationId, patch: &Patch)
        -> Result<(), SinkError>;
}

impl<S: BufferSink + ?Sized> BufferSink for &mut S {
    fn update_content(
        &mut self,
        destination: DestinationId,
        patch: &Patch,
    ) -> Result<(), SinkError> {
        (**self).update_content(destination, patch)
    }
}

impl<S: BufferSink + ?Sized> BufferSink for Box<S> {
    fn update_content(
        &mut self,
        destination: DestinationId,
        patch: &Patch,
    ) -> Result<(), SinkError> {
        (**self).update_content(destination, patch)
    }
}

/// Applies a patch to a destination's text, asynchronously.
///
/// Completions for one destination are serialized by
/// [`AsyncDriver`](super::async_driver::AsyncDriver); the sink itself may be
/// shared between destinations.
pub trait AsyncBufferSink {
    fn update_content(
        &self,
        destination: DestinationId,
        patch: &Patch,
    ) -> impl Future<Output = Result<(), SinkError>>;
}
