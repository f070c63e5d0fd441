//! Error types shared across the crate.
//!
//! Hook and handler failures never leave their dispatch boundary; they are
//! logged and swallowed. Collaborator failures (buffer sink, bridge) are the
//! only errors that reach callers, wrapped in [`Error`].

use crate::render::sink::{DestinationId, SinkError};

/// Boxed error accepted from user hooks and collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias for results carrying [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced to callers of the public API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("buffer sink rejected patch for destination {destination}: {source}")]
    Sink {
        destination: DestinationId,
        #[source]
        source: SinkError,
    },
    #[error("bridge failed to deliver action `{action}`: {source}")]
    Bridge {
        action: String,
        #[source]
        source: BridgeError,
    },
    #[error("component `{0}` is already mounted")]
    AlreadyMounted(String),
}

/// Failure returned by a lifecycle hook or event handler.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Other(BoxError),
}

impl HookError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self::Message(message.to_owned())
    }
}

impl From<BoxError> for HookError {
    fn from(err: BoxError) -> Self {
        Self::Other(err)
    }
}

/// Failure raised by a component resolver for an unrecognized tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no component registered for tag `{0}`")]
    UnknownTag(String),
    #[error("component `{tag}` failed: {message}")]
    Failed { tag: String, message: String },
}

/// Failure raised by the outbound transport.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("bridge is disconnected")]
    Disconnected,
    #[error("failed to encode action: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}
