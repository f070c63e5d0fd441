//! Failure boundaries around user callbacks.
//!
//! Hooks, event handlers and component resolvers are user code. A failure in
//! one of them (returned error or panic) is caught here so the caller can
//! carry on with the next hook, sibling, or component.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Outcome of a guarded call that did not complete normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Failure {
    /// The callback returned an error; carries its display text.
    Error(String),
    /// The callback panicked; carries the panic message when it was a string.
    Panic(String),
}

impl Failure {
    pub(crate) fn message(&self) -> &str {
        match self {
            Failure::Error(message) | Failure::Panic(message) => message,
        }
    }

    pub(crate) fn is_panic(&self) -> bool {
        matches!(self, Failure::Panic(_))
    }
}

/// Run `f`, converting both `Err` and panics into a [`Failure`].
pub(crate) fn guard<T, E: std::fmt::Display>(
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, Failure> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Failure::Error(err.to_string())),
        Err(payload) => Err(Failure::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else {
        "unknown panic".to_owned()
    }
}
