//! Reactive state: signals, observable records, effects, watchers.
//!
//! Fine-grained, auto-tracking reactivity for driving component re-renders.
//!
//! - [`Runtime`]: the dependency graph and scheduler.
//! - [`Runtime::signal`]: a typed reactive cell.
//! - [`Runtime::observe`]: a keyed reactive record with nested wrapping.
//! - [`Runtime::run_effect`]: an auto-tracking side effect.
//! - [`Runtime::watch`]: a change callback over a derived value.
//! - [`Runtime::tick`]: rerun every effect whose inputs changed since the last tick.
//! - [`Runtime::batch`]: run a closure, then tick.

pub mod effect;
pub mod observable;
pub mod runtime;
pub mod signal;

pub use effect::StopHandle;
pub use observable::{Field, ObservableRecord};
pub use runtime::{EffectId, Runtime, SourceId};
pub use signal::Signal;
