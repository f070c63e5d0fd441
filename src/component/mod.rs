//! Components: lifecycle hooks and the generic component registry.

pub mod lifecycle;
pub mod registry;

pub use lifecycle::{ComponentKey, HookResult, Hooks, LifecycleRegistry, Phase};
pub use registry::{ComponentRegistry, ListenerId, RegistryEvent};
