//! Component lifecycle: mount, update, unmount, and event dispatch.
//!
//! The [`LifecycleRegistry`] keeps one entry per component id in a slotmap
//! arena. Each entry records whether the component is mounted, the last tree
//! it rendered, and the user's hooks. Every hook runs inside its own failure
//! boundary: an error or panic is logged with the phase, hook and component
//! id, and dispatch carries on.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;
use slotmap::{new_key_type, SlotMap};

use crate::boundary;
use crate::error::HookError;
use crate::vdom::VNode;

/// Result returned by every hook and event handler.
pub type HookResult = Result<(), HookError>;

type MountHook = Box<dyn FnMut() -> HookResult>;
type UpdateHook = Box<dyn FnMut(&VNode, Option<&VNode>) -> HookResult>;
type EventHandler = Box<dyn FnMut(&Value) -> HookResult>;

new_key_type! {
    /// Arena key of a lifecycle entry.
    pub struct ComponentKey;
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Lifecycle phases that can be triggered on a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Mount,
    Update,
    Unmount,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Mount => "mount",
            Phase::Update => "update",
            Phase::Unmount => "unmount",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// The callbacks a component registers. All are optional.
#[derive(Default)]
pub struct Hooks {
    on_mount: Option<MountHook>,
    on_update: Option<UpdateHook>,
    on_unmount: Option<MountHook>,
    events: HashMap<String, EventHandler>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<&String> = self.events.keys().collect();
        events.sort();
        f.debug_struct("Hooks")
            .field("on_mount", &self.on_mount.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_unmount", &self.on_unmount.is_some())
            .field("events", &events)
            .finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once when the component becomes mounted.
    pub fn on_mount(mut self, f: impl FnMut() -> HookResult + 'static) -> Self {
        self.on_mount = Some(Box::new(f));
        self
    }

    /// Called with `(new, last)` on every update while mounted.
    pub fn on_update(
        mut self,
        f: impl FnMut(&VNode, Option<&VNode>) -> HookResult + 'static,
    ) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    /// Called on every unmount request.
    pub fn on_unmount(mut self, f: impl FnMut() -> HookResult + 'static) -> Self {
        self.on_unmount = Some(Box::new(f));
        self
    }

    /// Handle the named inbound event. Replaces an earlier handler for `name`.
    pub fn on_event(
        mut self,
        name: impl Into<String>,
        f: impl FnMut(&Value) -> HookResult + 'static,
    ) -> Self {
        self.events.insert(name.into(), Box::new(f));
        self
    }
}

// ---------------------------------------------------------------------------
// LifecycleRegistry
// ---------------------------------------------------------------------------

struct LifecycleEntry {
    id: String,
    is_mounted: bool,
    last_vnode: Option<VNode>,
    hooks: Hooks,
}

/// Registry of live components and their hooks.
#[derive(Default)]
pub struct LifecycleRegistry {
    entries: SlotMap<ComponentKey, LifecycleEntry>,
    index: HashMap<String, ComponentKey>,
}

impl fmt::Debug for LifecycleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleRegistry")
            .field("components", &self.lifecycle_components())
            .finish()
    }
}

impl LifecycleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) the hooks for `id`.
    ///
    /// Replacing keeps the entry's mounted flag and last rendered tree.
    pub fn register_lifecycle(&mut self, id: impl Into<String>, hooks: Hooks) {
        let id = id.into();
        match self.index.get(&id).and_then(|key| self.entries.get_mut(*key)) {
            Some(entry) => entry.hooks = hooks,
            None => {
                let key = self.entries.insert(LifecycleEntry {
                    id: id.clone(),
                    is_mounted: false,
                    last_vnode: None,
                    hooks,
                });
                self.index.insert(id, key);
            }
        }
    }

    /// Drop the entry for `id` without running any hook.
    pub fn unregister(&mut self, id: &str) -> bool {
        match self.index.remove(id) {
            Some(key) => self.entries.remove(key).is_some(),
            None => false,
        }
    }

    /// Drive `id` through `phase`.
    ///
    /// - `Mount` is a no-op when already mounted.
    /// - `Update` is a no-op unless mounted and `vnode` is supplied; it calls
    ///   `on_update(new, last)` and then records `new` as the last tree.
    /// - `Unmount` always calls `on_unmount` and clears the mounted flag.
    ///
    /// Returns `false` when nothing happened (unknown id or a guarded no-op).
    pub fn trigger_lifecycle(&mut self, phase: Phase, id: &str, vnode: Option<VNode>) -> bool {
        let Some(entry) = self.index.get(id).and_then(|key| self.entries.get_mut(*key)) else {
            tracing::debug!(component = id, phase = %phase, "lifecycle trigger for unknown component");
            return false;
        };

        match phase {
            Phase::Mount => {
                if entry.is_mounted {
                    return false;
                }
                entry.is_mounted = true;
                if let Some(hook) = entry.hooks.on_mount.as_mut() {
                    run_hook(phase, "on_mount", &entry.id, || hook());
                }
            }
            Phase::Update => {
                let Some(vnode) = vnode else {
                    return false;
                };
                if !entry.is_mounted {
                    return false;
                }
                if let Some(hook) = entry.hooks.on_update.as_mut() {
                    let last = entry.last_vnode.as_ref();
                    run_hook(phase, "on_update", &entry.id, || hook(&vnode, last));
                }
                entry.last_vnode = Some(vnode);
            }
            Phase::Unmount => {
                if let Some(hook) = entry.hooks.on_unmount.as_mut() {
                    run_hook(phase, "on_unmount", &entry.id, || hook());
                }
                entry.is_mounted = false;
            }
        }
        true
    }

    /// Shorthand for `trigger_lifecycle(Phase::Mount, id, None)`.
    pub fn mount(&mut self, id: &str) -> bool {
        self.trigger_lifecycle(Phase::Mount, id, None)
    }

    /// Shorthand for `trigger_lifecycle(Phase::Update, id, Some(vnode))`.
    pub fn update(&mut self, id: &str, vnode: VNode) -> bool {
        self.trigger_lifecycle(Phase::Update, id, Some(vnode))
    }

    /// Shorthand for `trigger_lifecycle(Phase::Unmount, id, None)`.
    pub fn unmount(&mut self, id: &str) -> bool {
        self.trigger_lifecycle(Phase::Unmount, id, None)
    }

    /// Invoke the `name` handler of `id`.
    ///
    /// Missing component or handler is a silent no-op (`false`). A failing
    /// handler is logged and also reported as `false`.
    pub fn trigger_event(&mut self, id: &str, name: &str, payload: &Value) -> bool {
        let Some(entry) = self.index.get(id).and_then(|key| self.entries.get_mut(*key)) else {
            return false;
        };
        let Some(handler) = entry.hooks.events.get_mut(name) else {
            return false;
        };
        match boundary::guard(|| handler(payload)) {
            Ok(()) => true,
            Err(failure) => {
                tracing::error!(
                    component = id,
                    event = name,
                    panicked = failure.is_panic(),
                    error = failure.message(),
                    "event handler failed"
                );
                false
            }
        }
    }

    /// Remember `vnode` as the last rendered tree without running hooks.
    pub fn record_render(&mut self, id: &str, vnode: VNode) -> bool {
        match self.index.get(id).and_then(|key| self.entries.get_mut(*key)) {
            Some(entry) => {
                entry.last_vnode = Some(vnode);
                true
            }
            None => false,
        }
    }

    /// Ids of all registered components, sorted.
    pub fn lifecycle_components(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.index.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_mounted(&self, id: &str) -> bool {
        self.entry(id).is_some_and(|entry| entry.is_mounted)
    }

    pub fn last_vnode(&self, id: &str) -> Option<&VNode> {
        self.entry(id).and_then(|entry| entry.last_vnode.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unmount every mounted component, then drop all entries.
    pub fn clear(&mut self) {
        let mut mounted: Vec<String> = self
            .entries
            .values()
            .filter(|entry| entry.is_mounted)
            .map(|entry| entry.id.clone())
            .collect();
        mounted.sort();
        for id in &mounted {
            self.unmount(id);
        }
        self.entries.clear();
        self.index.clear();
    }

    fn entry(&self, id: &str) -> Option<&LifecycleEntry> {
        self.index.get(id).and_then(|key| self.entries.get(*key))
    }
}

fn run_hook(phase: Phase, hook: &'static str, component: &str, f: impl FnOnce() -> HookResult) {
    if let Err(failure) = boundary::guard(f) {
        tracing::error!(
            component,
            phase = phase.as_str(),
            hook,
            panicked = failure.is_panic(),
            error = failure.message(),
            "lifecycle hook failed"
        );
    }
}

// ===========================================================================
// Tests
// ===========================================================================
