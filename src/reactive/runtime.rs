//! The reactive runtime: dependency graph, tracking stack and scheduler.
//!
//! Every reactive value ([`Signal`](super::Signal),
//! [`ObservableRecord`](super::ObservableRecord) keys) is backed by a *source*
//! slot; every effect by an *effect* slot. Reading a source while an effect is
//! on top of the tracking stack records an edge in both directions. Writing a
//! source only queues its subscribers. The queue is flushed by
//! [`Runtime::tick`] (or when the outermost [`Runtime::batch`] closes), so any
//! number of writes between two ticks rerun each affected effect once.
//!
//! The runtime is an explicit value rather than a thread-local so that
//! independent UIs (and tests) never share a dependency graph.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Identifies one tracked key: a signal, or one key of an observable record.
    pub struct SourceId;
    /// Identifies an effect slot inside the [`Runtime`].
    pub struct EffectId;
}

/// Upper bound on flush passes before the scheduler gives up on a cycle of
/// effects that keep writing each other's inputs.
const MAX_FLUSH_PASSES: usize = 10_000;

// ---------------------------------------------------------------------------
// Runtime internals
// ---------------------------------------------------------------------------

struct SourceState {
    subscribers: HashSet<EffectId>,
}

struct EffectState {
    /// Taken out while the effect runs so no runtime borrow is held across
    /// user code.
    callback: Option<Box<dyn FnMut()>>,
    dependencies: HashSet<SourceId>,
    /// Creation order; reruns within a pass happen in this order.
    order: u64,
}

pub(crate) struct RuntimeInner {
    sources: SlotMap<SourceId, SourceState>,
    effects: SlotMap<EffectId, EffectState>,
    /// Active-effect stack. `None` frames come from [`Runtime::untrack`].
    tracking: Vec<Option<EffectId>>,
    batch_depth: usize,
    pending: Vec<EffectId>,
    flushing: bool,
    next_order: u64,
}

impl RuntimeInner {
    fn new() -> Self {
        Self {
            sources: SlotMap::with_key(),
            effects: SlotMap::with_key(),
            tracking: Vec::new(),
            batch_depth: 0,
            pending: Vec::new(),
            flushing: false,
            next_order: 0,
        }
    }

    fn is_idle(&self) -> bool {
        self.batch_depth == 0 && !self.flushing && self.tracking.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Handle to a reactive dependency graph. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RefCell<RuntimeInner>>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rt = self.inner.borrow();
        f.debug_struct("Runtime")
            .field("sources", &rt.sources.len())
            .field("effects", &rt.effects.len())
            .field("pending", &rt.pending.len())
            .finish()
    }
}

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(RuntimeInner::new())),
        }
    }

    /// Number of live (not stopped) effects.
    pub fn effect_count(&self) -> usize {
        self.inner.borrow().effects.len()
    }

    /// Number of live sources.
    pub fn source_count(&self) -> usize {
        self.inner.borrow().sources.len()
    }

    /// Whether an effect is currently recording dependencies.
    pub fn is_tracking(&self) -> bool {
        matches!(self.inner.borrow().tracking.last(), Some(Some(_)))
    }

    /// Number of effects queued for the next tick.
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Rerun every queued effect, then anything their writes queue in turn,
    /// until the graph settles. Returns the number of effect runs.
    ///
    /// A no-op (returning 0) inside a batch, an effect or another tick; the
    /// enclosing frame picks the queue up. If an effect panics, the panic
    /// propagates and the effects not yet run stay queued for the next tick.
    pub fn tick(&self) -> usize {
        let ready = {
            let rt = self.inner.borrow();
            rt.is_idle() && !rt.pending.is_empty()
        };
        if ready {
            self.flush()
        } else {
            0
        }
    }

    /// Run `f`, then [`tick`](Self::tick) once the outermost batch closes.
    ///
    /// Batches nest; effects run once, after the outermost batch closes.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.borrow_mut().batch_depth += 1;
        let result = {
            let _depth = BatchFrame(self);
            f()
        };
        self.tick();
        result
    }

    /// Run `f` without recording any dependency for the running effect.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        self.inner.borrow_mut().tracking.push(None);
        let _frame = UntrackFrame(self);
        f()
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    // -- sources ----------------------------------------------------------

    pub(crate) fn create_source(&self) -> SourceId {
        self.inner.borrow_mut().sources.insert(SourceState {
            subscribers: HashSet::new(),
        })
    }

    fn release_source(&self, id: SourceId) {
        let Ok(mut guard) = self.inner.try_borrow_mut() else {
            return;
        };
        let rt = &mut *guard;
        if let Some(state) = rt.sources.remove(id) {
            for eid in state.subscribers {
                if let Some(effect) = rt.effects.get_mut(eid) {
                    effect.dependencies.remove(&id);
                }
            }
        }
    }

    /// Record an edge from `source` to the effect on top of the stack.
    pub(crate) fn track(&self, source: SourceId) {
        let mut guard = self.inner.borrow_mut();
        let rt = &mut *guard;
        let Some(Some(eid)) = rt.tracking.last().copied() else {
            return;
        };
        let (Some(state), Some(effect)) = (rt.sources.get_mut(source), rt.effects.get_mut(eid))
        else {
            return;
        };
        state.subscribers.insert(eid);
        effect.dependencies.insert(source);
    }

    /// Queue every subscriber of `source` for the next tick.
    ///
    /// The effect currently executing is never queued by its own writes.
    pub(crate) fn trigger(&self, source: SourceId) {
        let mut guard = self.inner.borrow_mut();
        let rt = &mut *guard;
        let Some(state) = rt.sources.get(source) else {
            return;
        };
        let running = rt.tracking.iter().rev().find_map(|frame| *frame);
        for &eid in &state.subscribers {
            if Some(eid) != running && !rt.pending.contains(&eid) {
                rt.pending.push(eid);
            }
        }
    }

    // -- effects ----------------------------------------------------------

    pub(crate) fn create_effect(&self, callback: Box<dyn FnMut()>) -> EffectId {
        let eid = {
            let mut rt = self.inner.borrow_mut();
            let order = rt.next_order;
            rt.next_order += 1;
            rt.effects.insert(EffectState {
                callback: Some(callback),
                dependencies: HashSet::new(),
                order,
            })
        };
        self.run(eid);
        eid
    }

    /// Remove an effect and all of its edges. Returns `false` if it was
    /// already stopped.
    pub(crate) fn stop(&self, eid: EffectId) -> bool {
        let removed = {
            let mut guard = self.inner.borrow_mut();
            let rt = &mut *guard;
            let Some(state) = rt.effects.remove(eid) else {
                return false;
            };
            for sid in &state.dependencies {
                if let Some(source) = rt.sources.get_mut(*sid) {
                    source.subscribers.remove(&eid);
                }
            }
            rt.pending.retain(|p| *p != eid);
            state
        };
        // The callback may own sources; drop it with the runtime unborrowed.
        drop(removed);
        true
    }

    pub(crate) fn is_active(&self, eid: EffectId) -> bool {
        self.inner.borrow().effects.contains_key(eid)
    }

    pub(crate) fn dependency_count(&self, eid: EffectId) -> usize {
        self.inner
            .borrow()
            .effects
            .get(eid)
            .map_or(0, |effect| effect.dependencies.len())
    }

    /// Run one effect: drop its old edges, push it on the stack, call it.
    fn run(&self, eid: EffectId) {
        let callback = {
            let mut guard = self.inner.borrow_mut();
            let rt = &mut *guard;
            let Some(effect) = rt.effects.get_mut(eid) else {
                return;
            };
            // A missing callback means the effect is already on the stack.
            let Some(callback) = effect.callback.take() else {
                return;
            };
            let old: Vec<SourceId> = effect.dependencies.drain().collect();
            for sid in old {
                if let Some(source) = rt.sources.get_mut(sid) {
                    source.subscribers.remove(&eid);
                }
            }
            rt.tracking.push(Some(eid));
            callback
        };

        let mut frame = RunFrame {
            runtime: self,
            effect: eid,
            callback: Some(callback),
        };
        if let Some(callback) = frame.callback.as_mut() {
            callback();
        }
    }

    fn flush(&self) -> usize {
        self.inner.borrow_mut().flushing = true;
        let _reset = FlushFrame(self);
        let mut runs = 0;

        for _ in 0..MAX_FLUSH_PASSES {
            let queue: VecDeque<EffectId> = {
                let mut guard = self.inner.borrow_mut();
                let rt = &mut *guard;
                let mut pass = std::mem::take(&mut rt.pending);
                pass.retain(|eid| rt.effects.contains_key(*eid));
                pass.sort_by_key(|eid| rt.effects[*eid].order);
                pass.into()
            };
            if queue.is_empty() {
                return runs;
            }
            let mut pass = PassFrame {
                runtime: self,
                queue,
            };
            while let Some(eid) = pass.queue.pop_front() {
                self.run(eid);
                runs += 1;
            }
        }

        let dropped = std::mem::take(&mut self.inner.borrow_mut().pending);
        tracing::error!(
            pending = dropped.len(),
            passes = MAX_FLUSH_PASSES,
            "reactive flush did not settle; dropping pending effects"
        );
        runs
    }
}

// ---------------------------------------------------------------------------
// Weak handle
// ---------------------------------------------------------------------------

/// Non-owning runtime handle held by reactive values, so that effects
/// capturing values never keep the runtime alive.
#[derive(Clone, Default)]
pub(crate) struct WeakRuntime(Weak<RefCell<RuntimeInner>>);

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

/// Owns one source slot and releases it on drop.
pub(crate) struct Source {
    id: SourceId,
    runtime: WeakRuntime,
}

impl Source {
    pub(crate) fn new(runtime: &WeakRuntime) -> Self {
        let id = runtime
            .upgrade()
            .map(|rt| rt.create_source())
            .unwrap_or_default();
        Self {
            id,
            runtime: runtime.clone(),
        }
    }

    pub(crate) fn id(&self) -> SourceId {
        self.id
    }

    pub(crate) fn track(&self) {
        if let Some(rt) = self.runtime.upgrade() {
            rt.track(self.id);
        }
    }

    pub(crate) fn trigger(&self) {
        if let Some(rt) = self.runtime.upgrade() {
            rt.trigger(self.id);
        }
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        if let Some(rt) = self.runtime.upgrade() {
            rt.release_source(self.id);
        }
    }
}

// ---------------------------------------------------------------------------
// Stack frames (restored on unwind)
// ---------------------------------------------------------------------------

struct RunFrame<'a> {
    runtime: &'a Runtime,
    effect: EffectId,
    callback: Option<Box<dyn FnMut()>>,
}

impl Drop for RunFrame<'_> {
    fn drop(&mut self) {
        let orphaned = match self.runtime.inner.try_borrow_mut() {
            Ok(mut rt) => {
                rt.tracking.pop();
                match rt.effects.get_mut(self.effect) {
                    Some(effect) => {
                        effect.callback = self.callback.take();
                        None
                    }
                    // Stopped while running.
                    None => self.callback.take(),
                }
            }
            Err(_) => None,
        };
        drop(orphaned);
    }
}

struct UntrackFrame<'a>(&'a Runtime);

impl Drop for UntrackFrame<'_> {
    fn drop(&mut self) {
        if let Ok(mut rt) = self.0.inner.try_borrow_mut() {
            rt.tracking.pop();
        }
    }
}

struct BatchFrame<'a>(&'a Runtime);

impl Drop for BatchFrame<'_> {
    fn drop(&mut self) {
        if let Ok(mut rt) = self.0.inner.try_borrow_mut() {
            rt.batch_depth -= 1;
        }
    }
}

/// The unrun rest of a flush pass. Only non-empty when an effect panicked;
/// the rest goes back on the queue.
struct PassFrame<'a> {
    runtime: &'a Runtime,
    queue: VecDeque<EffectId>,
}

impl Drop for PassFrame<'_> {
    fn drop(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if let Ok(mut rt) = self.runtime.inner.try_borrow_mut() {
            for eid in self.queue.drain(..) {
                if !rt.pending.contains(&eid) {
                    rt.pending.push(eid);
                }
            }
        }
    }
}

struct FlushFrame<'a>(&'a Runtime);

impl Drop for FlushFrame<'_> {
    fn drop(&mut self) {
        if let Ok(mut rt) = self.0.inner.try_borrow_mut() {
            rt.flushing = false;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
