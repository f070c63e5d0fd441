//! App struct: component mounting, reactive re-rendering, event routing.
//!
//! [`App`] ties the layers together. `mount` registers a component's hooks and
//! creates a render effect bound to a destination: the effect calls the
//! component's render function (tracking every signal it reads), renders the
//! tree to lines, sends the diff to the buffer sink, and then drives the
//! lifecycle (mount on the first pass, update on every later one).
//!
//! Signal writes only queue re-renders. They are applied by [`App::tick`],
//! and by every `App` entry point that routes events or changes what is
//! mounted, so a burst of writes produces one patch per destination.

use std::cell::RefCell;
use std::convert::Infallible;
use std::fmt;
use std::rc::Rc;

use crate::boundary;
use crate::component::{ComponentRegistry, Hooks, LifecycleRegistry, ListenerId, RegistryEvent};
use crate::error::{Error, Result};
use crate::event::{Bridge, EventQueue, InboundEvent, Outbox};
use crate::reactive::{Runtime, StopHandle};
use crate::render::diff::DEFAULT_MAX_DIFF_CELLS;
use crate::render::renderer::DEFAULT_PLACEHOLDER;
use crate::render::{BufferSink, ComponentResolver, DestinationId, Driver, Renderer};
use crate::vdom::VNode;

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// Configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Line emitted for a subtree that failed to render; `{tag}` is replaced
    /// by the element tag (or component id for a failed render function).
    pub placeholder: String,
    /// Alignment table limit for the line diff.
    pub max_diff_cells: usize,
    /// Truncate a component's destination when it is unmounted.
    pub clear_on_unmount: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            placeholder: DEFAULT_PLACEHOLDER.to_owned(),
            max_diff_cells: DEFAULT_MAX_DIFF_CELLS,
            clear_on_unmount: false,
        }
    }
}

impl AppConfig {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the placeholder format (builder).
    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Set the diff table limit (builder).
    pub fn with_max_diff_cells(mut self, max_diff_cells: usize) -> Self {
        self.max_diff_cells = max_diff_cells;
        self
    }

    /// Clear destinations on unmount (builder).
    pub fn with_clear_on_unmount(mut self, clear: bool) -> Self {
        self.clear_on_unmount = clear;
        self
    }
}

// ---------------------------------------------------------------------------
// RenderFailure
// ---------------------------------------------------------------------------

/// A failed re-render. Reruns are caused by signal writes, so their errors
/// cannot return to the writer; the app keeps them for [`App::take_errors`].
#[derive(Debug)]
pub struct RenderFailure {
    pub component: String,
    pub error: Error,
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component `{}`: {}", self.component, self.error)
    }
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// A mounted component's bookkeeping.
#[derive(Debug, Clone)]
pub struct MountedComponent {
    destination: DestinationId,
    effect: StopHandle,
}

impl MountedComponent {
    pub fn destination(&self) -> DestinationId {
        self.destination
    }
}

/// State reachable from render effects.
struct Shared<S> {
    driver: Driver<S>,
    lifecycle: LifecycleRegistry,
    resolver: Option<Box<dyn ComponentResolver>>,
    config: AppConfig,
    errors: Vec<RenderFailure>,
}

impl<S: BufferSink> Shared<S> {
    fn render_lines(&self, vnode: &VNode) -> Vec<String> {
        let mut renderer = Renderer::new().with_placeholder(&self.config.placeholder);
        if let Some(resolver) = self.resolver.as_deref() {
            renderer = renderer.with_resolver(resolver);
        }
        renderer.render(vnode)
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// The main application struct.
///
/// Owns the reactive runtime, the patch driver, the lifecycle registry, the
/// inbound event queue, and the outbound action queue.
pub struct App<S: BufferSink + 'static> {
    runtime: Runtime,
    shared: Rc<RefCell<Shared<S>>>,
    mounted: ComponentRegistry<MountedComponent>,
    events: EventQueue,
    outbox: Outbox,
}

impl<S: BufferSink + 'static> fmt::Debug for App<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("runtime", &self.runtime)
            .field("mounted", &self.mounted.ids())
            .field("pending_events", &self.events.pending_count())
            .field("pending_actions", &self.outbox.len())
            .finish()
    }
}

impl<S: BufferSink + 'static> App<S> {
    /// Create an app writing to `sink` with the default config.
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, AppConfig::default())
    }

    pub fn with_config(sink: S, config: AppConfig) -> Self {
        let driver = Driver::new(sink).with_max_diff_cells(config.max_diff_cells);
        Self {
            runtime: Runtime::new(),
            shared: Rc::new(RefCell::new(Shared {
                driver,
                lifecycle: LifecycleRegistry::new(),
                resolver: None,
                config,
                errors: Vec::new(),
            })),
            mounted: ComponentRegistry::unqueued(),
            events: EventQueue::new(),
            outbox: Outbox::new(),
        }
    }

    /// Use `resolver` for tags the renderer does not know (builder).
    pub fn with_resolver(self, resolver: impl ComponentResolver + 'static) -> Self {
        self.set_resolver(resolver);
        self
    }

    /// Replace the component resolver. Takes effect on the next render pass.
    pub fn set_resolver(&self, resolver: impl ComponentResolver + 'static) {
        self.shared.borrow_mut().resolver = Some(Box::new(resolver));
    }

    /// The reactive runtime; create signals and records for components here.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Re-render every component whose inputs changed since the last tick.
    ///
    /// Returns the number of render passes. Failed passes are kept for
    /// [`take_errors`](Self::take_errors).
    pub fn tick(&self) -> usize {
        self.runtime.tick()
    }

    /// Handle for queueing outbound actions from hooks.
    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    // -- mounting -----------------------------------------------------------

    /// Mount component `id` on `destination`.
    ///
    /// Registers `hooks`, then runs `render` inside a render effect. The first
    /// pass must reach the sink: its error is returned and nothing stays
    /// mounted. On success `on_mount` fires and the tree is recorded. Every
    /// later pass (caused by a signal `render` read) fires `on_update`.
    pub fn mount(
        &mut self,
        id: impl Into<String>,
        destination: DestinationId,
        hooks: Hooks,
        mut render: impl FnMut() -> VNode + 'static,
    ) -> Result<()> {
        let id = id.into();
        if self.mounted.contains(&id) {
            return Err(Error::AlreadyMounted(id));
        }
        self.shared.borrow_mut().lifecycle.register_lifecycle(id.clone(), hooks);

        let first_error: Rc<RefCell<Option<Error>>> = Rc::new(RefCell::new(None));
        let effect = {
            let shared = Rc::clone(&self.shared);
            let first_error = Rc::clone(&first_error);
            let runtime = self.runtime.downgrade();
            let id = id.clone();
            let mut rendered = false;
            self.runtime.run_effect(move || {
                let vnode = match boundary::guard(|| Ok::<_, Infallible>(render())) {
                    Ok(vnode) => vnode,
                    Err(failure) => {
                        tracing::error!(
                            component = %id,
                            error = failure.message(),
                            "render function panicked"
                        );
                        let placeholder = shared.borrow().config.placeholder.replace("{tag}", &id);
                        VNode::text(placeholder)
                    }
                };

                let lines = shared.borrow().render_lines(&vnode);
                let applied = shared.borrow_mut().driver.apply_diff(destination, lines);
                if let Err(error) = applied {
                    if rendered {
                        tracing::error!(
                            component = %id,
                            destination = %destination,
                            error = %error,
                            "re-render failed"
                        );
                        shared.borrow_mut().errors.push(RenderFailure {
                            component: id.clone(),
                            error,
                        });
                    } else {
                        *first_error.borrow_mut() = Some(error);
                    }
                    return;
                }

                let first = !rendered;
                rendered = true;
                let drive = || {
                    let mut shared = shared.borrow_mut();
                    if first {
                        shared.lifecycle.mount(&id);
                        shared.lifecycle.record_render(&id, vnode);
                    } else {
                        shared.lifecycle.update(&id, vnode);
                    }
                };
                match runtime.upgrade() {
                    Some(rt) => rt.untrack(drive),
                    None => drive(),
                }
            })
        };

        let failed = first_error.borrow_mut().take();
        if let Some(error) = failed {
            effect.stop();
            self.shared.borrow_mut().lifecycle.unregister(&id);
            tracing::warn!(
                component = %id,
                destination = %destination,
                error = %error,
                "mount failed"
            );
            return Err(error);
        }

        tracing::debug!(component = %id, destination = %destination, "component mounted");
        self.mounted.add(id, MountedComponent { destination, effect });
        self.runtime.tick();
        Ok(())
    }

    /// Unmount `id`: stop its render effect and fire `on_unmount`.
    ///
    /// Returns `Ok(false)` for an id that is not mounted. With
    /// `clear_on_unmount`, the destination is truncated afterwards.
    pub fn unmount(&mut self, id: &str) -> Result<bool> {
        let Some(component) = self.mounted.take(id) else {
            return Ok(false);
        };
        component.effect.stop();
        self.runtime.batch(|| {
            self.shared.borrow_mut().lifecycle.unmount(id);
        });
        tracing::debug!(component = id, destination = %component.destination, "component unmounted");
        self.clear_destination(component.destination)?;
        Ok(true)
    }

    /// Unmount every component and empty the lifecycle registry.
    ///
    /// Every destination is attempted; the first sink error is returned.
    pub fn clear(&mut self) -> Result<()> {
        let components: Vec<MountedComponent> = self
            .mounted
            .iter()
            .map(|(_, component)| component.clone())
            .collect();
        for component in &components {
            component.effect.stop();
        }
        self.mounted.clear();
        self.runtime.batch(|| {
            self.shared.borrow_mut().lifecycle.clear();
        });

        let mut first_error = None;
        for component in components {
            if let Err(err) = self.clear_destination(component.destination) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn clear_destination(&self, destination: DestinationId) -> Result<()> {
        let mut shared = self.shared.borrow_mut();
        if shared.config.clear_on_unmount {
            shared.driver.clear_destination(destination)?;
        }
        Ok(())
    }

    // -- events -------------------------------------------------------------

    /// Route one inbound event to its handler now.
    ///
    /// Affected components re-render once, after the handler returns,
    /// together with any writes queued before the call.
    pub fn handle_event(&mut self, event: &InboundEvent) -> bool {
        self.runtime.batch(|| {
            let mut shared = self.shared.borrow_mut();
            shared
                .lifecycle
                .trigger_event(&event.component_id, &event.name, &event.payload)
        })
    }

    /// Queue an inbound event for [`dispatch_events`](Self::dispatch_events).
    pub fn push_event(&mut self, event: InboundEvent) {
        self.events.push(event);
    }

    /// Route every queued event, in order, as one batch.
    ///
    /// Returns how many events reached a handler that completed.
    pub fn dispatch_events(&mut self) -> usize {
        let events = &mut self.events;
        let shared = &self.shared;
        self.runtime.batch(|| {
            let mut shared = shared.borrow_mut();
            events.dispatch(&mut shared.lifecycle)
        })
    }

    /// Send queued outbound actions through `bridge`.
    pub fn flush_actions(&self, bridge: &mut impl Bridge) -> Result<usize> {
        self.outbox.flush(bridge)
    }

    // -- observation --------------------------------------------------------

    /// Failures from reactive re-renders since the last call.
    pub fn take_errors(&self) -> Vec<RenderFailure> {
        std::mem::take(&mut self.shared.borrow_mut().errors)
    }

    /// Ids of all components with registered lifecycles, sorted.
    pub fn lifecycle_components(&self) -> Vec<String> {
        self.shared.borrow().lifecycle.lifecycle_components()
    }

    pub fn is_mounted(&self, id: &str) -> bool {
        self.shared.borrow().lifecycle.is_mounted(id)
    }

    /// The last tree rendered by `id`.
    pub fn last_vnode(&self, id: &str) -> Option<VNode> {
        self.shared.borrow().lifecycle.last_vnode(id).cloned()
    }

    /// Lines last accepted by the sink for `destination`.
    pub fn lines(&self, destination: DestinationId) -> Vec<String> {
        self.shared.borrow().driver.lines(destination).to_vec()
    }

    /// The destination `id` is mounted on.
    pub fn destination_of(&self, id: &str) -> Option<DestinationId> {
        self.mounted.get(id).map(MountedComponent::destination)
    }

    /// Ids of mounted components, sorted.
    pub fn mounted_components(&self) -> Vec<String> {
        self.mounted.ids()
    }

    /// Observe `ComponentAdded` / `ComponentRemoved` as components mount
    /// and unmount.
    pub fn on_component_event(
        &mut self,
        listener: impl FnMut(&RegistryEvent) + 'static,
    ) -> ListenerId {
        self.mounted.subscribe(listener)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
