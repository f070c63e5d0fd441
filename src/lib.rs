//! # panekit
//!
//! A reactive component framework that renders into the text panes of a host
//! editor.
//!
//! Components describe their output as a [`VNode`] tree. Signals and
//! observable records track what each component reads, so the next tick
//! after a write re-renders exactly the components that depend on it.
//! Rendered trees become flat text lines, and only the lines that changed are
//! sent to the host as a keep/delete/set [`Patch`].
//!
//! ## Core Systems
//!
//! - **[`reactive`]**: runtime, signals, observable records, effects, watchers
//! - **[`component`]**: lifecycle hooks and the generic component registry
//! - **[`vdom`]**: the immutable virtual node tree
//! - **[`render`]**: tree → lines renderer, line diff, sync and async drivers
//! - **[`event`]**: inbound event queue, outbound actions and bridges
//! - **[`app`]**: application struct tying everything together
//! - **[`testing`]**: in-memory sink and bridge, snapshot helpers
//!
//! ## Example
//!
//! ```
//! use panekit::{App, DestinationId, Hooks, VNode};
//! use panekit::testing::MemorySink;
//!
//! let sink = MemorySink::new();
//! let mut app = App::new(sink.clone());
//! let count = app.runtime().signal(0);
//!
//! let reader = count.clone();
//! app.mount("counter", DestinationId(1), Hooks::new(), move || {
//!     VNode::element("line")
//!         .with_child("count: ")
//!         .with_child(VNode::element("bold").with_child(reader.get().to_string()))
//! })
//! .unwrap();
//! assert_eq!(sink.lines(DestinationId(1)), vec!["count: **0**"]);
//!
//! count.set(3);
//! app.tick();
//! assert_eq!(sink.lines(DestinationId(1)), vec!["count: **3**"]);
//! ```

pub(crate) mod boundary;
pub mod error;

// Reactivity and components
pub mod component;
pub mod reactive;

// Trees and rendering
pub mod render;
pub mod vdom;

// Host plumbing
pub mod event;

// Application
pub mod app;
pub mod testing;

pub use app::{App, AppConfig, RenderFailure};
pub use component::{ComponentRegistry, Hooks, HookResult, LifecycleRegistry, Phase, RegistryEvent};
pub use error::{BridgeError, Error, HookError, ResolveError, Result};
pub use event::{Action, Bridge, InboundEvent, Outbox};
pub use reactive::{ObservableRecord, Runtime, Signal, StopHandle};
pub use render::{
    diff_lines, render, AsyncBufferSink, AsyncDriver, BufferSink, ComponentResolver,
    ComponentTable, DestinationId, Driver, Patch, PatchOp, SinkError,
};
pub use vdom::{Props, VNode};
