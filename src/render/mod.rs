//! Rendering pipeline: VNode → lines → patch → buffer sink.

pub mod async_driver;
pub mod cache;
pub mod diff;
pub mod driver;
pub mod renderer;
pub mod resolver;
pub mod sink;

pub use async_driver::AsyncDriver;
pub use cache::LineCache;
pub use diff::{diff_lines, diff_lines_bounded, positional_patch, Patch, PatchOp};
pub use driver::Driver;
pub use renderer::{render, Renderer};
pub use resolver::{ComponentResolver, ComponentTable};
pub use sink::{AsyncBufferSink, BufferSink, DestinationId, SinkError};
