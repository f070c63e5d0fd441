//! Virtual nodes: the immutable tree a component's render path returns.

pub mod node;

pub use node::{Props, VNode};
