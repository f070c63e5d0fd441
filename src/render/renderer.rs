//! VNode → lines.
//!
//! Built-in tags:
//!
//! | Tag | Output |
//! |-----|--------|
//! | `fragment`, `div`, `box`, `column` | children's lines, in order |
//! | `bold` | `**x**` |
//! | `italic` | `_x_` |
//! | `code` | `` `x` `` |
//! | `strike` | `~~x~~` |
//! | `line` | `x` |
//!
//! where `x` is all of the children's lines joined into one. Other tags go to
//! the [`ComponentResolver`]. A resolver that fails, panics, or is missing
//! yields one placeholder line for that subtree; siblings still render.

use std::cell::Cell;
use std::fmt;

use crate::boundary;
use crate::vdom::{Props, VNode};

use super::resolver::ComponentResolver;

/// Placeholder line for a subtree that failed to render. `{tag}` is replaced
/// by the element's tag.
pub const DEFAULT_PLACEHOLDER: &str = "[error rendering {tag}]";

/// Nesting limit for resolver recursion.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Render `vnode` with the built-in tags only.
pub fn render(vnode: &VNode) -> Vec<String> {
    Renderer::new().render(vnode)
}

/// Renders VNode trees into flat text lines.
pub struct Renderer<'a> {
    resolver: Option<&'a dyn ComponentResolver>,
    placeholder: &'a str,
    max_depth: usize,
    depth: Cell<usize>,
}

impl fmt::Debug for Renderer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("resolver", &self.resolver.is_some())
            .field("placeholder", &self.placeholder)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl Default for Renderer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Renderer<'a> {
    pub fn new() -> Self {
        Self {
            resolver: None,
            placeholder: DEFAULT_PLACEHOLDER,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: Cell::new(0),
        }
    }

    pub fn with_resolver(mut self, resolver: &'a dyn ComponentResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The placeholder line for `tag`.
    pub fn placeholder(&self, tag: &str) -> String {
        self.placeholder.replace("{tag}", tag)
    }

    /// Render `vnode` into lines.
    pub fn render(&self, vnode: &VNode) -> Vec<String> {
        let mut lines = Vec::new();
        self.render_into(vnode, &mut lines);
        lines
    }

    fn render_into(&self, vnode: &VNode, out: &mut Vec<String>) {
        match vnode {
            VNode::Text { content } => out.push(content.clone()),
            VNode::Element {
                tag,
                props,
                children,
            } => match tag.as_str() {
                "fragment" | "div" | "box" | "column" => {
                    for child in children {
                        self.render_into(child, out);
                    }
                }
                "bold" => out.push(format!("**{}**", self.inline(children))),
                "italic" => out.push(format!("_{}_", self.inline(children))),
                "code" => out.push(format!("`{}`", self.inline(children))),
                "strike" => out.push(format!("~~{}~~", self.inline(children))),
                "line" => out.push(self.inline(children)),
                _ => out.extend(self.resolve(tag, props, children)),
            },
        }
    }

    fn inline(&self, children: &[VNode]) -> String {
        let mut lines = Vec::new();
        for child in children {
            self.render_into(child, &mut lines);
        }
        lines.concat()
    }

    fn resolve(&self, tag: &str, props: &Props, children: &[VNode]) -> Vec<String> {
        let Some(resolver) = self.resolver else {
            tracing::warn!(tag, "no component resolver for tag");
            return vec![self.placeholder(tag)];
        };
        if self.depth.get() >= self.max_depth {
            tracing::warn!(tag, max_depth = self.max_depth, "component nesting too deep");
            return vec![self.placeholder(tag)];
        }

        let _frame = DepthFrame::enter(&self.depth);
        match boundary::guard(|| resolver.resolve(tag, props, children, self)) {
            Ok(lines) => lines,
            Err(failure) => {
                tracing::warn!(
                    tag,
                    panicked = failure.is_panic(),
                    error = failure.message(),
                    "component failed to render"
                );
                vec![self.placeholder(tag)]
            }
        }
    }
}

struct DepthFrame<'a>(&'a Cell<usize>);

impl<'a> DepthFrame<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for DepthFrame<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get().saturating_sub(1));
    }
}

// ===========================================================================
// Tests
// ===========================================================================
