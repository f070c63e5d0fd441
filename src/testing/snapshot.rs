//! Snapshot rendering helpers.
//!
//! Functions for turning rendered lines and patches into plain-text strings
//! suitable for `insta` snapshots and assertions.

use crate::render::{render, Patch, PatchOp, Renderer};
use crate::vdom::VNode;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Join lines with `'\n'`. The final line has no trailing newline.
pub fn lines_to_string<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Render `vnode` with the built-in tags and join the lines.
///
/// # Examples
///
/// ```
/// use panekit::testing::render_to_string;
/// use panekit::vdom::VNode;
///
/// let tree = VNode::fragment([VNode::text("a"), VNode::element("bold").with_child("b")]);
/// assert_eq!(render_to_string(&tree), "a\n**b**");
/// ```
pub fn render_to_string(vnode: &VNode) -> String {
    lines_to_string(&render(vnode))
}

/// Like [`render_to_string`], with a caller-configured renderer.
pub fn render_with(renderer: &Renderer<'_>, vnode: &VNode) -> String {
    lines_to_string(&renderer.render(vnode))
}

/// One line per patch entry: `=` keep, `-` delete, `+ text` set.
pub fn patch_to_string(patch: &Patch) -> String {
    patch
        .ops()
        .iter()
        .map(|op| match op {
            PatchOp::Keep => "=".to_owned(),
            PatchOp::Delete => "-".to_owned(),
            PatchOp::Set(line) => format!("+ {line}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ===========================================================================
// Tests
// ===========================================================================
