//! Node types: VNode, Props.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Element properties, ordered by name so equal trees compare and serialize
/// identically.
pub type Props = BTreeMap<String, Value>;

/// An immutable description of rendered output.
///
/// Trees are rebuilt on every render; builder methods consume and return the
/// node. The serialized form is tagged by `type`:
///
/// ```json
/// { "type": "element", "tag": "bold", "children": [{ "type": "text", "content": "hi" }] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VNode {
    /// One line of literal text.
    Text { content: String },
    /// A tagged element with ordered children.
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        props: Props,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<VNode>,
    },
}

impl VNode {
    /// A text node.
    pub fn text(content: impl Into<String>) -> Self {
        VNode::Text {
            content: content.into(),
        }
    }

    /// An element with no props and no children.
    pub fn element(tag: impl Into<String>) -> Self {
        VNode::Element {
            tag: tag.into(),
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// A `fragment` element wrapping `children`.
    pub fn fragment(children: impl IntoIterator<Item = VNode>) -> Self {
        VNode::element("fragment").with_children(children)
    }

    /// Set a prop (builder). No-op on text nodes.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let VNode::Element { props, .. } = &mut self {
            props.insert(key.into(), value.into());
        }
        self
    }

    /// Append a child (builder). No-op on text nodes.
    pub fn with_child(mut self, child: impl Into<VNode>) -> Self {
        if let VNode::Element { children, .. } = &mut self {
            children.push(child.into());
        }
        self
    }

    /// Append several children (builder). No-op on text nodes.
    pub fn with_children(mut self, new_children: impl IntoIterator<Item = VNode>) -> Self {
        if let VNode::Element { children, .. } = &mut self {
            children.extend(new_children);
        }
        self
    }

    pub fn is_text(&self) -> bool {
        matches!(self, VNode::Text { .. })
    }

    /// The element tag, or `None` for text.
    pub fn tag(&self) -> Option<&str> {
        match self {
            VNode::Element { tag, .. } => Some(tag.as_str()),
            VNode::Text { .. } => None,
        }
    }

    /// Children of an element; empty for text.
    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element { children, .. } => children.as_slice(),
            VNode::Text { .. } => &[],
        }
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        match self {
            VNode::Element { props, .. } => props.get(key),
            VNode::Text { .. } => None,
        }
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(VNode::node_count).sum::<usize>()
    }
}

impl From<&str> for VNode {
    fn from(content: &str) -> Self {
        VNode::text(content)
    }
}

impl From<String> for VNode {
    fn from(content: String) -> Self {
        VNode::text(content)
    }
}
