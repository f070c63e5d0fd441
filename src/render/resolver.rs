//! Component resolution for tags the renderer does not know.

use std::collections::HashMap;
use std::fmt;

use crate::error::ResolveError;
use crate::vdom::{Props, VNode};

use super::renderer::Renderer;

/// Renders elements whose tag is not built in.
///
/// `renderer` is the renderer that reached the element; use it to render
/// nested trees so placeholders and depth limits still apply.
pub trait ComponentResolver {
    fn resolve(
        &self,
        tag: &str,
        props: &Props,
        children: &[VNode],
        renderer: &Renderer<'_>,
    ) -> Result<Vec<String>, ResolveError>;
}

impl<F> ComponentResolver for F
where
    F: Fn(&str, &Props, &[VNode], &Renderer<'_>) -> Result<Vec<String>, ResolveError>,
{
    fn resolve(
        &self,
        tag: &str,
        props: &Props,
        children: &[VNode],
        renderer: &Renderer<'_>,
    ) -> Result<Vec<String>, ResolveError> {
        self(tag, props, children, renderer)
    }
}

type ComponentFn = Box<dyn Fn(&Props, &[VNode]) -> Result<VNode, ResolveError>>;

/// Resolver backed by a table of tag → component function.
///
/// A component returns a [`VNode`], which is rendered recursively.
#[derive(Default)]
pub struct ComponentTable {
    components: HashMap<String, ComponentFn>,
}

impl fmt::Debug for ComponentTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&String> = self.components.keys().collect();
        tags.sort();
        f.debug_struct("ComponentTable").field("tags", &tags).finish()
    }
}

impl ComponentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `component` for `tag` (builder).
    pub fn with(
        mut self,
        tag: impl Into<String>,
        component: impl Fn(&Props, &[VNode]) -> Result<VNode, ResolveError> + 'static,
    ) -> Self {
        self.register(tag, component);
        self
    }

    /// Register `component` for `tag`, replacing any earlier one.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        component: impl Fn(&Props, &[VNode]) -> Result<VNode, ResolveError> + 'static,
    ) {
        self.components.insert(tag.into(), Box::new(component));
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.components.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl ComponentResolver for ComponentTable {
    fn resolve(
        &self,
        tag: &str,
        props: &Props,
        children: &[VNode],
        renderer: &Renderer<'_>,
    ) -> Result<Vec<String>, ResolveError> {
        let component = self
            .components
            .get(tag)
            .ok_or_else(|| ResolveError::UnknownTag(tag.to_owned()))?;
        let tree = component(props, children)?;
        Ok(renderer.render(&tree))
    }
}
