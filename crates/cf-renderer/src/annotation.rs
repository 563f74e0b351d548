//! Annotations attached to blocks, lines and inline ranges.

use std::cmp::Reverse;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use cf_theme::Theme;

use crate::block::Block;
use crate::node::{Element, Node};

/// A rendering transform attached to part of a block.
///
/// Annotations run when the block is rendered. Each receives the nodes
/// produced so far for its target and returns the replacement nodes.
/// Lower priorities run first and therefore end up innermost; among equal
/// priorities the earliest registered annotation runs last and ends up
/// outermost.
pub trait Annotation: Send + Sync + fmt::Debug {
    /// Annotation name, used in logs and for lookups by plugins.
    fn name(&self) -> &str;

    /// Render priority. Defaults to `0`.
    fn priority(&self) -> i32 {
        0
    }

    /// Transform the nodes of the annotated target.
    fn render(&self, ctx: &AnnotationContext<'_>, nodes: Vec<Node>) -> Vec<Node>;
}

/// Context passed to [`Annotation::render`].
#[derive(Debug)]
pub struct AnnotationContext<'a> {
    /// Block being rendered.
    pub block: &'a Block,
    /// Line being rendered (`None` for block-level annotations).
    pub line_index: Option<usize>,
    /// Themes of the renderer, in configuration order.
    pub themes: &'a [Arc<Theme>],
}

/// Where an annotation applies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationTarget {
    /// The whole block (wraps the `pre` element).
    Block,
    /// A whole line (wraps the line element).
    Line(usize),
    /// A character range within a line (wraps the covered text).
    Range {
        /// Line index.
        line: usize,
        /// Character offsets within the line, end exclusive.
        range: Range<usize>,
    },
}

/// Position of an annotation in registration order: the index of the plugin
/// that added it, then a per-block sequence number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationOrder {
    /// Index of the registering plugin (`usize::MAX` outside plugin hooks).
    pub plugin: usize,
    /// Per-block sequence number.
    pub sequence: usize,
}

/// An annotation attached to a block.
#[derive(Clone, Debug)]
pub struct AttachedAnnotation {
    /// The annotation.
    pub annotation: Arc<dyn Annotation>,
    /// Priority captured when the annotation was attached.
    pub priority: i32,
    /// Registration order.
    pub order: RegistrationOrder,
}

impl AttachedAnnotation {
    pub(crate) fn new(annotation: Arc<dyn Annotation>, order: RegistrationOrder) -> Self {
        Self {
            priority: annotation.priority(),
            annotation,
            order,
        }
    }

    /// Sort key of the execution order: ascending priority, then latest
    /// registration first.
    pub(crate) fn sort_key(&self) -> (i32, Reverse<RegistrationOrder>) {
        (self.priority, Reverse(self.order))
    }
}

/// An annotation over a character range of a line.
#[derive(Clone, Debug)]
pub struct InlineAnnotation {
    /// Character offsets, end exclusive.
    pub range: Range<usize>,
    /// The attached annotation.
    pub attached: AttachedAnnotation,
}

/// Apply annotations to `nodes` in execution order.
pub(crate) fn apply<'a>(
    annotations: impl IntoIterator<Item = &'a AttachedAnnotation>,
    ctx: &AnnotationContext<'_>,
    mut nodes: Vec<Node>,
) -> Vec<Node> {
    let mut ordered: Vec<_> = annotations.into_iter().collect();
    ordered.sort_by_key(|a| a.sort_key());
    for attached in ordered {
        nodes = attached.annotation.render(ctx, nodes);
    }
    nodes
}

/// Wraps its target in a new element.
///
/// # Example
///
/// ```
/// use cf_renderer::{Annotation, WrapAnnotation};
///
/// let mark = WrapAnnotation::new("mark", "mark").with_class("highlight");
/// assert_eq!(mark.name(), "mark");
/// assert_eq!(mark.priority(), 0);
/// ```
#[derive(Clone, Debug)]
pub struct WrapAnnotation {
    name: String,
    tag: String,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    priority: i32,
}

impl WrapAnnotation {
    /// Wrap targets in `<tag>`.
    #[must_use]
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            classes: Vec::new(),
            attributes: Vec::new(),
            priority: 0,
        }
    }

    /// Add a class to the wrapper.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set an attribute on the wrapper.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Set the render priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Annotation for WrapAnnotation {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn render(&self, _ctx: &AnnotationContext<'_>, nodes: Vec<Node>) -> Vec<Node> {
        let mut el = Element::new(&self.tag).with_children(nodes);
        for class in &self.classes {
            el.add_class(class.clone());
        }
        for (name, value) in &self.attributes {
            el.set_attr(name.clone(), value.clone());
        }
        vec![el.into()]
    }
}

/// Adds a class to each top-level element of its target.
///
/// Suited to line annotations such as "marked line" that style the existing
/// line element instead of wrapping it.
#[derive(Clone, Debug)]
pub struct ClassAnnotation {
    name: String,
    class: String,
    priority: i32,
}

impl ClassAnnotation {
    /// Add `class` to annotated elements.
    #[must_use]
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            priority: 0,
        }
    }

    /// Set the render priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl Annotation for ClassAnnotation {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn render(&self, _ctx: &AnnotationContext<'_>, mut nodes: Vec<Node>) -> Vec<Node> {
        for node in &mut nodes {
            if let Some(el) = node.as_element_mut() {
                el.add_class(self.class.clone());
            }
        }
        nodes
    }
}
