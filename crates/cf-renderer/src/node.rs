//! Output tree.
//!
//! Rendering produces a small HTML syntax tree instead of a string, so
//! annotations and post-processing hooks can inspect and rewrite the markup
//! before it is serialized with [`Node::to_html`].

/// A node of the rendered output tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// HTML element.
    Element(Element),
    /// Text content (escaped on serialization).
    Text(String),
    /// Sequence of sibling nodes without a wrapper element.
    Fragment(Vec<Node>),
}

impl Node {
    /// Create a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Collapse a node list into one node.
    ///
    /// A single node is returned as is; anything else becomes a fragment.
    #[must_use]
    pub fn from_nodes(mut nodes: Vec<Node>) -> Self {
        if nodes.len() == 1 {
            nodes.remove(0)
        } else {
            Self::Fragment(nodes)
        }
    }

    /// The element, if this node is one.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }

    /// The element, if this node is one.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Concatenated text of this node and its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Element(el) => el.children.iter().for_each(|c| c.collect_text(out)),
            Self::Fragment(nodes) => nodes.iter().for_each(|c| c.collect_text(out)),
        }
    }

    /// All descendant elements (including this node) carrying `class`, in
    /// document order.
    #[must_use]
    pub fn find_by_class(&self, class: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.walk(&mut |el| {
            if el.has_class(class) {
                found.push(el);
            }
        });
        found
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Element)) {
        match self {
            Self::Text(_) => {}
            Self::Element(el) => {
                visit(el);
                el.children.iter().for_each(|c| c.walk(visit));
            }
            Self::Fragment(nodes) => nodes.iter().for_each(|c| c.walk(visit)),
        }
    }

    /// Visit every element (including this node) in document order.
    ///
    /// An element is visited before its children, so the visitor may add or
    /// replace children that are then walked as well.
    pub fn for_each_element_mut(&mut self, visit: &mut impl FnMut(&mut Element)) {
        match self {
            Self::Text(_) => {}
            Self::Element(el) => {
                visit(el);
                el.children
                    .iter_mut()
                    .for_each(|c| c.for_each_element_mut(visit));
            }
            Self::Fragment(nodes) => nodes.iter_mut().for_each(|c| c.for_each_element_mut(visit)),
        }
    }

    /// Serialize to HTML.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_renderer::{Element, Node};
    ///
    /// let node: Node = Element::new("span")
    ///     .with_class("cf-tk")
    ///     .with_attr("title", "a \"b\"")
    ///     .with_child(Node::text("x < y"))
    ///     .into();
    ///
    /// assert_eq!(
    ///     node.to_html(),
    ///     r#"<span class="cf-tk" title="a &quot;b&quot;">x &lt; y</span>"#
    /// );
    /// ```
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Append the HTML serialization to `out`.
    pub fn write_html(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(&escape_html(text)),
            Self::Fragment(nodes) => nodes.iter().for_each(|n| n.write_html(out)),
            Self::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                if !el.classes.is_empty() {
                    out.push_str(" class=\"");
                    out.push_str(&escape_html(&el.classes.join(" ")));
                    out.push('"');
                }
                for (name, value) in &el.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_html(value));
                    out.push('"');
                }
                out.push('>');
                for child in &el.children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Self::Element(el)
    }
}

/// An HTML element.
///
/// Classes are kept apart from the other attributes so annotations can add
/// and test them without parsing the `class` attribute.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name.
    pub tag: String,
    /// CSS classes in insertion order.
    pub classes: Vec<String>,
    /// Attributes other than `class`, in insertion order.
    pub attributes: Vec<(String, String)>,
    /// Child nodes.
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Add a class.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    /// Set an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Append a child.
    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append children.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    /// Add a class unless already present.
    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    /// Whether the element carries `class`.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Append CSS declarations to the `style` attribute.
    pub fn append_style(&mut self, declarations: &str) {
        if declarations.is_empty() {
            return;
        }
        let style = match self.attr("style") {
            Some(existing) if !existing.is_empty() => format!("{existing};{declarations}"),
            _ => declarations.to_owned(),
        };
        self.set_attr("style", style);
    }
}

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html("it's"), "it&#x27;s");
    }

    #[test]
    fn test_nested_html() {
        let node: Node = Element::new("div")
            .with_class("cf-line")
            .with_child(Element::new("div").with_class("cf-code").with_child(Node::text("a<b")))
            .into();
        assert_eq!(
            node.to_html(),
            r#"<div class="cf-line"><div class="cf-code">a&lt;b</div></div>"#
        );
    }

    #[test]
    fn test_fragment_has_no_wrapper() {
        let node = Node::Fragment(vec![Node::text("a"), Element::new("b").into()]);
        assert_eq!(node.to_html(), "a<b></b>");
    }

    #[test]
    fn test_from_nodes() {
        assert_eq!(Node::from_nodes(vec![Node::text("a")]), Node::text("a"));
        assert_eq!(Node::from_nodes(vec![]), Node::Fragment(vec![]));
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut el = Element::new("pre").with_attr("data-language", "js");
        el.set_attr("data-language", "ts");
        el.set_attr("tabindex", "0");
        assert_eq!(
            el.attributes,
            vec![
                ("data-language".to_owned(), "ts".to_owned()),
                ("tabindex".to_owned(), "0".to_owned()),
            ]
        );
        assert_eq!(el.remove_attr("tabindex").as_deref(), Some("0"));
        assert_eq!(el.attr("tabindex"), None);
    }

    #[test]
    fn test_add_class_dedupes() {
        let mut el = Element::new("div").with_class("a");
        el.add_class("a");
        el.add_class("b");
        assert_eq!(el.classes, vec!["a", "b"]);
    }

    #[test]
    fn test_append_style() {
        let mut el = Element::new("span");
        el.append_style("--0:#fff");
        el.append_style("--1:#000");
        el.append_style("");
        assert_eq!(el.attr("style"), Some("--0:#fff;--1:#000"));
    }

    #[test]
    fn test_text_content_and_find() {
        let node: Node = Element::new("div")
            .with_class("cf-line")
            .with_child(Element::new("span").with_class("x").with_child(Node::text("ab")))
            .with_child(Node::text("c"))
            .into();
        assert_eq!(node.text_content(), "abc");
        assert_eq!(node.find_by_class("x").len(), 1);
        assert_eq!(node.find_by_class("cf-line").len(), 1);
        assert!(node.find_by_class("nope").is_empty());
    }
}
