//! Retained element tree.
//!
//! A small DOM model: elements with an optional id, a class list,
//! attributes and children. Text is stored raw and escaped only when the
//! tree is rendered, so reply text can never become markup. Line breaks are
//! explicit [`Node::LineBreak`] nodes produced by [`text_with_breaks`].

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    LineBreak,
}

impl From<Element> for Node {
    fn from(value: Element) -> Self {
        Self::Element(value)
    }
}

/// An HTML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    children: Vec<Node>,
}

const VOID_TAGS: &[&str] = &["br", "input", "img", "meta", "link", "hr"];

impl Element {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Builder
    // ─────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add one or more space-separated classes.
    #[must_use]
    pub fn with_class(mut self, classes: &str) -> Self {
        for class in classes.split_whitespace() {
            self.set_class(class, true);
        }
        self
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Direct element children, skipping text and breaks.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Concatenated text of all descendants; breaks become `\n`.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Element(e) => e.collect_text(out),
                Node::Text(t) => out.push_str(t),
                Node::LineBreak => out.push('\n'),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────

    /// Add or remove a class. Returns whether the list changed.
    pub fn set_class(&mut self, class: &str, on: bool) -> bool {
        let present = self.has_class(class);
        match (present, on) {
            (false, true) => {
                self.classes.push(class.to_string());
                true
            }
            (true, false) => {
                self.classes.retain(|c| c != class);
                true
            }
            _ => false,
        }
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attrs.remove(name)
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![Node::Text(text.into())];
    }

    pub fn push_child(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Depth-first search for the element with `id` (self included).
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.child_elements().find_map(|e| e.find_by_id(id))
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) => e.find_by_id_mut(id),
            _ => None,
        })
    }

    /// Detach the first descendant with `id` and return it.
    pub fn remove_by_id(&mut self, id: &str) -> Option<Element> {
        let position = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if e.id() == Some(id)));
        if let Some(index) = position {
            return match self.children.remove(index) {
                Node::Element(e) => Some(e),
                _ => None,
            };
        }
        self.children.iter_mut().find_map(|n| match n {
            Node::Element(e) => e.remove_by_id(id),
            _ => None,
        })
    }

    /// All descendants (self included) carrying `class`, in document order.
    #[must_use]
    pub fn find_all_by_class(&self, class: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        self.collect_by_class(class, &mut found);
        found
    }

    fn collect_by_class<'a>(&'a self, class: &str, found: &mut Vec<&'a Element>) {
        if self.has_class(class) {
            found.push(self);
        }
        for child in self.child_elements() {
            child.collect_by_class(class, found);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────

    /// Serialize to HTML with every text and attribute value escaped.
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        if let Some(id) = &self.id {
            let _ = write!(out, " id=\"{}\"", escape_attr(id));
        }
        if !self.classes.is_empty() {
            let _ = write!(out, " class=\"{}\"", escape_attr(&self.classes.join(" ")));
        }
        for (name, value) in &self.attrs {
            if value.is_empty() {
                let _ = write!(out, " {name}");
            } else {
                let _ = write!(out, " {name}=\"{}\"", escape_attr(value));
            }
        }
        out.push('>');

        if VOID_TAGS.contains(&self.tag.as_str()) {
            return;
        }

        for child in &self.children {
            match child {
                Node::Element(e) => e.write_html(out),
                Node::Text(t) => out.push_str(&escape_text(t)),
                Node::LineBreak => out.push_str("<br>"),
            }
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

/// Split text on newlines into text nodes separated by explicit breaks.
#[must_use]
pub fn text_with_breaks(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            nodes.push(Node::LineBreak);
        }
        let line = line.strip_suffix('\r').unwrap_or(line);
        if !line.is_empty() {
            nodes.push(Node::Text(line.to_string()));
        }
    }
    nodes
}

/// Escape text content.
#[must_use]
pub fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape an attribute value (double-quoted).
#[must_use]
pub fn escape_attr(raw: &str) -> String {
    escape_text(raw).replace('"', "&quot;").replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("div")
            .with_id("root")
            .with_class("a b")
            .with_child(
                Element::new("ul")
                    .with_id("list")
                    .with_child(Element::new("li").with_id("one").with_class("item").with_text("1"))
                    .with_child(Element::new("li").with_id("two").with_class("item").with_text("2")),
            )
    }

    #[test]
    fn test_find_and_remove_by_id() {
        let mut root = sample();
        assert_eq!(root.find_by_id("two").unwrap().text_content(), "2");

        let removed = root.remove_by_id("one").unwrap();
        assert_eq!(removed.id(), Some("one"));
        assert!(root.find_by_id("one").is_none());
        assert_eq!(root.find_all_by_class("item").len(), 1);
        assert!(root.remove_by_id("one").is_none());
    }

    #[test]
    fn test_set_class_reports_change() {
        let mut root = sample();
        assert!(!root.set_class("a", true));
        assert!(root.set_class("minimized", true));
        assert!(root.has_class("minimized"));
        assert!(root.set_class("minimized", false));
        assert!(!root.set_class("minimized", false));
    }

    #[test]
    fn test_render_escapes_text_and_attributes() {
        let el = Element::new("div")
            .with_attr("title", "say \"hi\"")
            .with_text("<script>alert('x')</script> & more");
        assert_eq!(
            el.render_html(),
            "<div title=\"say &quot;hi&quot;\">&lt;script&gt;alert('x')&lt;/script&gt; &amp; more</div>"
        );
    }

    #[test]
    fn test_render_void_and_boolean_attributes() {
        let el = Element::new("form")
            .with_child(Element::new("input").with_id("in").with_attr("type", "text"))
            .with_child(Element::new("button").with_attr("disabled", "").with_text("Send"));
        assert_eq!(
            el.render_html(),
            "<form><input id=\"in\" type=\"text\"><button disabled>Send</button></form>"
        );
    }

    #[test]
    fn test_text_with_breaks() {
        let nodes = text_with_breaks("a\n\nb<br>");
        assert_eq!(
            nodes,
            vec![
                Node::Text("a".into()),
                Node::LineBreak,
                Node::LineBreak,
                Node::Text("b<br>".into()),
            ]
        );

        let bubble = Element::new("div").with_children(nodes);
        assert_eq!(bubble.render_html(), "<div>a<br><br>b&lt;br&gt;</div>");
        assert_eq!(bubble.text_content(), "a\n\nb<br>");
    }
}
