//! Headless document model.
//!
//! Controllers never touch a live browser. They bind to a [`Document`]: an
//! arena of element and text nodes built from shell markup and mutated by
//! fragment injection, class toggles, attribute writes and inline styles.
//! Tests drive the same controllers against the same model, so "what the
//! user would see" is always an inspectable value.
//!
//! ## Sharing
//!
//! [`Dom`] is the shared handle. Its lock is taken for the duration of a
//! closure and is never held across an `.await`, which keeps every mutation
//! atomic with respect to the async tasks that interleave at fetch and
//! timer boundaries.
//!
//! ## Layout
//!
//! There is no layout engine. Hosts (or tests) assign a [`Rect`] to the
//! elements they care about; elements without one are treated as off-screen
//! by the reveal observer.

mod parse;

use parse::{ParsedNode, escape_attr, escape_text, is_void_tag, parse_fragment};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Stable handle to a node. Handles to removed nodes simply stop resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Vertical layout box in document coordinates (pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub height: f64,
}

/// Viewport geometry and scroll position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
            scroll_y: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    /// Every attribute except `class` and `style`, which have their own fields.
    pub attrs: BTreeMap<String, String>,
    pub style: BTreeMap<String, String>,
    pub rect: Option<Rect>,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            style: BTreeMap::new(),
            rect: None,
        }
    }

    fn from_parsed(tag: String, attrs: Vec<(String, String)>) -> Self {
        let mut element = Self::new(&tag);
        for (name, value) in attrs {
            match name.as_str() {
                "class" => {
                    for class in value.split_ascii_whitespace() {
                        if !element.classes.iter().any(|c| c == class) {
                            element.classes.push(class.to_string());
                        }
                    }
                }
                "style" => element.style = parse_style(&value),
                _ => {
                    element.attrs.insert(name, value);
                }
            }
        }
        element
    }

    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id").map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: BTreeMap<NodeId, Node>,
    next_id: usize,
    body: NodeId,
    pub viewport: Viewport,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only `<body>`.
    pub fn new() -> Self {
        let body = NodeId(0);
        let mut nodes = BTreeMap::new();
        nodes.insert(
            body,
            Node {
                data: NodeData::Element(Element::new("body")),
                parent: None,
                children: Vec::new(),
            },
        );
        Self {
            nodes,
            next_id: 1,
            body,
            viewport: Viewport::default(),
        }
    }

    /// A document whose body holds `markup`.
    pub fn from_shell(markup: &str) -> Self {
        let mut doc = Self::new();
        let body = doc.body;
        doc.set_inner_html(body, markup);
        doc
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes.get(&node)?.data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(&node)?.data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    pub fn exists(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Element descendants of `root` in document order (excluding `root`).
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(&root) {
            Some(node) => node.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if matches!(node.data, NodeData::Element(_)) {
                out.push(id);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Descendants of `root` (excluding `root`) whose element matches `pred`.
    pub fn find_all(&self, root: NodeId, pred: impl Fn(&Element) -> bool) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|id| self.element(*id).is_some_and(&pred))
            .collect()
    }

    pub fn find(&self, root: NodeId, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        self.find_all(root, pred).into_iter().next()
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        if self.element(self.body).and_then(Element::id) == Some(id) {
            return Some(self.body);
        }
        self.find(self.body, |el| el.id() == Some(id))
    }

    pub fn by_class(&self, class: &str) -> Vec<NodeId> {
        self.find_all(self.body, |el| el.has_class(class))
    }

    pub fn by_class_in(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.find_all(root, |el| el.has_class(class))
    }

    pub fn with_attr(&self, name: &str) -> Vec<NodeId> {
        self.find_all(self.body, |el| el.attrs.contains_key(name))
    }

    pub fn by_tag_in(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.find_all(root, |el| el.tag == tag)
    }

    /// True when `node` is `ancestor` or lies inside it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Nearest inclusive ancestor whose element matches `pred`.
    pub fn closest(&self, node: NodeId, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.element(current).is_some_and(&pred) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    /// Nearest inclusive ancestor carrying `class`.
    pub fn closest_with_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        self.closest(node, |el| el.has_class(class))
    }

    /// Nearest inclusive ancestor carrying attribute `name`.
    pub fn closest_with_attr(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.closest(node, |el| el.attrs.contains_key(name))
    }

    // ---------------------------------------------------------------------
    // Markup
    // ---------------------------------------------------------------------

    /// Replace every child of `node` with the nodes `markup` declares.
    ///
    /// Returns false when `node` does not resolve to an element.
    pub fn set_inner_html(&mut self, node: NodeId, markup: &str) -> bool {
        if self.element(node).is_none() {
            return false;
        }
        self.clear_children(node);
        for parsed in parse_fragment(markup) {
            self.attach(node, parsed);
        }
        true
    }

    /// Append the nodes `markup` declares after the existing children of
    /// `node`, returning the new top-level elements.
    pub fn append_html(&mut self, node: NodeId, markup: &str) -> Vec<NodeId> {
        if self.element(node).is_none() {
            return Vec::new();
        }
        let mut added = Vec::new();
        for parsed in parse_fragment(markup) {
            let is_element = matches!(parsed, ParsedNode::Element { .. });
            let id = self.attach(node, parsed);
            if is_element {
                added.push(id);
            }
        }
        added
    }

    /// Replace the children of `node` with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> bool {
        if self.element(node).is_none() {
            return false;
        }
        self.clear_children(node);
        let id = self.alloc(NodeData::Text(text.to_string()), Some(node));
        if let Some(parent) = self.nodes.get_mut(&node) {
            parent.children.push(id);
        }
        true
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(&node) else {
            return;
        };
        match &n.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(_) => {
                for child in &n.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(n) = self.nodes.get(&node) {
            for child in &n.children {
                self.serialize(*child, &mut out);
            }
        }
        out
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize(node, &mut out);
        out
    }

    fn serialize(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(&node) else {
            return;
        };
        match &n.data {
            NodeData::Text(text) => out.push_str(&escape_text(text)),
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                if let Some(id) = el.id() {
                    out.push_str(&format!(" id=\"{}\"", escape_attr(id)));
                }
                if !el.classes.is_empty() {
                    out.push_str(&format!(" class=\"{}\"", escape_attr(&el.classes.join(" "))));
                }
                for (name, value) in el.attrs.iter().filter(|(name, _)| *name != "id") {
                    out.push_str(&format!(" {name}=\"{}\"", escape_attr(value)));
                }
                if !el.style.is_empty() {
                    out.push_str(&format!(" style=\"{}\"", escape_attr(&render_style(&el.style))));
                }
                out.push('>');
                if is_void_tag(&el.tag) {
                    return;
                }
                for child in &n.children {
                    self.serialize(*child, out);
                }
                out.push_str(&format!("</{}>", el.tag));
            }
        }
    }

    /// Detach `node` and drop it with all of its descendants.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.body {
            return;
        }
        if let Some(parent) = self.parent(node)
            && let Some(p) = self.nodes.get_mut(&parent)
        {
            p.children.retain(|c| *c != node);
        }
        self.drop_subtree(node);
    }

    fn clear_children(&mut self, node: NodeId) {
        let children = match self.nodes.get_mut(&node) {
            Some(n) => std::mem::take(&mut n.children),
            None => return,
        };
        for child in children {
            self.drop_subtree(child);
        }
    }

    fn drop_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(n) = self.nodes.remove(&id) {
                stack.extend(n.children);
            }
        }
    }

    fn alloc(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                data,
                parent,
                children: Vec::new(),
            },
        );
        id
    }

    fn attach(&mut self, parent: NodeId, parsed: ParsedNode) -> NodeId {
        let (data, children) = match parsed {
            ParsedNode::Text(text) => (NodeData::Text(text), Vec::new()),
            ParsedNode::Element {
                tag,
                attrs,
                children,
            } => (NodeData::Element(Element::from_parsed(tag, attrs)), children),
        };
        let id = self.alloc(data, Some(parent));
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(id);
        }
        for child in children {
            self.attach(id, child);
        }
        id
    }

    // ---------------------------------------------------------------------
    // Classes, attributes, styles, layout
    // ---------------------------------------------------------------------

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node).is_some_and(|el| el.has_class(class))
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if let Some(el) = self.element_mut(node)
            && !el.has_class(class)
        {
            el.classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if let Some(el) = self.element_mut(node) {
            el.classes.retain(|c| c != class);
        }
    }

    /// Add `class` when `on`, remove it otherwise.
    pub fn toggle_class(&mut self, node: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            el.attrs.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        if let Some(el) = self.element_mut(node) {
            el.attrs.remove(name);
        }
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.element(node)?.style.get(property).map(String::as_str)
    }

    /// Set an inline style; an empty value removes the property.
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            if value.is_empty() {
                el.style.remove(property);
            } else {
                el.style.insert(property.to_string(), value.to_string());
            }
        }
    }

    pub fn rect(&self, node: NodeId) -> Option<Rect> {
        self.element(node)?.rect
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        if let Some(el) = self.element_mut(node) {
            el.rect = Some(rect);
        }
    }

    pub fn scroll_to(&mut self, y: f64) {
        self.viewport.scroll_y = y.max(0.0);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_to(0.0);
    }
}

fn parse_style(value: &str) -> BTreeMap<String, String> {
    value
        .split(';')
        .filter_map(|decl| {
            let (prop, val) = decl.split_once(':')?;
            let (prop, val) = (prop.trim(), val.trim());
            (!prop.is_empty() && !val.is_empty()).then(|| (prop.to_string(), val.to_string()))
        })
        .collect()
}

fn render_style(style: &BTreeMap<String, String>) -> String {
    style
        .iter()
        .map(|(prop, val)| format!("{prop}: {val};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shared, lockable handle to a [`Document`].
#[derive(Debug, Clone, Default)]
pub struct Dom(Arc<Mutex<Document>>);

impl Dom {
    pub fn new(doc: Document) -> Self {
        Self(Arc::new(Mutex::new(doc)))
    }

    pub fn from_shell(markup: &str) -> Self {
        Self::new(Document::from_shell(markup))
    }

    /// Run `f` with shared access. Do not `.await` inside.
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        let guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// Run `f` with exclusive access. Do not `.await` inside.
    pub fn write<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHELL: &str = r#"
        <header id="header"><nav><a data-route="home" class="text-gray-600">Home</a></nav></header>
        <main id="main-content"></main>
        <div id="toast-root"></div>
    "#;

    #[test]
    fn shell_elements_are_indexed_by_id() {
        let doc = Document::from_shell(SHELL);
        assert!(doc.by_id("main-content").is_some());
        assert!(doc.by_id("header").is_some());
        assert!(doc.by_id("missing").is_none());
    }

    #[test]
    fn set_inner_html_replaces_descendants() {
        let mut doc = Document::from_shell(SHELL);
        let main = doc.by_id("main-content").unwrap();
        doc.set_inner_html(main, r#"<div id="first"></div>"#);
        let first = doc.by_id("first").unwrap();

        doc.set_inner_html(main, r#"<div id="second"></div>"#);
        assert!(doc.by_id("first").is_none());
        assert!(!doc.exists(first));
        assert!(doc.by_id("second").is_some());
    }

    #[test]
    fn classes_attributes_and_styles() {
        let mut doc = Document::from_shell(r#"<p id="p" class="a" style="opacity: 0">x</p>"#);
        let p = doc.by_id("p").unwrap();
        doc.add_class(p, "b");
        doc.add_class(p, "b");
        doc.remove_class(p, "a");
        assert_eq!(doc.element(p).unwrap().classes, vec!["b".to_string()]);

        doc.set_attr(p, "data-x", "1");
        assert_eq!(doc.attr(p, "data-x"), Some("1"));

        assert_eq!(doc.style(p, "opacity"), Some("0"));
        doc.set_style(p, "opacity", "");
        assert_eq!(doc.style(p, "opacity"), None);
    }

    #[test]
    fn text_content_spans_descendants() {
        let doc = Document::from_shell("<div id=\"d\">Hello <b>big</b> world</div>");
        let d = doc.by_id("d").unwrap();
        assert_eq!(doc.text_content(d), "Hello big world");
    }

    #[test]
    fn set_text_escapes_on_serialization() {
        let mut doc = Document::from_shell(r#"<span id="s"></span>"#);
        let s = doc.by_id("s").unwrap();
        doc.set_text(s, "<b>");
        assert_eq!(doc.inner_html(s), "&lt;b&gt;");
        assert_eq!(doc.text_content(s), "<b>");
    }

    #[test]
    fn contains_and_closest() {
        let doc = Document::from_shell(
            r#"<div id="outer" class="card"><span id="inner"></span></div><p id="other"></p>"#,
        );
        let outer = doc.by_id("outer").unwrap();
        let inner = doc.by_id("inner").unwrap();
        let other = doc.by_id("other").unwrap();
        assert!(doc.contains(outer, inner));
        assert!(!doc.contains(outer, other));
        assert_eq!(doc.closest_with_class(inner, "card"), Some(outer));
    }

    #[test]
    fn append_and_remove() {
        let mut doc = Document::from_shell(SHELL);
        let root = doc.by_id("toast-root").unwrap();
        let added = doc.append_html(root, r#"<div class="toast">hi</div>"#);
        assert_eq!(added.len(), 1);
        assert_eq!(doc.by_class("toast").len(), 1);
        doc.remove(added[0]);
        assert!(doc.by_class("toast").is_empty());
    }

    #[test]
    fn outer_html_round_trips_attributes() {
        let doc = Document::from_shell(r#"<a id="x" class="btn" data-v='say "hi"'>go</a>"#);
        let x = doc.by_id("x").unwrap();
        assert_eq!(
            doc.outer_html(x),
            r#"<a id="x" class="btn" data-v="say &quot;hi&quot;">go</a>"#
        );
    }

    #[test]
    fn mutations_on_missing_nodes_are_no_ops() {
        let mut doc = Document::from_shell(SHELL);
        let main = doc.by_id("main-content").unwrap();
        doc.remove(main);
        doc.add_class(main, "x");
        assert!(!doc.set_inner_html(main, "<p></p>"));
        assert!(!doc.has_class(main, "x"));
    }

    #[test]
    fn dom_handle_shares_state() {
        let dom = Dom::from_shell(SHELL);
        let clone = dom.clone();
        dom.write(|doc| {
            let main = doc.by_id("main-content").unwrap();
            doc.add_class(main, "busy");
        });
        assert_eq!(clone.read(|doc| doc.by_class("busy").len()), 1);
    }
}
