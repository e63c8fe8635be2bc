//! Document arena with mutation notifications.
//!
//! # Responsibilities
//! - Own every node; hand out `NodeId` handles
//! - Structural edits (append, remove, replace content)
//! - Query connected nodes in document order
//! - Notify subscribers of child-list mutations and ready-state changes
//!
//! # Design Decisions
//! - Removed nodes stay in the arena, detached; ids are never reused
//! - Only edits under the connected tree are reported, like a subtree
//!   observer on the document
//! - Attribute and class edits are not reported

use tokio::sync::mpsc;

use crate::dom::node::{ElementData, Node, NodeData, NodeId};
use crate::dom::parser;
use crate::dom::selector::{SelectorError, SelectorList};

/// Document loading state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// Notification delivered to document subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    /// Children of `target` changed.
    ChildList { target: NodeId },
    ReadyStateChange(ReadyState),
}

/// Handle returned by [`Document::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Elements whose text children are serialized without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Arena-based document tree.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    title: String,
    ready_state: ReadyState,
    subscribers: Vec<(SubscriptionId, mpsc::UnboundedSender<DocumentEvent>)>,
    next_subscription: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with `<html>`, `<head>` and `<body>`.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![Node::new(NodeData::Document)],
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            title: String::new(),
            ready_state: ReadyState::Loading,
            subscribers: Vec::new(),
            next_subscription: 0,
        };
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.attach(doc.root, html);
        doc.attach(html, head);
        doc.attach(html, body);
        doc.head = head;
        doc.body = body;
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(ElementData::tag)
    }

    // ----- creation -----

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Comment(text.to_string()))
    }

    /// Parse `markup` into detached nodes, in order.
    pub fn parse_fragment(&mut self, markup: &str) -> Vec<NodeId> {
        parser::parse_fragment(self, markup)
    }

    // ----- structure -----

    /// Whether the node is reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
    }

    fn detach(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.get_mut(child)?.parent.take()?;
        if let Some(node) = self.get_mut(parent) {
            node.children.retain(|c| *c != child);
        }
        Some(parent)
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    /// elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.get(parent).is_none() || self.get(child).is_none() {
            return;
        }
        if self.is_inclusive_ancestor(child, parent) {
            tracing::warn!(parent = %parent, child = %child, "Refusing to create a cycle");
            return;
        }
        if let Some(old_parent) = self.detach(child) {
            self.notify_child_list(old_parent);
        }
        self.attach(parent, child);
        self.notify_child_list(parent);
    }

    /// Detach a node from its parent. The node and its subtree stay valid.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(parent) = self.detach(id) {
            self.notify_child_list(parent);
        }
    }

    fn clear_children(&mut self, id: NodeId) {
        let children = match self.get_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return,
        };
        for child in children {
            if let Some(node) = self.get_mut(child) {
                node.parent = None;
            }
        }
    }

    /// Replace the children of `id` with the parsed `markup`.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) {
        self.clear_children(id);
        self.append_html(id, markup);
    }

    /// Parse `markup` and append the nodes to `id`. Reported as one
    /// child-list change.
    pub fn append_html(&mut self, id: NodeId, markup: &str) -> Vec<NodeId> {
        if self.get(id).is_none() {
            return Vec::new();
        }
        let nodes = self.parse_fragment(markup);
        for node in &nodes {
            self.attach(id, *node);
        }
        self.notify_child_list(id);
        nodes
    }

    /// Replace the children of `id` with a text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.attach(id, node);
        }
        self.notify_child_list(id);
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            match self.get(node).map(Node::data) {
                Some(NodeData::Text(t)) => out.push_str(t),
                _ => {}
            }
        }
        out
    }

    /// Serialized children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let raw = self.tag(id).is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
        let mut out = String::new();
        for child in self.children(id) {
            self.serialize(*child, raw, &mut out);
        }
        out
    }

    fn serialize(&self, id: NodeId, raw: bool, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match node.data() {
            NodeData::Document => {}
            NodeData::Text(t) if raw => out.push_str(t),
            NodeData::Text(t) => out.push_str(&escape(t, false)),
            NodeData::Comment(c) => out.push_str(&format!("<!--{c}-->")),
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(el.tag());
                if !el.classes().is_empty() {
                    out.push_str(&format!(" class=\"{}\"", escape(&el.class_name(), true)));
                }
                for (k, v) in el.attributes() {
                    out.push_str(&format!(" {}=\"{}\"", k, escape(v, true)));
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.tag()) {
                    return;
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&el.tag());
                for child in node.children() {
                    self.serialize(*child, raw, out);
                }
                out.push_str(&format!("</{}>", el.tag()));
            }
        }
    }

    // ----- attributes -----

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_attribute(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.set_attribute(name, value);
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.remove_attribute(name);
        }
    }

    pub fn classes(&self, id: NodeId) -> Vec<String> {
        self.element(id)
            .map(|e| e.classes().to_vec())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id) {
            el.add_class(class);
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id) {
            el.remove_class(class);
        }
    }

    // ----- queries -----

    /// `id` and its descendants in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Connected elements matching `selector`, in document order.
    pub fn select(&self, selector: &SelectorList) -> Vec<NodeId> {
        self.select_within(self.root, selector)
    }

    /// Descendants of `scope` (excluding `scope`) matching `selector`.
    pub fn select_within(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        if !self.is_connected(scope) {
            return Vec::new();
        }
        self.descendants(scope)
            .into_iter()
            .skip(1)
            .filter(|n| selector.matches(self, *n))
            .collect()
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        Ok(self.select(&SelectorList::parse(selector)?))
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.element(*n).and_then(ElementData::id) == Some(id))
    }

    /// Detach the element with the given id, if present.
    pub fn remove_element_by_id(&mut self, id: &str) -> bool {
        match self.get_element_by_id(id) {
            Some(node) => {
                self.remove(node);
                true
            }
            None => false,
        }
    }

    /// Nearest inclusive ancestor satisfying `pred`.
    pub fn closest(&self, id: NodeId, pred: impl Fn(&ElementData) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.element(node).is_some_and(&pred) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    // ----- document state -----

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    pub fn set_ready_state(&mut self, state: ReadyState) {
        if self.ready_state != state {
            self.ready_state = state;
            self.notify(DocumentEvent::ReadyStateChange(state));
        }
    }

    // ----- notifications -----

    /// Subscribe to child-list mutations and ready-state changes.
    pub fn subscribe(&mut self) -> (SubscriptionId, mpsc::UnboundedReceiver<DocumentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, tx));
        (id, rx)
    }

    /// Drop a subscription; its receiver sees the stream end.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub, _)| *sub != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify_child_list(&mut self, target: NodeId) {
        if self.is_connected(target) {
            self.notify(DocumentEvent::ChildList { target });
        }
    }

    fn notify(&mut self, event: DocumentEvent) {
        self.subscribers.retain(|(_, tx)| tx.send(event).is_ok());
    }
}

fn escape(value: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
