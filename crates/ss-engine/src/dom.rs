//! Arena-backed document tree.
//!
//! Nodes live in one `Vec` and are addressed by copyable [`NodeId`]
//! handles, mirroring how a content script holds references into the live
//! page. Detaching a node unlinks it from the tree but keeps its slot, so a
//! handle to a removed node stays usable (attachment is checked with
//! [`Document::is_attached`], the same way the engine guards against page
//! script removing a node mid-pass).

use bitflags::bitflags;

/// Attribute marking a generated replacement span. Emitted by the
/// serializer so rewritten output survives a parse/rewrite round trip.
pub const SWAP_MARKER_ATTR: &str = "data-scarlet-swap";

bitflags! {
    /// Per-element state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// Generated replacement span. Subtrees under this flag are never
        /// rescanned, which is what prevents rewrite loops.
        const REPLACEMENT = 1 << 0;
    }
}

/// Handle to a node in a [`Document`]. Stable for the document's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// An element's name, attributes, and state bits.
#[derive(Debug, Clone)]
pub struct Element {
    pub name: String,
    pub flags: NodeFlags,
    attrs: Vec<(String, String)>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }
}

/// What a node is.
#[derive(Debug, Clone)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    data: NodeData,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            first_child: None,
            last_child: None,
            data,
        }
    }
}

/// The document tree rooted at the page body.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let root = Node::new(NodeData::Element(Element {
            name: "body".to_string(),
            flags: NodeFlags::empty(),
            attrs: Vec::new(),
        }));
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(Element {
            name: name.to_string(),
            flags: NodeFlags::empty(),
            attrs: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    // -------------------------------------------------------------------------
    // Access
    // -------------------------------------------------------------------------

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id).data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    /// Text of a text node; `None` for elements.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) => Some(text.as_str()),
            NodeData::Element(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element(el) = &mut self.node_mut(id).data {
            el.set_attr(name, value);
        }
    }

    pub fn add_flags(&mut self, id: NodeId, flags: NodeFlags) {
        if let NodeData::Element(el) = &mut self.node_mut(id).data {
            el.flags |= flags;
        }
    }

    /// Whether `id` is still reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    // -------------------------------------------------------------------------
    // Tree surgery
    // -------------------------------------------------------------------------

    /// Append `child` as the last child of `parent`. Detaches it from any
    /// previous position first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        debug_assert_ne!(parent, child);
        self.detach(child);
        let old_last = self.node(parent).last_child;
        {
            let node = self.node_mut(child);
            node.parent = Some(parent);
            node.prev_sibling = old_last;
        }
        match old_last {
            Some(last) => self.node_mut(last).next_sibling = Some(child),
            None => self.node_mut(parent).first_child = Some(child),
        }
        self.node_mut(parent).last_child = Some(child);
    }

    /// Insert `new` immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new: NodeId) {
        debug_assert_ne!(sibling, new);
        let parent = match self.node(sibling).parent {
            Some(parent) => parent,
            // An unparented anchor has no "before"; nothing to do.
            None => return,
        };
        self.detach(new);
        let prev = self.node(sibling).prev_sibling;
        {
            let node = self.node_mut(new);
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = Some(sibling);
        }
        self.node_mut(sibling).prev_sibling = Some(new);
        match prev {
            Some(prev) => self.node_mut(prev).next_sibling = Some(new),
            None => self.node_mut(parent).first_child = Some(new),
        }
    }

    /// Unlink `id` from its parent and siblings. The node and its subtree
    /// stay alive and re-attachable.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = self.node(id);
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        {
            let node = self.node_mut(id);
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
        if let Some(prev) = prev {
            self.node_mut(prev).next_sibling = next;
        }
        if let Some(next) = next {
            self.node_mut(next).prev_sibling = prev;
        }
        if let Some(parent) = parent {
            let parent_node = self.node_mut(parent);
            if parent_node.first_child == Some(id) {
                parent_node.first_child = next;
            }
            if parent_node.last_child == Some(id) {
                parent_node.last_child = prev;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Traversal
    // -------------------------------------------------------------------------

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Proper ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.node(id).parent,
        }
    }

    /// Concatenated text of all descendant text nodes, document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(_) => {
                for child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
        }
    }
}

pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.node(current).parent;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_children_order() {
        let mut doc = Document::new();
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        let c = doc.create_text("c");
        doc.append(doc.root(), a);
        doc.append(doc.root(), b);
        doc.append(doc.root(), c);

        let children: Vec<NodeId> = doc.children(doc.root()).collect();
        assert_eq!(children, vec![a, b, c]);
        assert_eq!(doc.text_content(doc.root()), "abc");
    }

    #[test]
    fn test_insert_before_links_siblings() {
        let mut doc = Document::new();
        let a = doc.create_text("a");
        let c = doc.create_text("c");
        doc.append(doc.root(), a);
        doc.append(doc.root(), c);

        let b = doc.create_text("b");
        doc.insert_before(c, b);
        assert_eq!(doc.text_content(doc.root()), "abc");

        let start = doc.create_text("!");
        doc.insert_before(a, start);
        assert_eq!(doc.text_content(doc.root()), "!abc");
    }

    #[test]
    fn test_detach_keeps_handle_alive() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let text = doc.create_text("hello");
        doc.append(doc.root(), div);
        doc.append(div, text);
        assert!(doc.is_attached(text));

        doc.detach(div);
        assert!(!doc.is_attached(div));
        assert!(!doc.is_attached(text));
        // The subtree is intact under the detached node.
        assert_eq!(doc.text_content(div), "hello");
        assert_eq!(doc.text_content(doc.root()), "");
    }

    #[test]
    fn test_attrs_replace_in_place() {
        let mut doc = Document::new();
        let span = doc.create_element("span");
        doc.set_attr(span, "title", "first");
        doc.set_attr(span, "title", "second");
        let el = doc.element(span).unwrap();
        assert_eq!(el.attr("title"), Some("second"));
        assert_eq!(el.attrs().count(), 1);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        let text = doc.create_text("x");
        doc.append(doc.root(), outer);
        doc.append(outer, inner);
        doc.append(inner, text);

        let chain: Vec<NodeId> = doc.ancestors(text).collect();
        assert_eq!(chain, vec![inner, outer, doc.root()]);
    }
}
