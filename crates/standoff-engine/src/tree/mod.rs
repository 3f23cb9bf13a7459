/*!
 * # Element Tree
 *
 * An arena-backed XML element tree. Nodes are addressed by [`ElementId`],
 * an index into the arena, so the position table can refer to elements
 * without borrowing the tree.
 *
 * Text follows the text/tail convention: an element's `text` is the
 * character data before its first child, and a child's `tail` is the
 * character data between that child's end and the next sibling (or the
 * parent's end).
 *
 * Nodes are not freed individually; detached nodes stay in the arena, so
 * every `ElementId` handed out stays valid. Rebuilds from the position table
 * rewrite existing nodes in place instead of allocating new ones.
 */

mod attributes;
pub mod xml;

use std::fmt;

pub use attributes::Attributes;

/// Handle to a node in a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    /// `<!-- text -->`. Comment text counts as document text.
    Comment,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub tag: String,
    pub attrib: Attributes,
    pub text: Option<String>,
    pub tail: Option<String>,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
}

impl Node {
    fn new(kind: NodeKind, tag: String, attrib: Attributes) -> Self {
        Self {
            kind,
            tag,
            attrib,
            text: None,
            tail: None,
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// An element with no children and no text.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.text.as_deref().is_none_or(str::is_empty)
    }

    pub fn is_comment(&self) -> bool {
        self.kind == NodeKind::Comment
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.tag)
    }
}

/// Strip a `{namespace}` or `prefix:` qualifier from a tag.
pub fn local_name(tag: &str) -> &str {
    if let Some(rest) = tag.strip_prefix('{')
        && let Some((_, name)) = rest.split_once('}')
    {
        return name;
    }
    tag.rsplit_once(':').map_or(tag, |(_, name)| name)
}

/// Whether `tag` names the element `query`, either exactly or by local name.
pub fn tag_matches(tag: &str, query: &str) -> bool {
    tag == query || local_name(tag) == query
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: ElementId,
}

impl Tree {
    pub fn new(tag: impl Into<String>) -> Self {
        Self::with_root(tag, Attributes::new())
    }

    pub fn with_root(tag: impl Into<String>, attrib: Attributes) -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Element, tag.into(), attrib)],
            root: ElementId(0),
        }
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn get(&self, id: ElementId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: ElementId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: impl Into<String>, attrib: Attributes) -> ElementId {
        self.push_node(Node::new(NodeKind::Element, tag.into(), attrib))
    }

    /// Create a detached comment.
    pub fn create_comment(&mut self, text: impl Into<String>) -> ElementId {
        let mut node = Node::new(NodeKind::Comment, String::new(), Attributes::new());
        node.text = Some(text.into());
        self.push_node(node)
    }

    fn push_node(&mut self, node: Node) -> ElementId {
        self.nodes.push(node);
        ElementId(self.nodes.len() - 1)
    }

    /// Append `child` as the last child of `parent`, moving it out of any
    /// parent it already has.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn detach(&mut self, id: ElementId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    /// Drop `id`'s text and children. The children become detached; tag,
    /// attributes, tail and place in the parent are kept.
    pub fn clear_content(&mut self, id: ElementId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        self.nodes[id.0].text = None;
    }

    /// Number of nodes in the arena, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Forget every node created after the arena held `len` nodes. None of
    /// them may be attached.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len.max(1));
    }

    /// Append character data at the current end of `id`'s content: to its
    /// text when it has no children, otherwise to the last child's tail.
    pub fn push_content(&mut self, id: ElementId, s: &str) {
        match self.nodes[id.0].children.last().copied() {
            Some(last) => self.push_tail(last, s),
            None => self.push_text(id, s),
        }
    }

    pub fn push_text(&mut self, id: ElementId, s: &str) {
        self.nodes[id.0].text.get_or_insert_with(String::new).push_str(s);
    }

    pub fn push_tail(&mut self, id: ElementId, s: &str) {
        self.nodes[id.0].tail.get_or_insert_with(String::new).push_str(s);
    }

    pub fn contains_child(&self, parent: ElementId, child: ElementId) -> bool {
        self.nodes[child.0].parent == Some(parent)
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.get(id).parent, |&p| self.get(p).parent)
    }

    /// `id` and all of its descendants, in document order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.get(next).children.iter().rev());
        }
        out
    }

    /// First element under the root (root included) whose tag matches `name`.
    pub fn find_first(&self, name: &str) -> Option<ElementId> {
        self.descendants(self.root).into_iter().find(|&id| {
            let node = self.get(id);
            !node.is_comment() && tag_matches(&node.tag, name)
        })
    }

    /// Serialize the whole tree.
    pub fn to_xml(&self) -> String {
        self.element_to_xml(self.root)
    }

    /// Serialize one element and its content, without its tail.
    pub fn element_to_xml(&self, id: ElementId) -> String {
        let mut out = String::new();
        xml::write_element(self, id, &mut out);
        out
    }
}
