use std::borrow::Cow;
use std::fmt;

pub mod html;

pub use html::MarkupError;

/// Handle to a node stored in a [`Markup`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Element name, compared ASCII-case-insensitively and stored lowercase.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagName(Cow<'static, str>);

/// The generic inline container used for CSS layers.
pub static CSS_CONTAINER_TAG: TagName = TagName(Cow::Borrowed("span"));

impl TagName {
    pub fn new(name: &str) -> Self {
        Self(Cow::Owned(name.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names must start with an ASCII letter and continue with letters, digits or `-`.
    pub fn is_valid(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {
                chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '-')
            }
            _ => false,
        }
    }
}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TagName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Element attributes in insertion order. Equality ignores order.
#[derive(Clone, Debug, Default, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets an attribute, replacing the value of an existing one with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(key, _)| *key == name) {
            entry.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self
            .0
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.0.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (key, value) in iter {
            attributes.set(key, value);
        }
        attributes
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub tag: TagName,
    pub attributes: Attributes,
}

impl Element {
    pub fn new(tag: TagName) -> Self {
        Self {
            tag,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attributes(tag: TagName, attributes: Attributes) -> Self {
        Self { tag, attributes }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// A detached container whose children move as a unit when inserted.
    Fragment,
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    live: bool,
}

/// Arena-backed markup tree. Slots of released nodes are reused by later
/// allocations, so the arena stays proportional to the content it holds.
#[derive(Clone, Debug, Default)]
pub struct Markup {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
}

impl Markup {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
            live: true,
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Number of nodes currently allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Detaches `id` and frees it together with its descendants. The freed ids
    /// must not be used again; their slots go to the next created nodes.
    pub fn release(&mut self, id: NodeId) {
        if !self.nodes[id.0].live {
            return;
        }
        self.detach(id);
        let mut pending = vec![id];
        while let Some(node) = pending.pop() {
            let slot = &mut self.nodes[node.0];
            if !slot.live {
                continue;
            }
            pending.append(&mut slot.children);
            slot.kind = NodeKind::Fragment;
            slot.parent = None;
            slot.live = false;
            self.free.push(node);
        }
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push(NodeKind::Fragment)
    }

    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.push(NodeKind::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    /// Character count for text nodes, child count otherwise.
    pub fn node_length(&self, id: NodeId) -> usize {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => text.chars().count(),
            _ => self.nodes[id.0].children.len(),
        }
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.is_element(*child))
    }

    /// Concatenated text of all descendant text nodes in tree order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            _ => {
                for child in &self.nodes[id.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let mut current = Some(a);
        while let Some(candidate) = current {
            if self.is_inclusive_ancestor(candidate, b) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Removes `id` from its parent. Returns the former position.
    pub fn detach(&mut self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let idx = self.index_in_parent(id)?;
        self.nodes[parent.0].children.remove(idx);
        self.nodes[id.0].parent = None;
        Some((parent, idx))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let idx = self.children(parent).len();
        self.insert_child(parent, idx, child);
    }

    /// Inserts `child` at `index` under `parent`. Fragments are unpacked: their
    /// children move to the target and the fragment is left empty.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if matches!(self.nodes[child.0].kind, NodeKind::Fragment) {
            let moved = std::mem::take(&mut self.nodes[child.0].children);
            let mut idx = index.min(self.children(parent).len());
            for node in moved {
                self.nodes[node.0].parent = None;
                self.attach(parent, idx, node);
                idx += 1;
            }
            return;
        }

        let mut index = index;
        if let Some((old_parent, old_idx)) = self.detach(child)
            && old_parent == parent
            && old_idx < index
        {
            index -= 1;
        }
        let index = index.min(self.children(parent).len());
        self.attach(parent, index, child);
    }

    fn attach(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[parent.0].children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Removes and frees all children of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
            self.release(child);
        }
    }

    /// Copies the node itself (kind, attributes, text) without children.
    pub fn shallow_clone(&mut self, id: NodeId) -> NodeId {
        let kind = self.nodes[id.0].kind.clone();
        self.push(kind)
    }

    /// Splits a text node at a character offset. The tail becomes a new text
    /// node placed right after the original. Returns `None` for non-text nodes.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Option<NodeId> {
        let text = self.text_mut(id)?;
        let byte = byte_index(text, offset);
        let tail = text.split_off(byte);
        let new_node = self.create_text(tail);
        if let Some(parent) = self.parent(id)
            && let Some(idx) = self.index_in_parent(id)
        {
            self.attach(parent, idx + 1, new_node);
        }
        Some(new_node)
    }

    /// Merges adjacent text nodes and drops empty ones below `id`. Merged and
    /// dropped text nodes are freed.
    pub fn normalize(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        let mut dropped = Vec::new();
        for child in children {
            if let NodeKind::Text(text) = &self.nodes[child.0].kind {
                if text.is_empty() {
                    dropped.push(child);
                    continue;
                }
                if let Some(prev) = kept.last().copied()
                    && self.is_text(prev)
                {
                    let text = text.clone();
                    if let Some(prev_text) = self.text_mut(prev) {
                        prev_text.push_str(&text);
                    }
                    dropped.push(child);
                    continue;
                }
            } else {
                self.normalize(child);
            }
            kept.push(child);
        }
        self.nodes[id.0].children = kept;
        for child in dropped {
            self.nodes[child.0].parent = None;
            self.release(child);
        }
    }

    /// Frees empty text nodes below `id` without merging anything, so
    /// boundaries on other nodes stay meaningful.
    pub fn drop_empty_text(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            match self.text(child) {
                Some("") => self.release(child),
                Some(_) => {}
                None => self.drop_empty_text(child),
            }
        }
    }

    /// Removes and frees descendant elements that no longer carry any text.
    pub fn prune_empty_elements(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        for child in children {
            if self.is_element(child) {
                self.prune_empty_elements(child);
                if self.text_content(child).is_empty() {
                    self.release(child);
                }
            }
        }
    }
}

/// Byte index of the `offset`-th character, clamped to the string length.
pub fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}
