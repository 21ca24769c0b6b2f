//! Selection ranges over a [`Markup`] tree.
//!
//! Boundaries follow DOM range conventions: on text nodes the offset counts
//! characters, on elements and fragments it counts children.

use std::cmp::Ordering;

use crate::markup::{Markup, NodeId, byte_index};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// Which text node a character offset resolves to when it sits exactly
/// between two of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Affinity {
    /// End of the preceding text node.
    Backward,
    /// Start of the following text node.
    Forward,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionRange {
    start: Boundary,
    end: Boundary,
}

impl SelectionRange {
    /// Builds a range from two boundaries in either order.
    pub fn new(markup: &Markup, a: Boundary, b: Boundary) -> Self {
        match compare_boundaries(markup, &a, &b) {
            Some(Ordering::Greater) => Self { start: b, end: a },
            _ => Self { start: a, end: b },
        }
    }

    pub fn collapsed(at: Boundary) -> Self {
        Self { start: at, end: at }
    }

    /// Maps character offsets within `root` to a range that hugs the selected
    /// text as tightly as possible.
    pub fn from_text_offsets(markup: &Markup, root: NodeId, start: usize, end: usize) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        if start == end {
            return Self::collapsed(boundary_at_offset(markup, root, start, Affinity::Backward));
        }
        Self {
            start: boundary_at_offset(markup, root, start, Affinity::Forward),
            end: boundary_at_offset(markup, root, end, Affinity::Backward),
        }
    }

    pub fn start(&self) -> Boundary {
        self.start
    }

    pub fn end(&self) -> Boundary {
        self.end
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn collapse_to(&mut self, at: Boundary) {
        self.start = at;
        self.end = at;
    }

    /// Makes the range span exactly `node`.
    pub fn select_node(&mut self, markup: &Markup, node: NodeId) -> bool {
        let (Some(parent), Some(idx)) = (markup.parent(node), markup.index_in_parent(node)) else {
            return false;
        };
        self.start = Boundary::new(parent, idx);
        self.end = Boundary::new(parent, idx + 1);
        true
    }

    pub fn common_ancestor(&self, markup: &Markup) -> Option<NodeId> {
        markup.common_ancestor(self.start.node, self.end.node)
    }

    /// The text covered by the range.
    pub fn text(&self, markup: &Markup) -> String {
        let Some(ancestor) = self.common_ancestor(markup) else {
            return String::new();
        };
        let (Some(from), Some(to)) = (
            chars_before(markup, ancestor, self.start),
            chars_before(markup, ancestor, self.end),
        ) else {
            return String::new();
        };
        markup
            .text_content(ancestor)
            .chars()
            .skip(from)
            .take(to.saturating_sub(from))
            .collect()
    }

    /// Character offsets of the range relative to `root`.
    pub fn text_offsets(&self, markup: &Markup, root: NodeId) -> Option<(usize, usize)> {
        Some((
            chars_before(markup, root, self.start)?,
            chars_before(markup, root, self.end)?,
        ))
    }

    /// Moves the covered content into a new fragment and collapses the range
    /// where the content used to be. Partially covered elements are split: the
    /// fragment receives shallow copies holding the covered part.
    pub fn extract_contents(&mut self, markup: &mut Markup) -> NodeId {
        let (start, end) = (self.start, self.end);
        let collapse_at = if markup.is_inclusive_ancestor(start.node, end.node) {
            start
        } else {
            let mut reference = start.node;
            while let Some(parent) = markup.parent(reference) {
                if markup.is_inclusive_ancestor(parent, end.node) {
                    break;
                }
                reference = parent;
            }
            match (markup.parent(reference), markup.index_in_parent(reference)) {
                (Some(parent), Some(idx)) => Boundary::new(parent, idx + 1),
                _ => start,
            }
        };

        let fragment = extract_between(markup, start, end);
        self.collapse_to(collapse_at);
        fragment
    }

    /// Inserts `node` at the start of the range, splitting a text node when the
    /// start lies inside one. The range then spans the inserted content.
    pub fn insert_node(&mut self, markup: &mut Markup, node: NodeId) -> bool {
        let start = self.start;
        let (parent, index) = match markup.text(start.node).map(|text| text.chars().count()) {
            Some(len) => {
                let (Some(parent), Some(idx)) =
                    (markup.parent(start.node), markup.index_in_parent(start.node))
                else {
                    return false;
                };
                if start.offset == 0 {
                    (parent, idx)
                } else {
                    if start.offset < len {
                        markup.split_text(start.node, start.offset);
                    }
                    (parent, idx + 1)
                }
            }
            None => (start.node, start.offset.min(markup.children(start.node).len())),
        };

        let count = if markup.is_text(node) || markup.is_element(node) {
            1
        } else {
            markup.children(node).len()
        };
        markup.insert_child(parent, index, node);
        self.start = Boundary::new(parent, index);
        self.end = Boundary::new(parent, index + count);
        true
    }
}

fn extract_between(markup: &mut Markup, start: Boundary, end: Boundary) -> NodeId {
    let fragment = markup.create_fragment();
    if start == end {
        return fragment;
    }

    if start.node == end.node && markup.is_text(start.node) {
        let piece = cut_text(markup, start.node, start.offset, end.offset);
        markup.append_child(fragment, piece);
        return fragment;
    }

    let Some(ancestor) = markup.common_ancestor(start.node, end.node) else {
        return fragment;
    };

    let first_partial = if markup.is_inclusive_ancestor(start.node, end.node) {
        None
    } else {
        child_toward(markup, ancestor, start.node)
    };
    let last_partial = if markup.is_inclusive_ancestor(end.node, start.node) {
        None
    } else {
        child_toward(markup, ancestor, end.node)
    };

    let children = markup.children(ancestor).to_vec();
    let lower = match first_partial.and_then(|child| markup.index_in_parent(child)) {
        Some(idx) => idx + 1,
        None => start.offset,
    };
    let upper = match last_partial.and_then(|child| markup.index_in_parent(child)) {
        Some(idx) => idx,
        None => end.offset,
    };
    let contained = if lower < upper && upper <= children.len() {
        children[lower..upper].to_vec()
    } else {
        Vec::new()
    };

    if let Some(first) = first_partial {
        if markup.is_text(first) {
            let len = markup.node_length(first);
            let piece = cut_text(markup, first, start.offset, len);
            markup.append_child(fragment, piece);
        } else {
            let copy = markup.shallow_clone(first);
            markup.append_child(fragment, copy);
            let len = markup.node_length(first);
            let inner = extract_between(markup, start, Boundary::new(first, len));
            markup.append_child(copy, inner);
            markup.release(inner);
        }
    }

    for node in contained {
        markup.append_child(fragment, node);
    }

    if let Some(last) = last_partial {
        if markup.is_text(last) {
            let piece = cut_text(markup, last, 0, end.offset);
            markup.append_child(fragment, piece);
        } else {
            let copy = markup.shallow_clone(last);
            markup.append_child(fragment, copy);
            let inner = extract_between(markup, Boundary::new(last, 0), end);
            markup.append_child(copy, inner);
            markup.release(inner);
        }
    }

    fragment
}

/// The child of `ancestor` that contains `node`.
fn child_toward(markup: &Markup, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
    let mut current = node;
    loop {
        let parent = markup.parent(current)?;
        if parent == ancestor {
            return Some(current);
        }
        current = parent;
    }
}

/// Removes characters `[from, to)` from a text node and returns them as a new
/// detached text node.
fn cut_text(markup: &mut Markup, node: NodeId, from: usize, to: usize) -> NodeId {
    let removed = match markup.text_mut(node) {
        Some(text) => {
            let start = byte_index(text, from);
            let end = byte_index(text, to.max(from));
            text.drain(start..end).collect::<String>()
        }
        None => String::new(),
    };
    markup.create_text(removed)
}

/// Orders two boundaries in tree order. `None` when they live in different trees.
pub fn compare_boundaries(markup: &Markup, a: &Boundary, b: &Boundary) -> Option<Ordering> {
    let (root_a, mut key_a) = tree_path(markup, a.node);
    let (root_b, mut key_b) = tree_path(markup, b.node);
    if root_a != root_b {
        return None;
    }
    key_a.push(a.offset);
    key_b.push(b.offset);
    Some(key_a.cmp(&key_b))
}

fn tree_path(markup: &Markup, node: NodeId) -> (NodeId, Vec<usize>) {
    let mut path = Vec::new();
    let mut current = node;
    while let Some(idx) = markup.index_in_parent(current) {
        path.push(idx);
        match markup.parent(current) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    path.reverse();
    (current, path)
}

/// Text nodes below `root` in tree order, skipping empty ones.
pub fn text_nodes(markup: &Markup, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    collect_text_nodes(markup, root, &mut out);
    out
}

fn collect_text_nodes(markup: &Markup, id: NodeId, out: &mut Vec<NodeId>) {
    match markup.text(id) {
        Some(text) if !text.is_empty() => out.push(id),
        Some(_) => {}
        None => {
            for child in markup.children(id) {
                collect_text_nodes(markup, *child, out);
            }
        }
    }
}

/// Resolves a character offset within `root` to a boundary inside a text node.
pub fn boundary_at_offset(
    markup: &Markup,
    root: NodeId,
    offset: usize,
    affinity: Affinity,
) -> Boundary {
    let nodes = text_nodes(markup, root);
    let mut pos = 0usize;
    for node in &nodes {
        let len = markup.node_length(*node);
        let inside = match affinity {
            Affinity::Forward => offset < pos + len,
            Affinity::Backward => offset <= pos + len,
        };
        if inside {
            return Boundary::new(*node, offset.saturating_sub(pos));
        }
        pos += len;
    }
    match nodes.last() {
        Some(last) => Boundary::new(*last, markup.node_length(*last)),
        None => Boundary::new(root, markup.children(root).len()),
    }
}

/// Number of characters of `root`'s text that precede `boundary`.
pub fn chars_before(markup: &Markup, root: NodeId, boundary: Boundary) -> Option<usize> {
    let mut total = 0usize;
    if !accumulate_until(markup, root, boundary.node, &mut total) {
        return None;
    }
    let within = match markup.text(boundary.node) {
        Some(text) => boundary.offset.min(text.chars().count()),
        None => markup
            .children(boundary.node)
            .iter()
            .take(boundary.offset)
            .map(|child| markup.text_content(*child).chars().count())
            .sum(),
    };
    Some(total + within)
}

fn accumulate_until(markup: &Markup, id: NodeId, target: NodeId, total: &mut usize) -> bool {
    if id == target {
        return true;
    }
    if let Some(text) = markup.text(id) {
        *total += text.chars().count();
        return false;
    }
    for child in markup.children(id) {
        if accumulate_until(markup, *child, target, total) {
            return true;
        }
    }
    false
}
