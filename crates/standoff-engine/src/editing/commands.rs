use crate::tree::{Attributes, ElementId};

/// An inline annotation to add over `begin..end`.
///
/// `begin == end` adds an empty element at that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inline {
    pub begin: usize,
    pub end: usize,
    pub tag: String,
    pub attrib: Attributes,
    /// Nesting depth for the new element; the deepest possible when unset.
    pub depth: Option<usize>,
    /// Skip the edit when an element with the same range, tag and
    /// attributes already exists.
    pub unique: bool,
    /// Leave the tree stale; it is rebuilt on the next commit.
    pub lazy: bool,
    /// Which of the valid row slots an empty element goes to.
    pub slot: Option<usize>,
}

impl Inline {
    pub fn new(begin: usize, end: usize, tag: impl Into<String>) -> Self {
        Self {
            begin,
            end,
            tag: tag.into(),
            attrib: Attributes::new(),
            depth: None,
            unique: true,
            lazy: false,
            slot: None,
        }
    }

    pub fn point(pos: usize, tag: impl Into<String>) -> Self {
        Self::new(pos, pos, tag)
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrib.set(key, value);
        self
    }

    pub fn with_attrib(mut self, attrib: Attributes) -> Self {
        self.attrib = attrib;
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn allow_duplicates(mut self) -> Self {
        self.unique = false;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn is_point(&self) -> bool {
        self.begin == self.end
    }
}

/// Edit commands accepted by [`Standoff::apply`](super::Standoff::apply).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    AddInline(Inline),
    RemoveInline { el: ElementId, lazy: bool },
    /// A start marker at `inline.begin` and an anchor at `inline.end`, tied
    /// together by `id` (generated when missing).
    AddSpan { id: Option<String>, inline: Inline },
}
