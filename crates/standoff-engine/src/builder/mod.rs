/*!
 * # Tree Builder
 *
 * Rebuilds element trees from the standoff side.
 *
 * - [`TreeBuilder`] replays a slice of position-table rows onto the nodes the
 *   rows refer to. Every node met is emptied and refilled, so element ids
 *   stay valid across rebuilds and the arena does not grow.
 * - [`overlap`] builds a tree from a bare list of annotations over a plain
 *   text, resolving nesting by span width and depth.
 */

pub mod overlap;

use std::collections::HashSet;

use crate::error::{Result, StandoffError};
use crate::table::{Row, RowKind};
use crate::tree::{ElementId, Tree};

/// Where the next run of text goes.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Text(ElementId),
    Tail(ElementId),
}

pub struct TreeBuilder<'t> {
    tree: &'t mut Tree,
    /// When unset, rows are only checked and the tree is left alone.
    apply: bool,
    stack: Vec<ElementId>,
    slot: Option<Slot>,
    root: Option<ElementId>,
    seen: HashSet<ElementId>,
}

impl<'t> TreeBuilder<'t> {
    /// A builder that rewrites nodes as rows are pushed. A row rejected
    /// half way leaves the nodes pushed so far rewritten; use
    /// [`build`](Self::build) to check all rows first.
    pub fn new(tree: &'t mut Tree) -> Self {
        Self {
            tree,
            apply: true,
            stack: Vec::new(),
            slot: None,
            root: None,
            seen: HashSet::new(),
        }
    }

    fn dry_run(tree: &'t mut Tree) -> Self {
        Self {
            apply: false,
            ..Self::new(tree)
        }
    }

    /// Rewrite the element described by `rows` and everything inside it.
    ///
    /// `rows` must describe exactly one element and its content. They are
    /// checked before any node is touched, so on error the tree is
    /// unchanged. The top element keeps its place and tail.
    pub fn build(tree: &mut Tree, rows: &[Row]) -> Result<ElementId> {
        let mut check = TreeBuilder::dry_run(tree);
        for row in rows {
            check.push(row)?;
        }
        check.finish()?;

        let mut builder = TreeBuilder::new(tree);
        for row in rows {
            builder.push(row)?;
        }
        builder.finish()
    }

    pub fn push(&mut self, row: &Row) -> Result<()> {
        match &row.kind {
            RowKind::Open { el, .. } => {
                self.enter(*el)?;
                self.stack.push(*el);
                self.slot = Some(Slot::Text(*el));
            }
            RowKind::Close { el, .. } => {
                let top = self.stack.pop().ok_or_else(|| {
                    StandoffError::MalformedTable(format!("{el} closes with nothing open"))
                })?;
                if top != *el {
                    return Err(StandoffError::MalformedTable(format!(
                        "{el} closes while {top} is open"
                    )));
                }
                self.slot = Some(Slot::Tail(top));
            }
            RowKind::Empty { el, .. } => {
                self.enter(*el)?;
                self.slot = Some(Slot::Tail(*el));
            }
            RowKind::Text(text) => match self.slot {
                Some(_) if !self.apply => {}
                Some(Slot::Text(id)) => self.tree.push_text(id, text),
                Some(Slot::Tail(id)) => self.tree.push_tail(id, text),
                None => {
                    return Err(StandoffError::MalformedTable(
                        "text before the first element".to_string(),
                    ));
                }
            },
        }
        Ok(())
    }

    pub fn finish(self) -> Result<ElementId> {
        if let Some(open) = self.stack.last() {
            return Err(StandoffError::MalformedTable(format!(
                "{open} is never closed"
            )));
        }
        self.root
            .ok_or_else(|| StandoffError::MalformedTable("no elements to build".to_string()))
    }

    /// Place `el` under the innermost open element, or make it the top.
    fn enter(&mut self, el: ElementId) -> Result<()> {
        if !self.seen.insert(el) {
            return Err(StandoffError::MalformedTable(format!(
                "{el} appears more than once"
            )));
        }
        match (self.stack.last().copied(), self.root) {
            (Some(parent), _) => {
                if self.tree.get(parent).is_comment() {
                    return Err(StandoffError::MalformedTable(format!(
                        "comment {parent} cannot contain {el}"
                    )));
                }
                if self.apply {
                    self.tree.clear_content(el);
                    self.tree.get_mut(el).tail = None;
                    self.tree.append_child(parent, el);
                }
            }
            (None, None) => {
                self.root = Some(el);
                if self.apply {
                    self.tree.clear_content(el);
                }
            }
            (None, Some(_)) => {
                return Err(StandoffError::MalformedTable(
                    "more than one top-level element".to_string(),
                ));
            }
        }
        Ok(())
    }
}
