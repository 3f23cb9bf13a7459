/*!
 * # Position Table
 *
 * The standoff side of a document: an ordered list of rows, one per element
 * boundary plus one per run of text. Structural rows (open, close, empty)
 * carry the character position at which they occur, the element they belong
 * to and its depth. Text rows carry a run of characters starting at their
 * position.
 *
 * Positions count characters, not bytes, and never decrease from one row to
 * the next. Several structural rows can share a position; the order among
 * them is what encodes nesting for zero-width boundaries, so every insertion
 * picks its slot within the group of rows at a position explicitly.
 */

pub mod collapse;
pub mod invariants;
pub mod traversal;

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::ops::{Deref, Range};
use std::str::FromStr;

use crate::annotation::PositionedAnnotation;
use crate::error::{Result, StandoffError};
use crate::tree::{ElementId, Tree};
use traversal::{Event, EventKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Open { el: ElementId, depth: usize },
    Close { el: ElementId, depth: usize },
    Empty { el: ElementId, depth: usize },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub position: usize,
    pub kind: RowKind,
}

impl Row {
    pub fn el(&self) -> Option<ElementId> {
        match &self.kind {
            RowKind::Open { el, .. } | RowKind::Close { el, .. } | RowKind::Empty { el, .. } => {
                Some(*el)
            }
            RowKind::Text(_) => None,
        }
    }

    pub fn depth(&self) -> Option<usize> {
        match &self.kind {
            RowKind::Open { depth, .. }
            | RowKind::Close { depth, .. }
            | RowKind::Empty { depth, .. } => Some(*depth),
            RowKind::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            RowKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, RowKind::Text(_))
    }

    fn char_len(&self) -> usize {
        self.text().map_or(0, |t| t.chars().count())
    }

    fn el_mut(&mut self) -> Option<&mut ElementId> {
        match &mut self.kind {
            RowKind::Open { el, .. } | RowKind::Close { el, .. } | RowKind::Empty { el, .. } => {
                Some(el)
            }
            RowKind::Text(_) => None,
        }
    }

    fn depth_mut(&mut self) -> Option<&mut usize> {
        match &mut self.kind {
            RowKind::Open { depth, .. }
            | RowKind::Close { depth, .. }
            | RowKind::Empty { depth, .. } => Some(depth),
            RowKind::Text(_) => None,
        }
    }
}

/// The elements enclosing a position, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context(Vec<ElementId>);

impl Context {
    pub fn innermost(&self) -> Option<ElementId> {
        self.0.last().copied()
    }

    /// Local names joined with `>`, e.g. `TEI>text>body>p`.
    pub fn to_path(&self, tree: &Tree) -> String {
        self.0
            .iter()
            .map(|&id| tree.get(id).local_name())
            .collect::<Vec<_>>()
            .join(">")
    }

    pub fn into_vec(self) -> Vec<ElementId> {
        self.0
    }
}

impl Deref for Context {
    type Target = [ElementId];

    fn deref(&self) -> &[ElementId] {
        &self.0
    }
}

impl From<Vec<ElementId>> for Context {
    fn from(chain: Vec<ElementId>) -> Self {
        Self(chain)
    }
}

/// A change to every row of one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowUpdate {
    El(ElementId),
    Position(usize),
    Depth(usize),
}

/// Numeric row fields addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Position,
    Depth,
}

impl FromStr for RowField {
    type Err = StandoffError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "position" => Ok(RowField::Position),
            "depth" => Ok(RowField::Depth),
            other => Err(StandoffError::InvalidField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionTable {
    rows: Vec<Row>,
    len: usize,
}

impl PositionTable {
    pub fn from_tree(tree: &Tree, root: ElementId) -> Self {
        Self::from_events(traversal::flatten(tree, root))
    }

    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut rows = Vec::new();
        let mut position = 0;
        for event in events {
            let (el, depth) = (event.el, event.depth);
            let kind = match event.kind {
                EventKind::Open => RowKind::Open { el, depth },
                EventKind::Close => RowKind::Close { el, depth },
                EventKind::Empty => RowKind::Empty { el, depth },
            };
            rows.push(Row { position, kind });
            if let Some(text) = event.text.filter(|t| !t.is_empty()) {
                let width = text.chars().count();
                rows.push(Row {
                    position,
                    kind: RowKind::Text(text),
                });
                position += width;
            }
        }
        Self {
            rows,
            len: position,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of characters of text.
    pub fn text_len(&self) -> usize {
        self.len
    }

    pub fn get_text(&self) -> String {
        self.rows.iter().filter_map(Row::text).collect()
    }

    /// Characters in `begin..end`.
    pub fn text_slice(&self, begin: usize, end: usize) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let Some(text) = row.text() else { continue };
            let row_end = row.position + row.char_len();
            if row_end <= begin || row.position >= end {
                continue;
            }
            let skip = begin.saturating_sub(row.position);
            let take = end.min(row_end) - row.position.max(begin);
            out.extend(text.chars().skip(skip).take(take));
        }
        out
    }

    /// The element whose open (or empty) row comes first.
    pub fn root(&self) -> Option<ElementId> {
        self.rows.first().and_then(Row::el)
    }

    /// Elements in document order of their open (or empty) row.
    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.rows.iter().filter_map(|row| match &row.kind {
            RowKind::Open { el, .. } | RowKind::Empty { el, .. } => Some(*el),
            _ => None,
        })
    }

    fn check_pos(&self, pos: usize) -> Result<()> {
        if pos > self.len {
            return Err(StandoffError::PositionNotFound { pos, len: self.len });
        }
        Ok(())
    }

    /// Index of the text row holding the character at `pos`.
    pub fn text_row_at(&self, pos: usize) -> Option<usize> {
        let upto = self.rows.partition_point(|r| r.position <= pos);
        self.rows[..upto]
            .iter()
            .rposition(Row::is_text)
            .filter(|&i| pos < self.rows[i].position + self.rows[i].char_len())
    }

    /// Indices of the rows sitting at `pos`.
    pub fn group(&self, pos: usize) -> Range<usize> {
        let start = self.rows.partition_point(|r| r.position < pos);
        let end = self.rows.partition_point(|r| r.position <= pos);
        start..end
    }

    /// Split the text row covering `pos` so that a row boundary falls at `pos`.
    pub fn split_at(&mut self, pos: usize) -> Result<()> {
        self.check_pos(pos)?;
        let Some(idx) = self.text_row_at(pos) else {
            return Ok(());
        };
        let offset = pos - self.rows[idx].position;
        if offset == 0 {
            return Ok(());
        }
        let RowKind::Text(text) = &mut self.rows[idx].kind else {
            return Ok(());
        };
        let byte = text
            .char_indices()
            .nth(offset)
            .map_or(text.len(), |(b, _)| b);
        let rest = text.split_off(byte);
        log::trace!("split text row {idx} at position {pos}");
        self.rows.insert(
            idx + 1,
            Row {
                position: pos,
                kind: RowKind::Text(rest),
            },
        );
        Ok(())
    }

    /// Elements open just before row `idx`, outermost first.
    pub fn context_at_index(&self, idx: usize) -> Context {
        let mut closed = HashSet::new();
        let mut chain = Vec::new();
        for row in self.rows[..idx.min(self.rows.len())].iter().rev() {
            match &row.kind {
                RowKind::Close { el, .. } => {
                    closed.insert(*el);
                }
                RowKind::Open { el, depth } => {
                    if !closed.remove(el) {
                        chain.push(*el);
                        if *depth == 0 {
                            break;
                        }
                    }
                }
                _ => {}
            }
        }
        chain.reverse();
        Context(chain)
    }

    /// Elements enclosing the character at `pos`. At the end of the text this
    /// is the context of the last character.
    pub fn get_context_at_pos(&self, pos: usize) -> Result<Context> {
        self.check_pos(pos)?;
        let idx = self
            .text_row_at(pos)
            .or_else(|| self.rows.iter().rposition(Row::is_text))
            .unwrap_or(1);
        Ok(self.context_at_index(idx))
    }

    /// Open and close row indices of `el`. Both are the same row for an
    /// empty element.
    pub fn rows_of(&self, el: ElementId) -> Option<(usize, usize)> {
        let open = self.rows.iter().position(|r| match &r.kind {
            RowKind::Open { el: e, .. } | RowKind::Empty { el: e, .. } => *e == el,
            _ => false,
        })?;
        if matches!(self.rows[open].kind, RowKind::Empty { .. }) {
            return Some((open, open));
        }
        Some((open, self.close_index(open, el)?))
    }

    fn close_index(&self, open: usize, el: ElementId) -> Option<usize> {
        self.rows[open + 1..]
            .iter()
            .position(|r| matches!(r.kind, RowKind::Close { el: e, .. } if e == el))
            .map(|i| open + 1 + i)
    }

    /// Character range covered by `el`.
    pub fn span_of(&self, el: ElementId) -> Option<(usize, usize)> {
        let (open, close) = self.rows_of(el)?;
        Some((self.rows[open].position, self.rows[close].position))
    }

    pub fn depth_of(&self, el: ElementId) -> Option<usize> {
        let (open, _) = self.rows_of(el)?;
        self.rows[open].depth()
    }

    /// Direct children of `parent` with their character ranges.
    pub fn child_spans(&self, parent: ElementId) -> Result<Vec<(ElementId, usize, usize)>> {
        let (open, close) = self.rows_of(parent).ok_or(StandoffError::NotFound(parent))?;
        let mut children = Vec::new();
        let mut i = open + 1;
        while i < close {
            let row = &self.rows[i];
            match &row.kind {
                RowKind::Text(_) => i += 1,
                RowKind::Empty { el, .. } => {
                    children.push((*el, row.position, row.position));
                    i += 1;
                }
                RowKind::Open { el, .. } => {
                    let end = self.close_index(i, *el).ok_or_else(|| {
                        StandoffError::MalformedTable(format!("element {el} is never closed"))
                    })?;
                    children.push((*el, row.position, self.rows[end].position));
                    i = end + 1;
                }
                RowKind::Close { el, .. } => {
                    return Err(StandoffError::MalformedTable(format!(
                        "element {el} closes inside {parent} without opening there"
                    )));
                }
            }
        }
        Ok(children)
    }

    /// Insert the open row of `el` at `pos`, splitting text if needed.
    ///
    /// Among the rows already at `pos` the open goes after everything that
    /// encloses it and before the first row it encloses, that is before the
    /// text at `pos` or before any deeper open or empty row.
    pub fn insert_open(&mut self, pos: usize, el: ElementId, depth: usize) -> Result<usize> {
        self.split_at(pos)?;
        let group = self.group(pos);
        let target = self.get_context_at_pos(pos)?;
        let parents = &target[..depth.min(target.len())];

        let mut stack = self.context_at_index(group.start).into_vec();
        let mut at = group.end;
        for i in group {
            let row = &self.rows[i];
            let encloses = match &row.kind {
                RowKind::Text(_) => true,
                RowKind::Open { depth: d, .. } | RowKind::Empty { depth: d, .. } => *d > depth,
                RowKind::Close { .. } => false,
            };
            if encloses && stack.as_slice() == parents {
                at = i;
                break;
            }
            match &row.kind {
                RowKind::Open { el, .. } => stack.push(*el),
                RowKind::Close { .. } => {
                    stack.pop();
                }
                _ => {}
            }
        }

        log::trace!("open row for {el} at position {pos}, index {at}");
        self.rows.insert(
            at,
            Row {
                position: pos,
                kind: RowKind::Open { el, depth },
            },
        );
        Ok(at)
    }

    /// Insert the close row of `el` at `pos`.
    ///
    /// The close goes after deeper closes and before the first row that is
    /// text, a shallower close, or an open or empty row at the same depth or
    /// above.
    pub fn insert_close(&mut self, pos: usize, el: ElementId, depth: usize) -> Result<usize> {
        self.split_at(pos)?;
        let open = self
            .rows
            .iter()
            .position(|r| matches!(r.kind, RowKind::Open { el: e, .. } if e == el))
            .ok_or(StandoffError::NotFound(el))?;
        if pos < self.rows[open].position {
            return Err(StandoffError::MalformedTable(format!(
                "close of {el} at {pos} precedes its open"
            )));
        }

        let group = self.group(pos);
        let start = group.start.max(open + 1);
        let at = (start..group.end)
            .find(|&i| match &self.rows[i].kind {
                RowKind::Text(_) => true,
                RowKind::Close { depth: d, .. } => *d < depth,
                RowKind::Open { depth: d, .. } | RowKind::Empty { depth: d, .. } => *d <= depth,
            })
            .unwrap_or(group.end.max(start));

        log::trace!("close row for {el} at position {pos}, index {at}");
        self.rows.insert(
            at,
            Row {
                position: pos,
                kind: RowKind::Close { el, depth },
            },
        );
        Ok(at)
    }

    /// Row indices at `pos` where an empty element at `depth` fits, i.e.
    /// where exactly `depth` elements are open. Call after splitting at `pos`.
    pub fn empty_slots(&self, pos: usize, depth: usize) -> Vec<usize> {
        let group = self.group(pos);
        let last = self
            .text_row_at(pos)
            .filter(|i| group.contains(i))
            .unwrap_or(group.end);

        let mut open = self.context_at_index(group.start).len();
        let mut slots = Vec::new();
        for i in group.start..=last {
            if open == depth {
                slots.push(i);
            }
            if i < last {
                match &self.rows[i].kind {
                    RowKind::Open { .. } => open += 1,
                    RowKind::Close { .. } => open = open.saturating_sub(1),
                    _ => {}
                }
            }
        }
        slots
    }

    /// Insert an empty row for `el` at `pos`. `slot` picks among the valid
    /// slots in document order; the default is the last one.
    pub fn insert_empty(
        &mut self,
        pos: usize,
        el: ElementId,
        depth: usize,
        slot: Option<usize>,
    ) -> Result<usize> {
        self.split_at(pos)?;
        let slots = self.empty_slots(pos, depth);
        let index = match slot {
            _ if slots.is_empty() => {
                return Err(StandoffError::AmbiguousContext {
                    begin: pos,
                    end: pos,
                });
            }
            None => slots.len() - 1,
            Some(slot) if slot < slots.len() => slot,
            Some(slot) => {
                return Err(StandoffError::InvalidSlot {
                    slot,
                    available: slots.len(),
                });
            }
        };

        let at = slots[index];
        log::trace!("empty row for {el} at position {pos}, index {at}");
        self.rows.insert(
            at,
            Row {
                position: pos,
                kind: RowKind::Empty { el, depth },
            },
        );
        Ok(at)
    }

    /// Remove every row of `el`, joining text runs that become adjacent.
    pub fn remove_el(&mut self, el: ElementId) -> Result<()> {
        let (open, close) = self.rows_of(el).ok_or(StandoffError::NotFound(el))?;
        if close != open {
            self.rows.remove(close);
            self.merge_text_at(close);
        }
        self.rows.remove(open);
        self.merge_text_at(open);
        log::trace!("removed rows of {el}");
        Ok(())
    }

    fn merge_text_at(&mut self, idx: usize) {
        if idx == 0 || idx >= self.rows.len() {
            return;
        }
        if !(self.rows[idx - 1].is_text() && self.rows[idx].is_text()) {
            return;
        }
        let next = self.rows.remove(idx);
        if let (RowKind::Text(prev), RowKind::Text(rest)) = (&mut self.rows[idx - 1].kind, next.kind)
        {
            prev.push_str(&rest);
        }
    }

    /// Add `delta` to the depth of every structural row in `rows`.
    pub(crate) fn shift_depth(&mut self, rows: Range<usize>, delta: isize) {
        for row in &mut self.rows[rows] {
            if let Some(depth) = row.depth_mut() {
                *depth = depth.saturating_add_signed(delta);
            }
        }
    }

    /// Add `delta` to the depth of `el` and everything inside it.
    pub fn shift_subtree(&mut self, el: ElementId, delta: isize) -> Result<()> {
        let (open, close) = self.rows_of(el).ok_or(StandoffError::NotFound(el))?;
        self.shift_depth(open..close + 1, delta);
        Ok(())
    }

    /// Apply `update` to every row of `el`.
    pub fn set_el(&mut self, el: ElementId, update: RowUpdate) -> Result<()> {
        let (open, close) = self.rows_of(el).ok_or(StandoffError::NotFound(el))?;
        let indices = if open == close {
            vec![open]
        } else {
            vec![open, close]
        };
        for idx in indices {
            let row = &mut self.rows[idx];
            match update {
                RowUpdate::Position(pos) => row.position = pos,
                RowUpdate::Depth(depth) => {
                    if let Some(d) = row.depth_mut() {
                        *d = depth;
                    }
                }
                RowUpdate::El(new) => {
                    if let Some(e) = row.el_mut() {
                        *e = new;
                    }
                }
            }
        }
        Ok(())
    }

    /// Set a numeric field of `el`'s rows by name.
    pub fn set_el_field(&mut self, el: ElementId, field: &str, value: usize) -> Result<()> {
        let update = match field.parse::<RowField>()? {
            RowField::Position => RowUpdate::Position(value),
            RowField::Depth => RowUpdate::Depth(value),
        };
        self.set_el(el, update)
    }

    /// Every element as a positioned annotation, in document order.
    pub fn annotations(&self, tree: &Tree) -> Vec<PositionedAnnotation> {
        let mut out: Vec<PositionedAnnotation> = Vec::new();
        let mut pending: HashMap<ElementId, usize> = HashMap::new();
        for row in &self.rows {
            match &row.kind {
                RowKind::Open { el, depth } | RowKind::Empty { el, depth } => {
                    let node = tree.get(*el);
                    let ann = if node.is_comment() {
                        PositionedAnnotation::comment(row.position, row.position, *depth)
                    } else {
                        PositionedAnnotation::new(row.position, row.position, &node.tag, *depth)
                            .with_attrib(node.attrib.clone())
                    };
                    if matches!(row.kind, RowKind::Open { .. }) {
                        pending.insert(*el, out.len());
                    }
                    out.push(ann);
                }
                RowKind::Close { el, .. } => {
                    if let Some(idx) = pending.remove(el) {
                        out[idx].end = row.position;
                    }
                }
                RowKind::Text(_) => {}
            }
        }
        out
    }

    /// One line per row, for debugging and tests.
    pub fn dump(&self, tree: &Tree) -> String {
        let mut out = String::new();
        for row in &self.rows {
            let _ = match &row.kind {
                RowKind::Open { el, depth } => {
                    writeln!(out, "{} open {} {depth}", row.position, tree.get(*el).tag)
                }
                RowKind::Close { el, depth } => {
                    writeln!(out, "{} close {} {depth}", row.position, tree.get(*el).tag)
                }
                RowKind::Empty { el, depth } => {
                    writeln!(out, "{} empty {} {depth}", row.position, tree.get(*el).tag)
                }
                RowKind::Text(text) => writeln!(out, "{} text {text:?}", row.position),
            };
        }
        out
    }
}
