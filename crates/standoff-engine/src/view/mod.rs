/*!
 * # Views
 *
 * A [`View`] derives a plain-text projection of a document for text
 * processing tools, and keeps enough bookkeeping to map offsets in that
 * projection back to document positions.
 *
 * Every text character and every structural row of the position table gets
 * one entry. An entry's output starts as the original character (or nothing
 * for structural rows) and is rewritten by the filters, which compose in
 * call order. The document itself is never modified.
 *
 * ```rust
 * use standoff_engine::{Standoff, tree::xml};
 *
 * let doc = Standoff::from_tree(xml::parse("<p>a<note>b</note>c<lb/>d</p>").unwrap());
 * let (plain, lookup) = doc
 *     .view()
 *     .exclude_inside("note")
 *     .insert_tag_text("lb", '\n')
 *     .get_plain();
 * assert_eq!(plain, "ac\nd");
 * assert_eq!(lookup.get_pos(1).unwrap(), 2);
 * ```
 */

mod lookup;

pub use lookup::ReverseLookup;

use crate::table::{PositionTable, RowKind};
use crate::tree::{ElementId, Node, Tree, tag_matches};

/// Which structural rows [`View::insert_tag_text_on`] rewrites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowSelector {
    #[default]
    Any,
    Open,
    Close,
    Empty,
}

impl RowSelector {
    fn accepts(self, kind: &RowKind) -> bool {
        match (self, kind) {
            (_, RowKind::Text(_)) => false,
            (RowSelector::Any, _) => true,
            (RowSelector::Open, RowKind::Open { .. }) => true,
            (RowSelector::Close, RowKind::Close { .. }) => true,
            (RowSelector::Empty, RowKind::Empty { .. }) => true,
            _ => false,
        }
    }
}

pub const DEFAULT_WHITESPACE: [char; 3] = [' ', '\t', '\n'];

#[derive(Debug, Clone, Copy)]
struct Entry {
    row: usize,
    position: usize,
    original: Option<char>,
    output: Option<char>,
}

#[derive(Debug, Clone)]
pub struct View<'a> {
    table: &'a PositionTable,
    tree: &'a Tree,
    entries: Vec<Entry>,
}

impl<'a> View<'a> {
    pub fn new(table: &'a PositionTable, tree: &'a Tree) -> Self {
        let mut entries = Vec::new();
        for (row_index, row) in table.rows().iter().enumerate() {
            match row.text() {
                Some(text) => {
                    entries.extend(text.chars().enumerate().map(|(offset, ch)| Entry {
                        row: row_index,
                        position: row.position + offset,
                        original: Some(ch),
                        output: Some(ch),
                    }));
                }
                None => entries.push(Entry {
                    row: row_index,
                    position: row.position,
                    original: None,
                    output: None,
                }),
            }
        }
        Self {
            table,
            tree,
            entries,
        }
    }

    fn is_tag(node: &Node, tag: &str) -> bool {
        !node.is_comment() && tag_matches(&node.tag, tag)
    }

    /// Entries inside (or on the boundary rows of) elements accepted by
    /// `matches`.
    fn mask(&self, matches: impl Fn(&Node) -> bool) -> Vec<bool> {
        let rows = self.table.rows();
        let mut stack: Vec<ElementId> = Vec::new();
        self.entries
            .iter()
            .map(|entry| match &rows[entry.row].kind {
                RowKind::Open { el, .. } if matches(self.tree.get(*el)) => {
                    stack.push(*el);
                    true
                }
                RowKind::Close { el, .. } if stack.last() == Some(el) => {
                    stack.pop();
                    true
                }
                RowKind::Empty { el, .. } if matches(self.tree.get(*el)) => true,
                _ => !stack.is_empty(),
            })
            .collect()
    }

    fn blank_where(mut self, mask: &[bool], value: bool) -> Self {
        for (entry, &hit) in self.entries.iter_mut().zip(mask) {
            if hit == value {
                entry.output = None;
            }
        }
        self
    }

    /// Drop everything within elements named `tag`.
    pub fn exclude_inside(self, tag: &str) -> Self {
        let mask = self.mask(|node| Self::is_tag(node, tag));
        self.blank_where(&mask, true)
    }

    /// Drop everything outside elements named `tag`.
    pub fn exclude_outside(self, tag: &str) -> Self {
        let mask = self.mask(|node| Self::is_tag(node, tag));
        self.blank_where(&mask, false)
    }

    /// Restore the original characters within elements named `tag`.
    pub fn include_inside(mut self, tag: &str) -> Self {
        let mask = self.mask(|node| Self::is_tag(node, tag));
        for (entry, hit) in self.entries.iter_mut().zip(mask) {
            if hit {
                entry.output = entry.original;
            }
        }
        self
    }

    /// Drop comment text.
    pub fn remove_comments(self) -> Self {
        let mask = self.mask(Node::is_comment);
        self.blank_where(&mask, true)
    }

    /// Emit `ch` for every boundary row of elements named `tag`.
    pub fn insert_tag_text(self, tag: &str, ch: char) -> Self {
        self.insert_tag_text_on(tag, ch, RowSelector::Any)
    }

    /// Emit `ch` for the boundary rows of elements named `tag` that
    /// `selector` accepts.
    pub fn insert_tag_text_on(mut self, tag: &str, ch: char, selector: RowSelector) -> Self {
        let rows = self.table.rows();
        for entry in &mut self.entries {
            let row = &rows[entry.row];
            if !selector.accepts(&row.kind) {
                continue;
            }
            if let Some(el) = row.el()
                && Self::is_tag(self.tree.get(el), tag)
            {
                entry.output = Some(ch);
            }
        }
        self
    }

    /// Collapse runs of whitespace to a single space. See
    /// [`shrink_whitespace_with`](Self::shrink_whitespace_with).
    pub fn shrink_whitespace(self) -> Self {
        self.shrink_whitespace_with(' ', &DEFAULT_WHITESPACE)
    }

    /// Collapse every run of output whitespace to one `shrink_to`.
    ///
    /// Entries with no output do not interrupt a run. A run is only
    /// collapsed when it holds at least two characters of document text;
    /// single characters, including ones substituted in by
    /// [`insert_tag_text`](Self::insert_tag_text), are kept as they are.
    pub fn shrink_whitespace_with(mut self, shrink_to: char, whitespace: &[char]) -> Self {
        let mut run: Vec<usize> = Vec::new();
        for i in 0..=self.entries.len() {
            if let Some(entry) = self.entries.get(i) {
                match entry.output {
                    None => continue,
                    Some(ch) if whitespace.contains(&ch) => {
                        run.push(i);
                        continue;
                    }
                    Some(_) => {}
                }
            }
            if !run.is_empty() {
                self.collapse_run(&run, shrink_to);
                run.clear();
            }
        }
        self
    }

    fn collapse_run(&mut self, run: &[usize], shrink_to: char) {
        let originals = run
            .iter()
            .filter(|&&i| self.entries[i].original.is_some())
            .count();
        if originals < 2 {
            return;
        }
        for (n, &i) in run.iter().enumerate() {
            self.entries[i].output = if n == 0 { Some(shrink_to) } else { None };
        }
    }

    /// The projected text, with a lookup back into the document.
    pub fn get_plain(&self) -> (String, ReverseLookup) {
        let mut plain = String::new();
        let mut lookup = ReverseLookup::default();
        for entry in &self.entries {
            let Some(ch) = entry.output else { continue };
            plain.push(ch);
            lookup.table_indices.push(entry.row);
            lookup.positions.push(entry.position);
            lookup.end = entry.position + usize::from(entry.original.is_some());
        }
        (plain, lookup)
    }
}
