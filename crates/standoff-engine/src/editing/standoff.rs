use log::debug;
use uuid::Uuid;

use crate::annotation::{self, PositionedAnnotation};
use crate::builder::{TreeBuilder, overlap};
use crate::editing::{Batch, Cmd, Inline, Patch};
use crate::error::{Result, StandoffError};
use crate::render;
use crate::table::collapse::Collapsed;
use crate::table::{Context, PositionTable};
use crate::tree::{ElementId, Tree, tag_matches};
use crate::view::View;

/// Which representation is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Tree and table agree.
    Tree,
    /// The table holds edits the tree has not caught up with yet.
    Table,
}

/// A document held both as an element tree and as a position table.
///
/// Edits go through the table and are then replayed into the tree by
/// rebuilding the smallest enclosing element in place. Element ids stay
/// valid across edits. A failing edit leaves both representations
/// untouched.
///
/// ```rust
/// use standoff_engine::{Inline, Standoff, tree::xml};
///
/// let tree = xml::parse("<p>1 2 3</p>").unwrap();
/// let mut doc = Standoff::from_tree(tree);
/// doc.add_inline(Inline::new(0, 1, "num").attr("resp", "machine")).unwrap();
/// assert_eq!(doc.to_xml(), r#"<p><num resp="machine">1</num> 2 3</p>"#);
/// ```
#[derive(Debug, Clone)]
pub struct Standoff {
    tree: Tree,
    table: PositionTable,
    text_root: ElementId,
    authority: Authority,
    batch_depth: usize,
    version: u64,
}

impl Standoff {
    /// Track the text of the whole tree.
    pub fn from_tree(tree: Tree) -> Self {
        let root = tree.root();
        Self::with_root_element(tree, root)
    }

    /// Track only the text under the first element named `name`, e.g. the
    /// `text` element of a TEI document. Everything outside it is left alone.
    pub fn with_text_root(tree: Tree, name: &str) -> Result<Self> {
        let root = tree
            .find_first(name)
            .ok_or_else(|| StandoffError::TagNotFound(name.to_string()))?;
        Ok(Self::with_root_element(tree, root))
    }

    fn with_root_element(tree: Tree, text_root: ElementId) -> Self {
        let table = PositionTable::from_tree(&tree, text_root);
        debug!(
            "tracking {} characters in {} rows",
            table.text_len(),
            table.rows().len()
        );
        Self {
            tree,
            table,
            text_root,
            authority: Authority::Tree,
            batch_depth: 0,
            version: 0,
        }
    }

    /// Build a document from plain text and annotations over it.
    pub fn from_annotations(plain: &str, annotations: &[PositionedAnnotation]) -> Result<Self> {
        Ok(Self::from_tree(overlap::build_tree(plain, annotations)?))
    }

    /// [`from_annotations`](Self::from_annotations) with the annotations as
    /// a JSON array.
    pub fn from_json(plain: &str, json: &str) -> Result<Self> {
        let annotations = annotation::from_json(json)?;
        Self::from_annotations(plain, &annotations)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn table(&self) -> &PositionTable {
        &self.table
    }

    pub fn text_root(&self) -> ElementId {
        self.text_root
    }

    pub fn authority(&self) -> Authority {
        self.authority
    }

    pub fn is_synchronized(&self) -> bool {
        self.authority == Authority::Tree
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn plain(&self) -> String {
        self.table.get_text()
    }

    pub fn annotations(&self) -> Vec<PositionedAnnotation> {
        self.table.annotations(&self.tree)
    }

    pub fn annotation_of(&self, el: ElementId) -> Option<PositionedAnnotation> {
        let (begin, end) = self.table.span_of(el)?;
        let depth = self.table.depth_of(el)?;
        let node = self.tree.get(el);
        if node.is_comment() {
            return Some(PositionedAnnotation::comment(begin, end, depth));
        }
        Some(PositionedAnnotation::new(begin, end, &node.tag, depth).with_attrib(node.attrib.clone()))
    }

    pub fn text_of(&self, el: ElementId) -> Option<String> {
        let (begin, end) = self.table.span_of(el)?;
        Some(self.table.text_slice(begin, end))
    }

    /// Elements named `name` (exactly or by local name), in document order.
    pub fn find(&self, name: &str) -> Vec<ElementId> {
        self.table
            .elements()
            .filter(|&id| {
                let node = self.tree.get(id);
                !node.is_comment() && tag_matches(&node.tag, name)
            })
            .collect()
    }

    /// Elements enclosing `begin..end`. Both ends must share one context,
    /// and it may not lie inside a comment.
    pub fn get_parents(&self, begin: usize, end: usize) -> Result<Context> {
        let first = self.table.get_context_at_pos(begin)?;
        let last = self
            .table
            .get_context_at_pos(end.saturating_sub(1).max(begin))?;
        if first != last || first.iter().any(|&el| self.tree.get(el).is_comment()) {
            return Err(StandoffError::AmbiguousContext { begin, end });
        }
        Ok(first)
    }

    /// The whole tree as XML. Reflects the table only when synchronized.
    pub fn to_xml(&self) -> String {
        self.tree.to_xml()
    }

    /// The tracked text and annotations as XML, written straight from the
    /// table.
    pub fn to_standoff_xml(&self) -> String {
        render::standoff_to_xml(&self.plain(), &self.annotations())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(annotation::to_json(&self.annotations())?)
    }

    pub fn collapsed(&self, include_empty: bool) -> Vec<Collapsed> {
        self.table.collapse(include_empty)
    }

    pub fn view(&self) -> View<'_> {
        View::new(&self.table, &self.tree)
    }

    /// Apply an edit command.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch> {
        // The tree is only rewritten by a rebuild, which checks its rows
        // first and is the last step of every edit. Nodes created by a
        // failing edit are never attached.
        let snapshot = (self.table.clone(), self.tree.node_count(), self.authority);

        let result = match cmd {
            Cmd::AddInline(inline) => self
                .insert_inline(inline)
                .map(|el| (el.into_iter().collect(), Vec::new())),
            Cmd::RemoveInline { el, lazy } => {
                self.delete_inline(el, lazy).map(|()| (Vec::new(), vec![el]))
            }
            Cmd::AddSpan { id, inline } => self
                .insert_span(id, inline)
                .map(|added| (added, Vec::new())),
        };

        match result {
            Ok((added, removed)) => {
                let patch = Patch {
                    added,
                    removed,
                    version: self.version,
                };
                if !patch.is_noop() {
                    self.version += 1;
                }
                Ok(Patch {
                    version: self.version,
                    ..patch
                })
            }
            Err(err) => {
                let (table, nodes, authority) = snapshot;
                self.table = table;
                self.authority = authority;
                self.tree.truncate(nodes);
                debug!("edit rolled back: {err}");
                Err(err)
            }
        }
    }

    /// Wrap `inline.begin..inline.end` in a new element.
    ///
    /// Returns `None` when an identical annotation already exists and
    /// `inline.unique` is set.
    pub fn add_inline(&mut self, inline: Inline) -> Result<Option<ElementId>> {
        let patch = self.apply(Cmd::AddInline(inline))?;
        Ok(patch.added.first().copied())
    }

    /// Unwrap `el`, keeping its content in place.
    pub fn remove_inline(&mut self, el: ElementId) -> Result<()> {
        self.apply(Cmd::RemoveInline { el, lazy: false })?;
        Ok(())
    }

    /// Mark `inline.begin..inline.end` with a start element pointing at an
    /// `<anchor>` placed at the end. Returns the id tying the two together.
    pub fn add_span(&mut self, inline: Inline, id: Option<String>) -> Result<String> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.apply(Cmd::AddSpan {
            id: Some(id.clone()),
            inline,
        })?;
        Ok(id)
    }

    /// Hold tree rebuilds until the matching [`commit`](Self::commit).
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close one batch level; closing the outermost one rebuilds the tree.
    pub fn commit(&mut self) -> Result<()> {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 {
            self.synchronize()?;
        }
        Ok(())
    }

    /// A batch that commits when dropped.
    pub fn batch(&mut self) -> Batch<'_> {
        Batch::new(self)
    }

    /// Rebuild the tree from the table if it has fallen behind.
    pub fn synchronize(&mut self) -> Result<()> {
        if self.authority == Authority::Table {
            self.regenerate(self.text_root)?;
            self.authority = Authority::Tree;
            debug!("tree rebuilt from the position table");
        }
        Ok(())
    }

    fn insert_inline(&mut self, inline: Inline) -> Result<Option<ElementId>> {
        let len = self.table.text_len();
        if inline.begin > inline.end || inline.end > len {
            return Err(StandoffError::PositionNotFound {
                pos: inline.begin.max(inline.end),
                len,
            });
        }
        if inline.unique && self.has_annotation(&inline) {
            debug!(
                "<{}> already covers {}..{}, skipping",
                inline.tag, inline.begin, inline.end
            );
            return Ok(None);
        }

        let chain = self.get_parents(inline.begin, inline.end)?;
        let depth = inline.depth.unwrap_or(chain.len());
        if !(1..=chain.len()).contains(&depth) {
            return Err(StandoffError::InvalidDepth {
                depth,
                max: chain.len(),
            });
        }

        let el = self
            .tree
            .create_element(inline.tag.clone(), inline.attrib.clone());
        let parent = if inline.is_point() {
            let at = self
                .table
                .insert_empty(inline.begin, el, depth, inline.slot)?;
            self.table
                .context_at_index(at)
                .innermost()
                .ok_or_else(|| {
                    StandoffError::MalformedTable("empty element outside the text root".to_string())
                })?
        } else {
            let parent = chain[depth - 1];
            for child in self.enclosed_children(parent, inline.begin, inline.end)? {
                self.table.shift_subtree(child, 1)?;
            }
            self.table.insert_open(inline.begin, el, depth)?;
            self.table.insert_close(inline.end, el, depth)?;
            parent
        };
        debug!(
            "added <{}> over {}..{} at depth {depth}",
            inline.tag, inline.begin, inline.end
        );

        self.settle(parent, inline.lazy)?;
        Ok(Some(el))
    }

    fn delete_inline(&mut self, el: ElementId, lazy: bool) -> Result<()> {
        let (open, close) = self.table.rows_of(el).ok_or(StandoffError::NotFound(el))?;
        let parent = self
            .table
            .context_at_index(open)
            .innermost()
            .ok_or(StandoffError::RootRemoval)?;
        if close > open + 1 {
            self.table.shift_depth(open + 1..close, -1);
        }
        self.table.remove_el(el)?;
        debug!("removed <{}>", self.tree.get(el).tag);
        self.settle(parent, lazy)?;
        Ok(())
    }

    fn insert_span(&mut self, id: Option<String>, inline: Inline) -> Result<Vec<ElementId>> {
        let len = self.table.text_len();
        if inline.begin > inline.end || inline.end > len {
            return Err(StandoffError::PositionNotFound {
                pos: inline.begin.max(inline.end),
                len,
            });
        }
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let lazy = inline.lazy;
        let marker = Inline {
            end: inline.begin,
            ..inline.clone()
        }
        .attr("spanTo", id.as_str())
        .lazy();
        let Some(start) = self.insert_inline(marker)? else {
            return Ok(Vec::new());
        };

        let mut anchor = Inline::point(inline.end, "anchor")
            .attr("id", id.as_str())
            .allow_duplicates();
        anchor.lazy = lazy;
        let end = self.insert_inline(anchor)?;
        Ok(std::iter::once(start).chain(end).collect())
    }

    fn has_annotation(&self, inline: &Inline) -> bool {
        self.annotations()
            .iter()
            .any(|a| a.describes(inline.begin, inline.end, &inline.tag, &inline.attrib))
    }

    /// Children of `parent` a new element over `begin..end` would enclose.
    fn enclosed_children(
        &self,
        parent: ElementId,
        begin: usize,
        end: usize,
    ) -> Result<Vec<ElementId>> {
        let mut inside = Vec::new();
        for (child, b, e) in self.table.child_spans(parent)? {
            if begin <= b && e <= end {
                inside.push(child);
            } else if b < end && e > begin {
                return Err(StandoffError::AmbiguousContext { begin, end });
            }
        }
        Ok(inside)
    }

    /// Bring the tree up to date after a table edit under `parent`, unless
    /// the edit is lazy or batched.
    fn settle(&mut self, parent: ElementId, lazy: bool) -> Result<()> {
        if lazy || self.batch_depth > 0 {
            self.authority = Authority::Table;
            return Ok(());
        }
        let target = match self.authority {
            Authority::Tree => parent,
            Authority::Table => self.text_root,
        };
        self.regenerate(target)?;
        self.authority = Authority::Tree;
        Ok(())
    }

    /// Rewrite `el`'s subtree from its rows.
    fn regenerate(&mut self, el: ElementId) -> Result<()> {
        let (open, close) = self.table.rows_of(el).ok_or(StandoffError::NotFound(el))?;
        TreeBuilder::build(&mut self.tree, &self.table.rows()[open..=close])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::invariants;
    use crate::tree::xml;
    use pretty_assertions::assert_eq;

    fn doc(source: &str) -> Standoff {
        Standoff::from_tree(xml::parse(source).unwrap())
    }

    #[test]
    fn test_failed_edit_leaves_document_untouched() {
        // Given a document
        let mut standoff = doc("<p>abc</p>");
        let before = standoff.table().clone();

        // When an edit fails after the table was already split
        let err = standoff
            .add_inline(Inline::point(1, "lb").slot(7))
            .unwrap_err();

        // Then nothing changed
        assert!(matches!(err, StandoffError::InvalidSlot { slot: 7, .. }));
        assert_eq!(standoff.table(), &before);
        assert_eq!(standoff.to_xml(), "<p>abc</p>");
        assert_eq!(standoff.version(), 0);
    }

    #[test]
    fn test_duplicate_is_skipped() {
        let mut standoff = doc("<p>abc</p>");
        let first = standoff.add_inline(Inline::new(0, 1, "x")).unwrap();
        let second = standoff.add_inline(Inline::new(0, 1, "x")).unwrap();
        assert!(first.is_some());
        assert_eq!(second, None);
        assert_eq!(standoff.version(), 1);

        let third = standoff
            .add_inline(Inline::new(0, 1, "x").allow_duplicates())
            .unwrap();
        assert!(third.is_some());
        assert_eq!(standoff.to_xml(), "<p><x><x>a</x></x>bc</p>");
    }

    #[test]
    fn test_returned_id_is_live() {
        let mut standoff = doc("<p>abc</p>");
        let el = standoff
            .add_inline(Inline::new(1, 3, "hi"))
            .unwrap()
            .unwrap();
        assert_eq!(standoff.tree().get(el).tag, "hi");
        assert_eq!(standoff.text_of(el).as_deref(), Some("bc"));
        assert_eq!(standoff.find("hi"), vec![el]);
    }

    #[test]
    fn test_lazy_edits_wait_for_synchronize() {
        let mut standoff = doc("<p>abc</p>");
        standoff.add_inline(Inline::new(0, 1, "a").lazy()).unwrap();
        assert_eq!(standoff.authority(), Authority::Table);
        assert_eq!(standoff.to_xml(), "<p>abc</p>");

        standoff.synchronize().unwrap();

        assert!(standoff.is_synchronized());
        assert_eq!(standoff.to_xml(), "<p><a>a</a>bc</p>");
    }

    #[test]
    fn test_eager_edit_flushes_pending_lazy_edits() {
        let mut standoff = doc("<r><p>ab</p><q>cd</q></r>");
        standoff.add_inline(Inline::new(0, 1, "x").lazy()).unwrap();
        standoff.add_inline(Inline::new(2, 3, "y")).unwrap();
        assert!(standoff.is_synchronized());
        assert_eq!(
            standoff.to_xml(),
            "<r><p><x>a</x>b</p><q><y>c</y>d</q></r>"
        );
    }

    #[test]
    fn test_batch_commits_on_drop() {
        let mut standoff = doc("<p>abcd</p>");
        {
            let mut batch = standoff.batch();
            batch.add_inline(Inline::new(0, 2, "a")).unwrap();
            batch.add_inline(Inline::new(2, 4, "b")).unwrap();
            assert_eq!(batch.to_xml(), "<p>abcd</p>");
        }
        assert_eq!(standoff.to_xml(), "<p><a>ab</a><b>cd</b></p>");
        invariants::check(standoff.table());
    }

    #[test]
    fn test_nested_batches() {
        let mut standoff = doc("<p>abcd</p>");
        standoff.begin_batch();
        standoff.begin_batch();
        standoff.add_inline(Inline::new(0, 2, "a")).unwrap();
        standoff.commit().unwrap();
        assert!(!standoff.is_synchronized());
        standoff.commit().unwrap();
        assert_eq!(standoff.to_xml(), "<p><a>ab</a>cd</p>");
    }

    #[test]
    fn test_remove_root_is_rejected() {
        let mut standoff = doc("<p>abc</p>");
        let root = standoff.text_root();
        assert!(matches!(
            standoff.remove_inline(root),
            Err(StandoffError::RootRemoval)
        ));
    }

    #[test]
    fn test_invalid_depth() {
        let mut standoff = doc("<p>abc</p>");
        assert!(matches!(
            standoff.add_inline(Inline::new(0, 1, "x").depth(2)),
            Err(StandoffError::InvalidDepth { depth: 2, max: 1 })
        ));
        assert!(matches!(
            standoff.add_inline(Inline::new(0, 1, "x").depth(0)),
            Err(StandoffError::InvalidDepth { depth: 0, max: 1 })
        ));
    }

    #[test]
    fn test_text_root_leaves_outside_untouched() {
        let tree = xml::parse("<TEI><teiHeader>head</teiHeader><text>abc</text></TEI>").unwrap();
        let mut standoff = Standoff::with_text_root(tree, "text").unwrap();
        assert_eq!(standoff.plain(), "abc");

        standoff.add_inline(Inline::new(0, 1, "x")).unwrap();

        assert_eq!(
            standoff.to_xml(),
            "<TEI><teiHeader>head</teiHeader><text><x>a</x>bc</text></TEI>"
        );
        assert_eq!(standoff.tree().get(standoff.text_root()).tag, "text");
    }

    #[test]
    fn test_missing_text_root() {
        let tree = xml::parse("<TEI/>").unwrap();
        assert!(matches!(
            Standoff::with_text_root(tree, "text"),
            Err(StandoffError::TagNotFound(_))
        ));
    }

    #[test]
    fn test_span_inside_comment_rejected() {
        // Given a comment in running text
        let source = "<p>a<!--bc-->d</p>";
        let mut standoff = doc(source);

        // When an element or a point would land inside the comment
        let inside = standoff.add_inline(Inline::new(1, 3, "x"));
        let point = standoff.add_inline(Inline::point(2, "lb"));

        // Then both are refused and nothing changed
        assert!(matches!(
            inside,
            Err(StandoffError::AmbiguousContext { begin: 1, end: 3 })
        ));
        assert!(matches!(point, Err(StandoffError::AmbiguousContext { .. })));
        assert_eq!(standoff.to_xml(), source);
        assert_eq!(standoff.plain(), "abcd");
    }

    #[test]
    fn test_span_can_wrap_a_comment() {
        let mut standoff = doc("<p>a<!--bc-->d</p>");
        standoff.add_inline(Inline::new(0, 4, "x")).unwrap();
        assert_eq!(standoff.to_xml(), "<p><x>a<!--bc-->d</x></p>");
        invariants::check(standoff.table());
    }

    #[test]
    fn test_reversed_span_rejected() {
        let source = "<p>1 2 3 4 5 6 7 9 10</p>";
        let mut standoff = doc(source);

        let err = standoff
            .add_span(Inline::new(7, 2, "span"), Some("t".to_string()))
            .unwrap_err();

        assert!(matches!(err, StandoffError::PositionNotFound { pos: 7, .. }));
        assert_eq!(standoff.to_xml(), source);
        assert_eq!(standoff.version(), 0);
    }

    #[test]
    fn test_span_past_the_end_rejected() {
        let mut standoff = doc("<p>abc</p>");
        assert!(matches!(
            standoff.add_span(Inline::new(1, 4, "span"), None),
            Err(StandoffError::PositionNotFound { pos: 4, len: 3 })
        ));
        assert!(standoff.find("span").is_empty());
    }

    #[test]
    fn test_edits_reuse_nodes() {
        // Given a paragraph of 200 one-letter words
        let mut standoff = doc(&format!("<p>{}</p>", vec!["a"; 200].join(" ")));
        let before = standoff.tree().node_count();

        // When every word is wrapped, one edit at a time
        let mut ids = Vec::new();
        for i in 0..200 {
            let el = standoff
                .add_inline(Inline::new(2 * i, 2 * i + 1, "w"))
                .unwrap()
                .unwrap();
            ids.push(el);
        }

        // Then each edit added exactly one node and earlier ids still work
        assert_eq!(standoff.tree().node_count(), before + 200);
        assert_eq!(standoff.find("w"), ids);
        assert_eq!(standoff.text_of(ids[0]).as_deref(), Some("a"));
        invariants::check(standoff.table());
    }

    #[test]
    fn test_failed_edit_frees_its_nodes() {
        let mut standoff = doc("<r><a>ab</a><b>cd</b></r>");
        let before = standoff.tree().node_count();
        assert!(standoff.add_inline(Inline::point(1, "lb").slot(9)).is_err());
        assert_eq!(standoff.tree().node_count(), before);
    }

    #[test]
    fn test_annotation_of() {
        let standoff = doc("<p>a<hi rend=\"i\">bc</hi></p>");
        let hi = standoff.find("hi")[0];
        let ann = standoff.annotation_of(hi).unwrap();
        assert_eq!((ann.begin, ann.end, ann.depth), (1, 3, 1));
        assert_eq!(ann.attrib.get("rend"), Some("i"));
    }
}
