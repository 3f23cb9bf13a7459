//! Structural checks over a position table. Panics with a description of
//! the first violation found.

use std::collections::HashSet;

use super::{PositionTable, RowKind};

pub fn check(table: &PositionTable) {
    let rows = table.rows();
    let mut stack = Vec::new();
    let mut seen = HashSet::new();
    let mut position = 0;

    for (i, row) in rows.iter().enumerate() {
        assert!(
            row.position == position,
            "row {i} sits at {} but the text so far ends at {position}",
            row.position
        );
        match &row.kind {
            RowKind::Open { el, depth } => {
                assert!(seen.insert(*el), "row {i}: {el} opened twice");
                assert!(
                    *depth == stack.len(),
                    "row {i}: {el} opens at depth {depth} with {} elements open",
                    stack.len()
                );
                stack.push(*el);
            }
            RowKind::Close { el, depth } => {
                assert!(
                    stack.pop() == Some(*el),
                    "row {i}: {el} closes out of order"
                );
                assert!(
                    *depth == stack.len(),
                    "row {i}: {el} closes at depth {depth}, expected {}",
                    stack.len()
                );
            }
            RowKind::Empty { el, depth } => {
                assert!(seen.insert(*el), "row {i}: {el} appears twice");
                assert!(
                    *depth == stack.len(),
                    "row {i}: empty {el} at depth {depth} with {} elements open",
                    stack.len()
                );
            }
            RowKind::Text(text) => {
                assert!(!text.is_empty(), "row {i}: empty text run");
                assert!(
                    i == 0 || !rows[i - 1].is_text(),
                    "row {i}: adjacent text runs"
                );
                position += text.chars().count();
            }
        }
    }

    assert!(stack.is_empty(), "unclosed elements: {stack:?}");
    assert!(
        position == table.text_len(),
        "text length {} does not match the rows ({position})",
        table.text_len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::xml;

    #[test]
    fn test_parsed_table_is_consistent() {
        let tree = xml::parse("<r><a>x<lb/>y</a>z<b><c/></b></r>").unwrap();
        check(&PositionTable::from_tree(&tree, tree.root()));
    }

    #[test]
    #[should_panic(expected = "adjacent text runs")]
    fn test_split_runs_are_reported() {
        let tree = xml::parse("<r>xy</r>").unwrap();
        let mut table = PositionTable::from_tree(&tree, tree.root());
        table.split_at(1).unwrap();
        check(&table);
    }
}
