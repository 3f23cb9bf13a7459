//! Tree construction from a flat list of annotations.
//!
//! Annotations are ordered by begin, then widest first, then shallowest
//! first. Walking the text one character at a time, the annotations covering
//! that character form a chain from the root inwards; each link of the chain
//! becomes a parent/child edge, and the character is appended at the current
//! end of the innermost element.
//!
//! A point annotation hangs from the deepest element shallower than itself.
//! When that element ends exactly at the point, the point goes inside it, at
//! its end; otherwise it goes before any element opening at the same
//! position.
//!
//! Comment annotations become comment nodes and may not contain other
//! annotations.

use std::cmp::Reverse;

use crate::annotation::PositionedAnnotation;
use crate::error::{Result, StandoffError};
use crate::tree::{ElementId, Tree};

pub fn build_tree(plain: &str, annotations: &[PositionedAnnotation]) -> Result<Tree> {
    let chars: Vec<char> = plain.chars().collect();
    let len = chars.len();

    for ann in annotations {
        if ann.begin > ann.end || ann.end > len {
            return Err(StandoffError::PositionNotFound {
                pos: ann.begin.max(ann.end),
                len,
            });
        }
    }

    let mut order: Vec<usize> = (0..annotations.len()).collect();
    order.sort_by_key(|&i| {
        let ann = &annotations[i];
        (ann.begin, Reverse(ann.width()), ann.depth)
    });

    let (&root_index, rest) = order.split_first().ok_or_else(|| {
        StandoffError::MalformedTable("no annotations to build from".to_string())
    })?;
    let root_ann = &annotations[root_index];
    if root_ann.comment || root_ann.begin != 0 || root_ann.end != len {
        return Err(StandoffError::MalformedTable(format!(
            "<{}> does not span the whole text",
            root_ann.tag
        )));
    }

    let mut tree = Tree::with_root(root_ann.tag.clone(), root_ann.attrib.clone());
    let mut ids: Vec<ElementId> = vec![tree.root(); annotations.len()];
    let mut covering: Vec<Vec<usize>> = vec![vec![root_index]; len];
    let mut points: Vec<Vec<usize>> = vec![Vec::new(); len + 1];

    for &i in rest {
        let ann = &annotations[i];
        ids[i] = if ann.comment {
            tree.create_comment("")
        } else {
            tree.create_element(ann.tag.clone(), ann.attrib.clone())
        };
        if ann.is_point() {
            points[ann.begin].push(i);
        } else {
            for chain in &mut covering[ann.begin..ann.end] {
                chain.push(i);
            }
        }
    }

    let fallback = vec![root_index];
    for pos in 0..=len {
        let current: &[usize] = covering.get(pos).map(Vec::as_slice).unwrap_or_default();
        let previous: &[usize] = pos
            .checked_sub(1)
            .map(|p| covering[p].as_slice())
            .unwrap_or_default();
        let chain = match (current.is_empty(), previous.is_empty()) {
            (false, _) => current,
            (true, false) => previous,
            (true, true) => fallback.as_slice(),
        };

        // (point, level in `chain` it hangs from)
        let mut anchored: Vec<(usize, usize)> = Vec::new();
        for &p in &points[pos] {
            let depth = annotations[p].depth;
            let closing = previous
                .iter()
                .rev()
                .find(|&&c| annotations[c].depth < depth)
                .filter(|&&c| annotations[c].end == pos);
            match closing {
                Some(&c) => link(&mut tree, ids[c], ids[p])?,
                None => {
                    let level = chain
                        .iter()
                        .rposition(|&c| annotations[c].depth < depth)
                        .unwrap_or(0);
                    anchored.push((p, level));
                }
            }
        }

        let attach_points = |tree: &mut Tree, level: usize| -> Result<()> {
            for &(p, _) in anchored.iter().filter(|(_, at)| *at == level) {
                link(tree, ids[chain[level]], ids[p])?;
            }
            Ok(())
        };

        if pos < len {
            for level in 1..chain.len() {
                attach_points(&mut tree, level - 1)?;
                let (parent, child) = (ids[chain[level - 1]], ids[chain[level]]);
                if !tree.contains_child(parent, child) {
                    link(&mut tree, parent, child)?;
                }
            }
            attach_points(&mut tree, chain.len() - 1)?;
            let mut buf = [0; 4];
            let innermost = ids[chain[chain.len() - 1]];
            tree.push_content(innermost, chars[pos].encode_utf8(&mut buf));
        } else {
            for level in 0..chain.len() {
                attach_points(&mut tree, level)?;
            }
        }
    }

    Ok(tree)
}

fn link(tree: &mut Tree, parent: ElementId, child: ElementId) -> Result<()> {
    if tree.get(parent).is_comment() {
        return Err(StandoffError::MalformedTable(
            "a comment cannot contain other annotations".to_string(),
        ));
    }
    tree.append_child(parent, child);
    Ok(())
}
