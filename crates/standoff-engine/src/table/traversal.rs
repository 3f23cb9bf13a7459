//! Flat traversal of an element tree.
//!
//! The tree is linearized into open/close/empty events in document order.
//! Each event carries the character data that follows it: an element's
//! text after its open event, its tail after its close (or empty) event.

use crate::tree::{ElementId, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Open,
    Close,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub el: ElementId,
    pub depth: usize,
    pub text: Option<String>,
}

enum Step {
    Enter(ElementId, usize),
    Leave(ElementId, usize),
}

/// Linearize the subtree under `root`. The root sits at depth 0 and its
/// tail is not part of the traversal.
pub fn flatten(tree: &Tree, root: ElementId) -> Vec<Event> {
    let mut events = Vec::new();
    let mut work = vec![Step::Enter(root, 0)];

    let tail_of = |id: ElementId| {
        if id == root {
            None
        } else {
            tree.get(id).tail.clone()
        }
    };

    while let Some(step) = work.pop() {
        match step {
            Step::Enter(id, depth) => {
                let node = tree.get(id);
                if node.is_empty() {
                    events.push(Event {
                        kind: EventKind::Empty,
                        el: id,
                        depth,
                        text: tail_of(id),
                    });
                    continue;
                }
                events.push(Event {
                    kind: EventKind::Open,
                    el: id,
                    depth,
                    text: node.text.clone(),
                });
                work.push(Step::Leave(id, depth));
                for &child in node.children().iter().rev() {
                    work.push(Step::Enter(child, depth + 1));
                }
            }
            Step::Leave(id, depth) => events.push(Event {
                kind: EventKind::Close,
                el: id,
                depth,
                text: tail_of(id),
            }),
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::xml;

    fn describe(tree: &Tree, events: &[Event]) -> Vec<String> {
        events
            .iter()
            .map(|e| {
                let marker = match e.kind {
                    EventKind::Open => "open",
                    EventKind::Close => "close",
                    EventKind::Empty => "empty",
                };
                format!(
                    "{marker} {} {} {:?}",
                    tree.get(e.el).tag,
                    e.depth,
                    e.text.as_deref().unwrap_or("")
                )
            })
            .collect()
    }

    #[test]
    fn test_flatten_nested() {
        let tree = xml::parse("<W><text type=\"a\">A <lb/>B <hi>C</hi></text></W>").unwrap();
        let events = flatten(&tree, tree.root());
        assert_eq!(
            describe(&tree, &events),
            vec![
                "open W 0 \"\"",
                "open text 1 \"A \"",
                "empty lb 2 \"B \"",
                "open hi 2 \"C\"",
                "close hi 2 \"\"",
                "close text 1 \"\"",
                "close W 0 \"\"",
            ]
        );
    }

    #[test]
    fn test_root_tail_is_excluded() {
        let tree = xml::parse("<r><p>x</p>tail</r>").unwrap();
        let p = tree.get(tree.root()).children()[0];
        let events = flatten(&tree, p);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].text, None);
    }

    #[test]
    fn test_empty_root() {
        let tree = xml::parse("<r/>").unwrap();
        let events = flatten(&tree, tree.root());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Empty);
    }
}
