//! Text runs grouped by the elements enclosing them.

use std::mem;

use super::{Context, PositionTable, RowKind};

/// A maximal run of text sharing one context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collapsed {
    pub context: Context,
    pub text: String,
}

impl PositionTable {
    /// Merge consecutive text rows that share the same enclosing elements.
    ///
    /// With `include_empty`, every empty element breaks the current run and
    /// contributes an entry of its own, with the element as the innermost
    /// context and no text.
    pub fn collapse(&self, include_empty: bool) -> Vec<Collapsed> {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        let mut current: Option<Context> = None;
        let mut buffer = String::new();

        for row in &self.rows {
            match &row.kind {
                RowKind::Open { el, .. } => stack.push(*el),
                RowKind::Close { .. } => {
                    stack.pop();
                }
                RowKind::Empty { el, .. } if include_empty => {
                    flush(&mut out, current.take(), &mut buffer);
                    let mut chain = stack.clone();
                    chain.push(*el);
                    out.push(Collapsed {
                        context: Context(chain),
                        text: String::new(),
                    });
                }
                RowKind::Empty { .. } => {}
                RowKind::Text(text) => {
                    let context = Context(stack.clone());
                    if current.as_ref() != Some(&context) {
                        flush(&mut out, current.take(), &mut buffer);
                        current = Some(context);
                    }
                    buffer.push_str(text);
                }
            }
        }
        flush(&mut out, current, &mut buffer);
        out
    }
}

fn flush(out: &mut Vec<Collapsed>, context: Option<Context>, buffer: &mut String) {
    if !buffer.is_empty()
        && let Some(context) = context
    {
        out.push(Collapsed {
            context,
            text: mem::take(buffer),
        });
    }
}
