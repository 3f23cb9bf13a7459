//! Markup output straight from annotations, without building a tree.

use std::cmp::Reverse;

use crate::annotation::PositionedAnnotation;

/// Interleave `annotations` with `plain` into an XML string.
///
/// At every position, closing tags come narrowest first, then deepest
/// first; opening tags come widest first, then shallowest first. A point
/// annotation whose parent ends at that position is written just before the
/// parent's closing tag; any other point is written before the opening tags
/// of elements deeper than itself. Attribute values use single quotes.
/// Comments are written as `<!--..-->`. Annotations reaching past the end
/// of the text are skipped.
pub fn standoff_to_xml(plain: &str, annotations: &[PositionedAnnotation]) -> String {
    let chars: Vec<char> = plain.chars().collect();
    let len = chars.len();

    let mut opens: Vec<Vec<&PositionedAnnotation>> = vec![Vec::new(); len + 1];
    let mut closes: Vec<Vec<&PositionedAnnotation>> = vec![Vec::new(); len + 1];
    let mut points: Vec<Vec<&PositionedAnnotation>> = vec![Vec::new(); len + 1];
    for ann in annotations {
        if ann.begin > ann.end || ann.end > len {
            log::warn!(
                "skipping <{}> at {}..{}: outside the text",
                ann.tag,
                ann.begin,
                ann.end
            );
            continue;
        }
        if ann.is_point() {
            points[ann.begin].push(ann);
        } else {
            opens[ann.begin].push(ann);
            closes[ann.end].push(ann);
        }
    }

    let mut out = String::new();
    for pos in 0..=len {
        let closes = &mut closes[pos];
        closes.sort_by_key(|a| (a.width(), Reverse(a.depth)));
        let opens = &mut opens[pos];
        opens.sort_by_key(|a| (Reverse(a.width()), a.depth));

        let (mut closing, mut opening): (Vec<&PositionedAnnotation>, Vec<&PositionedAnnotation>) =
            points[pos]
                .iter()
                .copied()
                .partition(|pt| closes.iter().any(|c| c.depth + 1 == pt.depth));
        closing.sort_by_key(|pt| Reverse(pt.depth));
        opening.sort_by_key(|pt| pt.depth);

        let mut pending = closes.iter().peekable();
        for pt in closing {
            while let Some(close) = pending.next_if(|c| c.depth >= pt.depth) {
                write_close(&mut out, close);
            }
            write_start(&mut out, pt, true);
        }
        for close in pending {
            write_close(&mut out, close);
        }

        let mut pending = opens.iter().peekable();
        for pt in opening {
            while let Some(open) = pending.next_if(|o| o.depth < pt.depth) {
                write_start(&mut out, open, false);
            }
            write_start(&mut out, pt, true);
        }
        for open in pending {
            write_start(&mut out, open, false);
        }

        if let Some(ch) = chars.get(pos) {
            let mut buf = [0; 4];
            html_escape::encode_text_to_string(ch.encode_utf8(&mut buf), &mut out);
        }
    }
    out
}

fn write_start(out: &mut String, ann: &PositionedAnnotation, point: bool) {
    if ann.comment {
        out.push_str(if point { "<!---->" } else { "<!--" });
        return;
    }
    out.push('<');
    out.push_str(&ann.tag);
    for (key, value) in ann.attrib.iter() {
        out.push(' ');
        out.push_str(key);
        out.push_str("='");
        html_escape::encode_single_quoted_attribute_to_string(value, out);
        out.push('\'');
    }
    out.push_str(if point { "/>" } else { ">" });
}

fn write_close(out: &mut String, ann: &PositionedAnnotation) {
    if ann.comment {
        out.push_str("-->");
        return;
    }
    out.push_str("</");
    out.push_str(&ann.tag);
    out.push('>');
}
