//! XML reading and writing for [`Tree`].

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Attributes, ElementId, NodeKind, Tree};

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("Invalid XML: {0}")]
    InvalidXml(String),
    #[error("document has no root element")]
    MissingRoot,
}

fn invalid(err: impl std::fmt::Display) -> XmlError {
    XmlError::InvalidXml(err.to_string())
}

/// Parse an XML document into a [`Tree`].
///
/// Whitespace is kept verbatim. The XML declaration, processing
/// instructions, the doctype and anything outside the root element are
/// dropped.
pub fn parse(xml: &str) -> Result<Tree, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut tree: Option<Tree> = None;
    let mut stack: Vec<ElementId> = Vec::new();

    loop {
        match reader.read_event().map_err(invalid)? {
            Event::Start(start) => {
                let id = open_element(&mut tree, &stack, &start)?;
                stack.push(id);
            }
            Event::Empty(start) => {
                open_element(&mut tree, &stack, &start)?;
            }
            Event::End(_) => {
                stack
                    .pop()
                    .ok_or_else(|| XmlError::InvalidXml("unexpected closing tag".to_string()))?;
            }
            Event::Text(text) => {
                if let Some(tree) = tree.as_mut()
                    && let Some(&top) = stack.last()
                {
                    tree.push_content(top, &text.unescape().map_err(invalid)?);
                }
            }
            Event::CData(data) => {
                if let Some(tree) = tree.as_mut()
                    && let Some(&top) = stack.last()
                {
                    tree.push_content(top, &String::from_utf8_lossy(&data));
                }
            }
            Event::Comment(comment) => {
                if let Some(tree) = tree.as_mut()
                    && let Some(&top) = stack.last()
                {
                    let id = tree.create_comment(String::from_utf8_lossy(&comment));
                    tree.append_child(top, id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::InvalidXml("unclosed element at end of input".to_string()));
    }
    tree.ok_or(XmlError::MissingRoot)
}

fn open_element(
    tree: &mut Option<Tree>,
    stack: &[ElementId],
    start: &BytesStart,
) -> Result<ElementId, XmlError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrib = Attributes::new();
    for attr in start.attributes() {
        let attr = attr.map_err(invalid)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(invalid)?.into_owned();
        attrib.set(key, value);
    }

    match (tree.as_mut(), stack.last()) {
        (None, _) => {
            let new_tree = Tree::with_root(tag, attrib);
            let root = new_tree.root();
            *tree = Some(new_tree);
            Ok(root)
        }
        (Some(tree), Some(&parent)) => {
            let id = tree.create_element(tag, attrib);
            tree.append_child(parent, id);
            Ok(id)
        }
        (Some(_), None) => Err(XmlError::InvalidXml(
            "more than one root element".to_string(),
        )),
    }
}

/// Write `id` and its content to `out`. Children's tails are written, the
/// element's own tail is not.
pub(crate) fn write_element(tree: &Tree, id: ElementId, out: &mut String) {
    let node = tree.get(id);
    if node.kind == NodeKind::Comment {
        out.push_str("<!--");
        out.push_str(node.text.as_deref().unwrap_or_default());
        out.push_str("-->");
        return;
    }

    out.push('<');
    out.push_str(&node.tag);
    for (key, value) in node.attrib.iter() {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        html_escape::encode_double_quoted_attribute_to_string(value, out);
        out.push('"');
    }
    if node.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    if let Some(text) = &node.text {
        html_escape::encode_text_to_string(text, out);
    }
    for &child in node.children() {
        write_element(tree, child, out);
        if let Some(tail) = &tree.get(child).tail {
            html_escape::encode_text_to_string(tail, out);
        }
    }
    out.push_str("</");
    out.push_str(&node.tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("<p>1 2 3</p>")]
    #[case("<W><text type=\"a\">A <lb/>B C</text></W>")]
    #[case("<p>a<!-- note -->b</p>")]
    #[case("<p>a &amp; b &lt; c</p>")]
    #[case("<TEI><text><body><p>x\n  <hi>y</hi> z</p></body></text></TEI>")]
    fn test_parse_serialize_is_lossless(#[case] xml: &str) {
        let tree = parse(xml).unwrap();
        assert_eq!(tree.to_xml(), xml);
    }

    #[test]
    fn test_parse_text_and_tail() {
        let tree = parse("<p>a<lb/>b<hi>c</hi>d</p>").unwrap();
        let root = tree.get(tree.root());
        assert_eq!(root.text.as_deref(), Some("a"));
        let lb = tree.get(root.children()[0]);
        assert_eq!(lb.tag, "lb");
        assert_eq!(lb.tail.as_deref(), Some("b"));
        let hi = tree.get(root.children()[1]);
        assert_eq!(hi.text.as_deref(), Some("c"));
        assert_eq!(hi.tail.as_deref(), Some("d"));
    }

    #[test]
    fn test_parse_drops_prolog() {
        let tree = parse("<?xml version=\"1.0\"?>\n<p>x</p>\n").unwrap();
        assert_eq!(tree.to_xml(), "<p>x</p>");
    }

    #[test]
    fn test_parse_comment_node() {
        let tree = parse("<p>a<!--b-->c</p>").unwrap();
        let comment = tree.get(tree.get(tree.root()).children()[0]);
        assert!(comment.is_comment());
        assert_eq!(comment.text.as_deref(), Some("b"));
        assert_eq!(comment.tail.as_deref(), Some("c"));
    }

    #[rstest]
    #[case("")]
    #[case("just text")]
    fn test_parse_without_root(#[case] xml: &str) {
        assert!(matches!(parse(xml), Err(XmlError::MissingRoot)));
    }

    #[rstest]
    #[case("<p>")]
    #[case("<p></q>")]
    #[case("<a/><b/>")]
    fn test_parse_rejects_broken_xml(#[case] xml: &str) {
        assert!(matches!(parse(xml), Err(XmlError::InvalidXml(_))));
    }

    #[test]
    fn test_attribute_escaping() {
        let mut tree = Tree::new("p");
        let root = tree.root();
        tree.get_mut(root).attrib.set("n", "a\"b");
        assert_eq!(tree.to_xml(), "<p n=\"a&quot;b\"/>");
    }
}
