use serde::{Deserialize, Serialize};

use crate::tree::Attributes;

/// One element expressed as a character range over the plain text.
///
/// `begin == end` marks a point annotation (an empty element). A comment
/// is carried as an annotation over its text with `comment` set and an
/// empty tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedAnnotation {
    pub tag: String,
    #[serde(default)]
    pub attrib: Attributes,
    pub begin: usize,
    pub end: usize,
    pub depth: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub comment: bool,
}

impl PositionedAnnotation {
    pub fn new(begin: usize, end: usize, tag: impl Into<String>, depth: usize) -> Self {
        Self {
            tag: tag.into(),
            attrib: Attributes::new(),
            begin,
            end,
            depth,
            comment: false,
        }
    }

    /// A comment over `begin..end`.
    pub fn comment(begin: usize, end: usize, depth: usize) -> Self {
        Self {
            comment: true,
            ..Self::new(begin, end, "", depth)
        }
    }

    pub fn with_attrib(mut self, attrib: Attributes) -> Self {
        self.attrib = attrib;
        self
    }

    pub fn width(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_point(&self) -> bool {
        self.begin == self.end
    }

    /// Same range, tag and attributes. Depth is not compared.
    pub fn describes(&self, begin: usize, end: usize, tag: &str, attrib: &Attributes) -> bool {
        !self.comment
            && self.begin == begin
            && self.end == end
            && self.tag == tag
            && self.attrib == *attrib
    }
}

/// Serialize annotations as a JSON array.
pub fn to_json(annotations: &[PositionedAnnotation]) -> serde_json::Result<String> {
    serde_json::to_string(annotations)
}

pub fn from_json(json: &str) -> serde_json::Result<Vec<PositionedAnnotation>> {
    serde_json::from_str(json)
}
