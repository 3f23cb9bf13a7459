use crate::tree::ElementId;

/// Failures raised by the standoff engine.
///
/// Every failing edit leaves the position table and the tree exactly as they
/// were before the edit started.
#[derive(Debug, thiserror::Error)]
pub enum StandoffError {
    #[error("position {pos} is outside the text (length {len})")]
    PositionNotFound { pos: usize, len: usize },
    #[error("span {begin}..{end} does not sit inside a single element")]
    AmbiguousContext { begin: usize, end: usize },
    #[error("malformed position table: {0}")]
    MalformedTable(String),
    #[error("element {0} is not part of the position table")]
    NotFound(ElementId),
    #[error("no element named `{0}`")]
    TagNotFound(String),
    #[error("unknown row field `{0}`")]
    InvalidField(String),
    #[error("slot {slot} is out of range ({available} slots available)")]
    InvalidSlot { slot: usize, available: usize },
    #[error("depth {depth} is out of range (1..={max})")]
    InvalidDepth { depth: usize, max: usize },
    #[error("the text root cannot be removed")]
    RootRemoval,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = StandoffError> = std::result::Result<T, E>;
