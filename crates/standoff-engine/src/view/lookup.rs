use crate::error::{Result, StandoffError};

/// Maps character offsets of a view's output back into the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseLookup {
    pub(super) table_indices: Vec<usize>,
    pub(super) positions: Vec<usize>,
    pub(super) end: usize,
}

impl ReverseLookup {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Row of the position table that produced output character `i`.
    pub fn get_table_index(&self, i: usize) -> Result<usize> {
        self.table_indices
            .get(i)
            .copied()
            .ok_or(StandoffError::PositionNotFound { pos: i, len: self.len() })
    }

    /// Document position of output character `i`. `i == len()` maps to the
    /// position just past the last output character, so output ranges can be
    /// translated end-exclusively.
    pub fn get_pos(&self, i: usize) -> Result<usize> {
        if i == self.len() {
            return Ok(self.end);
        }
        self.positions
            .get(i)
            .copied()
            .ok_or(StandoffError::PositionNotFound { pos: i, len: self.len() })
    }
}
