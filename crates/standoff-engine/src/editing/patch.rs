use crate::tree::ElementId;

/// Result of applying a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    /// Elements created by the command, as they appear in the tree.
    pub added: Vec<ElementId>,
    pub removed: Vec<ElementId>,
    pub version: u64,
}

impl Patch {
    /// A command that changed nothing, e.g. a suppressed duplicate.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}
