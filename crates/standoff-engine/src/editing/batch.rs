use std::ops::{Deref, DerefMut};

use super::Standoff;
use crate::error::Result;

/// Groups edits so the tree is rebuilt once, when the batch ends.
///
/// Dropping the guard commits. Use [`Batch::commit`] to see the result of
/// the final rebuild.
pub struct Batch<'a> {
    standoff: &'a mut Standoff,
    committed: bool,
}

impl<'a> Batch<'a> {
    pub(crate) fn new(standoff: &'a mut Standoff) -> Self {
        standoff.begin_batch();
        Self {
            standoff,
            committed: false,
        }
    }

    pub fn commit(mut self) -> Result<()> {
        self.committed = true;
        self.standoff.commit()
    }
}

impl Deref for Batch<'_> {
    type Target = Standoff;

    fn deref(&self) -> &Standoff {
        self.standoff
    }
}

impl DerefMut for Batch<'_> {
    fn deref_mut(&mut self) -> &mut Standoff {
        self.standoff
    }
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        if !self.committed
            && let Err(err) = self.standoff.commit()
        {
            log::warn!("committing batch on drop failed: {err}");
        }
    }
}
