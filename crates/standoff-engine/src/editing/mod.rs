/*!
 * # Editing
 *
 * Edits are expressed as [`Cmd`]s and applied to a [`Standoff`] document,
 * which answers with a [`Patch`] describing what changed.
 *
 * ## Flow of an edit
 *
 * 1. The command is validated against the position table: positions must
 *    exist, both ends of a span must share one context, and the new element
 *    may not cut through an existing one.
 * 2. The table is updated in place. Rows of enclosed elements move one level
 *    deeper (or shallower, on removal) and the new boundary rows are slotted
 *    into the groups of rows at their positions.
 * 3. The smallest element containing the change is rebuilt from its rows
 *    and spliced into the tree. Rows are re-pointed at the rebuilt nodes.
 *
 * Step 3 can be deferred with lazy commands or a [`Batch`]; until then the
 * table is authoritative and the tree is stale.
 *
 * ## Module Structure
 *
 * - **`standoff`**: the [`Standoff`] document and its queries
 * - **`commands`**: [`Cmd`] and the [`Inline`] builder
 * - **`batch`**: the [`Batch`] guard
 * - **`patch`**: edit results
 */

pub mod batch;
pub mod commands;
pub mod patch;
pub mod standoff;

pub use batch::Batch;
pub use commands::{Cmd, Inline};
pub use patch::Patch;
pub use standoff::{Authority, Standoff};
