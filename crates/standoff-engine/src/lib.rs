pub mod annotation;
pub mod builder;
pub mod editing;
pub mod error;
pub mod io;
pub mod render;
pub mod table;
pub mod tree;
pub mod view;

// Re-export key types for easier usage
pub use annotation::PositionedAnnotation;
pub use editing::{Authority, Batch, Cmd, Inline, Patch, Standoff};
pub use error::StandoffError;
pub use io::IoError;
pub use table::{Context, PositionTable, Row, RowKind, collapse::Collapsed};
pub use tree::{Attributes, ElementId, Tree};
pub use view::{ReverseLookup, RowSelector, View};
