//! Library name fixups applied to dependency lists

mod table;
mod types;

pub use table::LibFixupTable;
pub use types::LibFixup;
pub use types::LibFixupFn;
pub use types::LibFixupResult;
pub use types::LibFixupRule;
