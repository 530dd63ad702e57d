//! Path-keyed blob fixups applied to extracted files

mod apply;
mod callbacks;
mod table;
mod types;

pub use apply::apply_blob_fixup;
pub use apply::AppliedFixup;
pub use callbacks::add_gettid;
pub use callbacks::append_line_unless;
pub use callbacks::builtin_callback;
pub use table::BlobFixupRule;
pub use table::BlobFixupTable;
pub use types::BlobFixup;
pub use types::BlobFixupCallback;
pub use types::BlobFixupCtx;
pub use types::BlobFixupOp;
