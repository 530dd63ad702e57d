//! ELF boundary: needed-list editing through an external tool, and validation

mod check;
mod editor;
mod types;

pub use check::inspect_elf;
pub use check::is_elf;
pub use editor::PatchelfEditor;
pub use editor::parse_print_needed;
pub use types::ElfInfo;
pub use types::NeededEditor;
