//! Types for ELF information and needed-list editing

use std::path::Path;

use crate::error::ElfError;

/// Information read from an ELF file's dynamic table
#[derive(Debug, Clone, Default)]
pub struct ElfInfo {
    /// Whether the file has a dynamic table at all
    pub dynamic: bool,
    /// Number of DT_NEEDED entries
    pub needed_count: usize,
    pub has_rpath: bool,
    pub has_runpath: bool,
}

/// Edits the needed-list of a dynamically linked binary in place
///
/// Implementations must be shareable across threads: the extractor fixes
/// files in parallel with one editor.
pub trait NeededEditor: Sync {
    /// The needed-list, in order
    fn needed(&self, path: &Path) -> Result<Vec<String>, ElfError>;

    /// Overwrite the entry equal to `from` with `to`
    fn replace_needed(&self, path: &Path, from: &str, to: &str) -> Result<(), ElfError>;

    /// Append `name` to the needed-list
    fn add_needed(&self, path: &Path, name: &str) -> Result<(), ElfError>;

    /// Remove the entry equal to `name`
    fn remove_needed(&self, path: &Path, name: &str) -> Result<(), ElfError>;
}
