//! Extraction driver: copy blobs, apply fixups, check the result
//!
//! Files are independent, so each one is handled on its own rayon task. The
//! module and editor are shared read-only.

mod files;

use std::collections::BTreeSet;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::blob_fixup::apply_blob_fixup;
use crate::blob_fixup::AppliedFixup;
use crate::blob_fixup::BlobFixupCtx;
use crate::elf::inspect_elf;
use crate::elf::is_elf;
use crate::elf::NeededEditor;
use crate::error::CheckIssue;
use crate::error::CheckResult;
use crate::error::FixupError;
use crate::lib_fixup::LibFixupResult;
use crate::module::ExtractModule;
use crate::partition::Partition;

pub use files::enumerate_tree;
pub use files::parse_file_list;
pub use files::BlobEntry;

/// Run settings that are not part of the module
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Treat missing files as failures instead of warnings
    pub strict: bool,
    /// Override the module's `check_elf` setting
    pub check_elf: Option<bool>,
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// No rule matched
    Unchanged,
    Fixed(AppliedFixup),
    Missing,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: String,
    pub outcome: FileOutcome,
    /// Fixed-up module names of the file's needed-list, for checked ELF files
    pub shared_libs: Vec<String>,
}

/// Result of an extraction run
#[derive(Debug, Default)]
pub struct ExtractReport {
    pub files: Vec<FileReport>,
    pub check: CheckResult,
}

impl ExtractReport {
    pub fn fixed(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Fixed(_)))
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed(_)))
    }

    pub fn missing(&self) -> impl Iterator<Item = &FileReport> {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Missing))
    }

    /// Whether the run should be considered successful
    pub fn is_success(&self, strict: bool) -> bool {
        self.failures().next().is_none()
            && (!strict || (self.missing().next().is_none() && self.check.is_clean()))
    }
}

/// Applies a module to an output tree
pub struct Extractor<'a, E: NeededEditor + ?Sized> {
    module: &'a ExtractModule,
    editor: &'a E,
    options: ExtractOptions,
}

impl<'a, E: NeededEditor + ?Sized> Extractor<'a, E> {
    pub fn new(module: &'a ExtractModule, editor: &'a E, options: ExtractOptions) -> Self {
        Self {
            module,
            editor,
            options,
        }
    }

    fn check_elf(&self) -> bool {
        self.options.check_elf.unwrap_or(self.module.check_elf())
    }

    /// Process `entries` into `output_root`
    ///
    /// With a `source_root` each blob is first copied from the donor tree;
    /// without one the blobs must already be in the output tree.
    pub fn run(
        &self,
        source_root: Option<&Path>,
        output_root: &Path,
        entries: &[BlobEntry],
    ) -> Result<ExtractReport, FixupError> {
        info!(
            device = self.module.device(),
            vendor = self.module.vendor(),
            files = entries.len(),
            "extracting"
        );

        // One task per target file; later entries for the same destination lose
        let mut seen = HashSet::new();
        let entries: Vec<&BlobEntry> = entries
            .iter()
            .filter(|entry| {
                let first = seen.insert(entry.dest.as_str());
                if !first {
                    warn!(file = %entry.dest, source = %entry.source, "duplicate destination skipped");
                }
                first
            })
            .collect();

        let mut files: Vec<FileReport> = entries
            .par_iter()
            .map(|&entry| self.process(source_root, output_root, entry))
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let mut report = ExtractReport {
            files,
            check: CheckResult::default(),
        };

        let missing: Vec<CheckIssue> = report
            .missing()
            .map(|f| {
                warn!(file = %f.path, "missing");
                CheckIssue::MissingFile {
                    path: f.path.clone(),
                }
            })
            .collect();
        report.check.issues.extend(missing);

        for path in self.module.blob_fixups().paths() {
            if !seen.contains(path) {
                warn!(file = path, "blob fixup target was not extracted");
                report.check.issues.push(CheckIssue::UnusedBlobRule {
                    path: path.to_string(),
                });
            }
        }

        if self.check_elf() {
            let issues = self.check_tree(output_root, &mut report.files);
            report.check.issues.extend(issues);
        }

        let failures = report.failures().count();
        info!(
            fixed = report.fixed().count(),
            failures,
            issues = report.check.issues.len(),
            "done"
        );

        if self.options.strict {
            if let Some(first) = report.missing().next() {
                return Err(FixupError::MissingFile(first.path.clone()));
            }
        }

        Ok(report)
    }

    fn process(&self, source_root: Option<&Path>, output_root: &Path, entry: &BlobEntry) -> FileReport {
        let outcome = match self.process_file(source_root, output_root, entry) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(file = %entry.dest, "{}", e);
                FileOutcome::Failed(e.to_string())
            }
        };
        FileReport {
            path: entry.dest.clone(),
            outcome,
            shared_libs: Vec::new(),
        }
    }

    fn process_file(
        &self,
        source_root: Option<&Path>,
        output_root: &Path,
        entry: &BlobEntry,
    ) -> Result<FileOutcome, FixupError> {
        let target = output_root.join(&entry.dest);

        if let Some(source_root) = source_root {
            let source = source_root.join(&entry.source);
            if !source.is_file() {
                return Ok(FileOutcome::Missing);
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| FixupError::File {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
            fs::copy(&source, &target).map_err(|e| FixupError::File {
                path: target.clone(),
                source: e,
            })?;
            debug!(file = %entry.dest, "copied");
        } else if !target.is_file() {
            return Ok(FileOutcome::Missing);
        }

        let Some(rule) = self.module.blob_fixups().find(&entry.dest) else {
            return Ok(FileOutcome::Unchanged);
        };

        let ctx = BlobFixupCtx {
            device: self.module.device(),
            vendor: self.module.vendor(),
            rel_path: &entry.dest,
            partition: Partition::from_path(&entry.dest),
        };
        let applied = apply_blob_fixup(rule, &ctx, self.editor, &target)?;
        Ok(FileOutcome::Fixed(applied))
    }

    /// Validate every present ELF and resolve its needed-list
    fn check_tree(&self, output_root: &Path, files: &mut [FileReport]) -> Vec<CheckIssue> {
        let available: BTreeSet<String> = files
            .iter()
            .filter(|f| !matches!(f.outcome, FileOutcome::Missing))
            .filter_map(|f| f.path.rsplit('/').next().map(str::to_string))
            .collect();

        files
            .par_iter_mut()
            .filter(|f| !matches!(f.outcome, FileOutcome::Missing | FileOutcome::Failed(_)))
            .flat_map_iter(|file| self.check_file(output_root, &available, file))
            .collect()
    }

    fn check_file(
        &self,
        output_root: &Path,
        available: &BTreeSet<String>,
        file: &mut FileReport,
    ) -> Vec<CheckIssue> {
        let path = output_root.join(&file.path);
        match is_elf(&path) {
            Ok(true) => {}
            Ok(false) => return Vec::new(),
            Err(e) => {
                return vec![CheckIssue::InvalidElf {
                    path: file.path.clone(),
                    reason: e.to_string(),
                }]
            }
        }

        match inspect_elf(&path) {
            Ok(info) => debug!(
                file = %file.path,
                dynamic = info.dynamic,
                needed = info.needed_count,
                rpath = info.has_rpath || info.has_runpath,
                "checked ELF"
            ),
            Err(e) => {
                return vec![CheckIssue::InvalidElf {
                    path: file.path.clone(),
                    reason: e.to_string(),
                }]
            }
        }

        let needed = match self.editor.needed(&path) {
            Ok(needed) => needed,
            Err(e) => {
                return vec![CheckIssue::InvalidElf {
                    path: file.path.clone(),
                    reason: e.to_string(),
                }]
            }
        };

        if let Some(partition) = Partition::from_path(&file.path) {
            file.shared_libs = self.module.lib_fixups().shared_libs(&needed, partition);
        }

        self.unresolved_needed(&file.path, &needed, available)
    }

    /// Needed entries that nothing satisfies once the library fixups for the
    /// file's partition are applied
    ///
    /// Removed libraries are skipped. A renamed entry is satisfied by either
    /// its fixed-up or its original name, in the tree or in the provided set.
    fn unresolved_needed(
        &self,
        rel_path: &str,
        needed: &[String],
        available: &BTreeSet<String>,
    ) -> Vec<CheckIssue> {
        let partition = Partition::from_path(rel_path);
        let mut issues = Vec::new();

        for lib in needed {
            let resolved = match partition {
                Some(partition) => {
                    let base = lib.strip_suffix(".so");
                    match self.module.lib_fixups().resolve(base.unwrap_or(lib), partition) {
                        LibFixupResult::Remove => continue,
                        LibFixupResult::Unchanged => lib.clone(),
                        LibFixupResult::Rename(name) if base.is_some() => format!("{name}.so"),
                        LibFixupResult::Rename(name) => name,
                    }
                }
                None => lib.clone(),
            };

            let satisfied = |name: &str| available.contains(name) || self.module.provides(name);
            if satisfied(&resolved) || satisfied(lib) {
                continue;
            }
            issues.push(CheckIssue::UnresolvedNeeded {
                path: rel_path.to_string(),
                lib: resolved,
            });
        }

        issues
    }
}
