//! extract-fixups: library name and blob fixups for vendor blob extraction
//!
//! Proprietary blobs copied out of a donor device image rarely link as-is
//! against the target build. This crate holds the rules that correct them:
//! library name fixups (rename, partition suffix, removal) applied to
//! dependency lists, and blob fixups (needed-list edits and free-form
//! callbacks) applied to the extracted files themselves.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use extract_fixups::{sm8250_common, ExtractOptions, Extractor, Partition, PatchelfEditor};
//!
//! let module = sm8250_common().unwrap();
//!
//! // Resolve a library name for the vendor partition
//! let result = module
//!     .lib_fixups()
//!     .resolve("com.qualcomm.qti.dpm.api@1.0", Partition::Vendor);
//! println!("{:?}", result);
//!
//! // Apply blob fixups to an extracted tree
//! let editor = PatchelfEditor::default();
//! let extractor = Extractor::new(&module, &editor, ExtractOptions::default());
//! let files = extract_fixups::enumerate_tree(Path::new("out")).unwrap();
//! let report = extractor.run(None, Path::new("out"), &files).unwrap();
//! assert!(report.is_success(false));
//! ```

pub mod blob_fixup;
pub mod config;
pub mod elf;
pub mod error;
pub mod extract;
pub mod lib_fixup;
pub mod module;
pub mod partition;

#[cfg(feature = "python")]
mod python;

#[cfg(test)]
mod testing;

pub use blob_fixup::BlobFixup;
pub use blob_fixup::BlobFixupCtx;
pub use blob_fixup::BlobFixupOp;
pub use blob_fixup::BlobFixupRule;
pub use blob_fixup::BlobFixupTable;
pub use blob_fixup::add_gettid;
pub use blob_fixup::apply_blob_fixup;
pub use config::load_module;
pub use config::parse_module_config;
pub use elf::NeededEditor;
pub use elf::PatchelfEditor;
pub use error::CheckIssue;
pub use error::CheckResult;
pub use error::ConfigError;
pub use error::ElfError;
pub use error::FixupError;
pub use extract::BlobEntry;
pub use extract::ExtractOptions;
pub use extract::ExtractReport;
pub use extract::Extractor;
pub use extract::FileOutcome;
pub use extract::enumerate_tree;
pub use extract::parse_file_list;
pub use lib_fixup::LibFixup;
pub use lib_fixup::LibFixupResult;
pub use lib_fixup::LibFixupRule;
pub use lib_fixup::LibFixupTable;
pub use module::ExtractModule;
pub use module::sm8250_common;
pub use partition::Partition;

/// Resolve a library name against the built-in sm8250-common module using
/// the `None` / `""` / name convention of Python extraction frameworks
pub fn resolve_lib(lib: &str, partition: &str) -> Result<Option<String>, ConfigError> {
    let partition: Partition = partition.parse()?;
    let module = sm8250_common()?;
    Ok(module.lib_fixups().resolve(lib, partition).into_raw())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::testing::ListEditor;

    const CAMERA: &str = "vendor/lib64/vendor.somc.camera.device@3.4-impl.so";
    const POLICY: &str = "vendor/etc/seccomp_policy/atfwd@2.0.policy";

    fn create_test_tree(dir: &std::path::Path) {
        let lib64 = dir.join("vendor/lib64");
        fs::create_dir_all(&lib64).unwrap();
        fs::create_dir_all(dir.join("vendor/etc/seccomp_policy")).unwrap();

        ListEditor::write(
            &dir.join(CAMERA),
            &["libutils.so", "libhidlbase.so", "libbinder.so", "libc.so"],
        );
        ListEditor::write(&lib64.join("libiVptApi.so"), &["libc.so"]);
        fs::write(dir.join(POLICY), "read: 1\nwrite: 1\n").unwrap();
    }

    #[test]
    fn test_resolve_lib() {
        assert_eq!(
            resolve_lib("com.qualcomm.qti.dpm.api@1.0", "vendor").unwrap(),
            Some("com.qualcomm.qti.dpm.api@1.0_vendor".to_string())
        );
        assert_eq!(resolve_lib("com.qualcomm.qti.dpm.api@1.0", "system").unwrap(), None);
        assert_eq!(resolve_lib("libOmxCore", "product").unwrap(), Some(String::new()));
        assert_eq!(resolve_lib("libfoo", "odm").unwrap(), None);
        assert!(resolve_lib("libfoo", "recovery").is_err());
    }

    #[test]
    fn test_sm8250_tree() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tree(temp_dir.path());

        let module = sm8250_common().unwrap();
        let extractor = Extractor::new(
            &module,
            &ListEditor,
            ExtractOptions {
                check_elf: Some(false),
                ..Default::default()
            },
        );
        let files = enumerate_tree(temp_dir.path()).unwrap();
        let report = extractor.run(None, temp_dir.path(), &files).unwrap();

        assert!(report.is_success(false));
        assert_eq!(report.fixed().count(), 3);
        assert_eq!(
            ListEditor::read(&temp_dir.path().join(CAMERA)),
            vec!["libutils-v32.so", "libhidlbase-v32.so", "libbinder-v32.so", "libc.so"]
        );
        assert_eq!(
            ListEditor::read(&temp_dir.path().join("vendor/lib64/libiVptApi.so")),
            vec!["libc.so", "libiVptLibC.so"]
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join(POLICY)).unwrap(),
            "read: 1\nwrite: 1\ngettid: 1\n"
        );

        // A second pass over the fixed tree changes nothing but the
        // replace_needed rules, whose targets are gone now
        let report = extractor.run(None, temp_dir.path(), &files).unwrap();
        assert_eq!(report.failures().count(), 1);
        assert_eq!(
            fs::read_to_string(temp_dir.path().join(POLICY)).unwrap(),
            "read: 1\nwrite: 1\ngettid: 1\n"
        );
    }
}
