//! Extraction module: the immutable configuration handed to the extractor

mod sm8250;

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;
use tracing::warn;

use crate::blob_fixup::BlobFixupRule;
use crate::blob_fixup::BlobFixupTable;
use crate::config;
use crate::error::CheckIssue;
use crate::error::ConfigError;
use crate::error::FixupError;
use crate::lib_fixup::LibFixupRule;
use crate::lib_fixup::LibFixupTable;

pub use sm8250::sm8250_common;

/// File a namespace import may carry to share its rules
pub const NAMESPACE_CONFIG_FILE: &str = "extract-fixups.toml";

/// Libraries every target build provides; needed entries on these are never
/// reported as unresolved by the ELF check.
pub const DEFAULT_PROVIDED_LIBS: &[&str] = &[
    "libc.so",
    "libm.so",
    "libdl.so",
    "liblog.so",
    "libc++.so",
    "libz.so",
    "libcutils.so",
    "libutils.so",
    "libbase.so",
    "libbinder.so",
    "libbinder_ndk.so",
    "libhidlbase.so",
    "libhardware.so",
    "libcrypto.so",
    "libssl.so",
    "libsync.so",
    "libui.so",
    "libion.so",
    "libvndksupport.so",
    "libprotobuf-cpp-lite.so",
    "libprotobuf-cpp-full.so",
];

/// Device configuration: rule tables plus module settings
#[derive(Debug, Clone)]
pub struct ExtractModule {
    device: String,
    vendor: String,
    namespace_imports: Vec<String>,
    lib_fixups: LibFixupTable,
    blob_fixups: BlobFixupTable,
    check_elf: bool,
    provided_libs: BTreeSet<String>,
}

impl ExtractModule {
    pub fn builder(device: impl Into<String>, vendor: impl Into<String>) -> ExtractModuleBuilder {
        ExtractModuleBuilder {
            device: device.into(),
            vendor: vendor.into(),
            namespace_imports: Vec::new(),
            lib_fixups: Vec::new(),
            blob_fixups: Vec::new(),
            check_elf: false,
            provided_libs: DEFAULT_PROVIDED_LIBS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn namespace_imports(&self) -> &[String] {
        &self.namespace_imports
    }

    pub fn lib_fixups(&self) -> &LibFixupTable {
        &self.lib_fixups
    }

    pub fn blob_fixups(&self) -> &BlobFixupTable {
        &self.blob_fixups
    }

    pub fn check_elf(&self) -> bool {
        self.check_elf
    }

    /// Whether a needed entry is supplied by the target build itself
    pub fn provides(&self, lib: &str) -> bool {
        self.provided_libs.contains(lib)
    }

    /// Return a copy with the rules of every namespace import merged in
    ///
    /// Imports are directories relative to `android_root`. An import carrying
    /// an `extract-fixups.toml` contributes its rules after the module's own,
    /// with the usual overlap checks. A missing import directory is an error
    /// when `strict`, otherwise it is returned as an issue.
    pub fn with_namespace_imports(
        &self,
        android_root: &Path,
        strict: bool,
    ) -> Result<(Self, Vec<CheckIssue>), FixupError> {
        let mut merged = self.clone();
        let mut issues = Vec::new();

        for import in &self.namespace_imports {
            let dir = android_root.join(import);
            if !dir.is_dir() {
                if strict {
                    return Err(FixupError::MissingFile(import.clone()));
                }
                warn!(import = %import, "namespace import not found");
                issues.push(CheckIssue::MissingNamespace {
                    import: import.clone(),
                });
                continue;
            }

            let config_path = dir.join(NAMESPACE_CONFIG_FILE);
            if !config_path.is_file() {
                continue;
            }
            debug!(path = %config_path.display(), "merging namespace rules");
            let imported = config::load_module_config(&config_path)?;
            merged
                .provided_libs
                .extend(imported.provided_libs().iter().cloned());
            let (lib_rules, blob_rules) = imported.into_rules(import)?;
            merged.lib_fixups.extend(lib_rules)?;
            merged.blob_fixups.extend(blob_rules)?;
        }

        Ok((merged, issues))
    }
}

/// Collects module settings; [`build`](Self::build) validates the rule tables
#[derive(Debug, Clone)]
pub struct ExtractModuleBuilder {
    device: String,
    vendor: String,
    namespace_imports: Vec<String>,
    lib_fixups: Vec<LibFixupRule>,
    blob_fixups: Vec<BlobFixupRule>,
    check_elf: bool,
    provided_libs: BTreeSet<String>,
}

impl ExtractModuleBuilder {
    pub fn namespace_imports<S: Into<String>>(mut self, imports: impl IntoIterator<Item = S>) -> Self {
        self.namespace_imports.extend(imports.into_iter().map(Into::into));
        self
    }

    pub fn lib_fixup(mut self, rule: LibFixupRule) -> Self {
        self.lib_fixups.push(rule);
        self
    }

    pub fn lib_fixups(mut self, rules: impl IntoIterator<Item = LibFixupRule>) -> Self {
        self.lib_fixups.extend(rules);
        self
    }

    pub fn blob_fixup(mut self, rule: BlobFixupRule) -> Self {
        self.blob_fixups.push(rule);
        self
    }

    pub fn blob_fixups(mut self, rules: impl IntoIterator<Item = BlobFixupRule>) -> Self {
        self.blob_fixups.extend(rules);
        self
    }

    pub fn check_elf(mut self, check_elf: bool) -> Self {
        self.check_elf = check_elf;
        self
    }

    /// Add libraries the target build provides besides the defaults
    pub fn provided_libs<S: Into<String>>(mut self, libs: impl IntoIterator<Item = S>) -> Self {
        self.provided_libs.extend(libs.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<ExtractModule, ConfigError> {
        Ok(ExtractModule {
            device: self.device,
            vendor: self.vendor,
            namespace_imports: self.namespace_imports,
            lib_fixups: LibFixupTable::new(self.lib_fixups)?,
            blob_fixups: BlobFixupTable::new(self.blob_fixups)?,
            check_elf: self.check_elf,
            provided_libs: self.provided_libs,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::blob_fixup::BlobFixup;
    use crate::lib_fixup::LibFixup;
    use crate::lib_fixup::LibFixupResult;
    use crate::partition::Partition;

    fn module() -> ExtractModule {
        ExtractModule::builder("sm8250-common", "sony")
            .namespace_imports(["hardware/sony", "hardware/qcom-caf/sm8250"])
            .lib_fixup(LibFixupRule::new("libs_remove", ["libril"], LibFixup::Remove))
            .blob_fixup(BlobFixupRule::new(
                "#0",
                ["vendor/lib/libfoo.so"],
                BlobFixup::new().add_needed("libbar.so"),
            ))
            .check_elf(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_rejects_overlap() {
        let err = ExtractModule::builder("d", "v")
            .lib_fixup(LibFixupRule::new("a", ["libfoo"], LibFixup::Remove))
            .lib_fixup(LibFixupRule::new("b", ["libfoo"], LibFixup::Remove))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::OverlappingLibRule { .. }));
    }

    #[test]
    fn test_missing_import_lenient_and_strict() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("hardware/sony")).unwrap();

        let (merged, issues) = module().with_namespace_imports(root.path(), false).unwrap();
        assert_eq!(
            issues,
            vec![CheckIssue::MissingNamespace {
                import: "hardware/qcom-caf/sm8250".to_string()
            }]
        );
        assert_eq!(merged.lib_fixups().len(), 1);

        let err = module().with_namespace_imports(root.path(), true).unwrap_err();
        assert!(matches!(err, FixupError::MissingFile(_)));
    }

    #[test]
    fn test_import_rules_merged() {
        let root = TempDir::new().unwrap();
        let sony = root.path().join("hardware/sony");
        std::fs::create_dir_all(&sony).unwrap();
        std::fs::create_dir_all(root.path().join("hardware/qcom-caf/sm8250")).unwrap();
        std::fs::write(
            sony.join(NAMESPACE_CONFIG_FILE),
            r#"
provided_libs = ["libsonyhal.so"]

[[lib_fixups]]
name = "libs_sony"
fixup = "vendor_suffix"
libs = ["vendor.somc.hardware.foo@1.0"]
"#,
        )
        .unwrap();

        let (merged, issues) = module().with_namespace_imports(root.path(), true).unwrap();
        assert!(issues.is_empty());
        assert_eq!(
            merged
                .lib_fixups()
                .resolve("vendor.somc.hardware.foo@1.0", Partition::Vendor),
            LibFixupResult::Rename("vendor.somc.hardware.foo@1.0_vendor".to_string())
        );
        assert!(merged.provides("libsonyhal.so"));
        assert!(!module().provides("libsonyhal.so"));
    }

    #[test]
    fn test_import_overlap_is_error() {
        let root = TempDir::new().unwrap();
        let sony = root.path().join("hardware/sony");
        std::fs::create_dir_all(&sony).unwrap();
        std::fs::write(
            sony.join(NAMESPACE_CONFIG_FILE),
            r#"
[[lib_fixups]]
name = "libs_again"
fixup = "remove"
libs = ["libril"]
"#,
        )
        .unwrap();

        let err = module().with_namespace_imports(root.path(), false).unwrap_err();
        assert!(matches!(
            err,
            FixupError::Config(ConfigError::OverlappingLibRule { .. })
        ));
    }
}
