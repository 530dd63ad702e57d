//! Module configuration files
//!
//! A module can be described in TOML instead of code:
//!
//! ```toml
//! provided_libs = ["libcrypto_shim.so"]
//!
//! [module]
//! device = "sm8250-common"
//! vendor = "sony"
//! check_elf = true
//! namespace_imports = ["hardware/sony"]
//!
//! [[lib_fixups]]
//! name = "libs_v32"
//! fixup = "strip_suffix"
//! suffix = "-v32"
//! libs = ["libutils-v32"]
//!
//! [[blob_fixups]]
//! files = ["vendor/etc/seccomp_policy/atfwd@2.0.policy"]
//! ops = [{ op = "call", callback = "add_gettid" }]
//! ```
//!
//! Callbacks are referenced by name and must be built in.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::blob_fixup::builtin_callback;
use crate::blob_fixup::BlobFixup;
use crate::blob_fixup::BlobFixupOp;
use crate::blob_fixup::BlobFixupRule;
use crate::error::ConfigError;
use crate::error::FixupError;
use crate::lib_fixup::LibFixup;
use crate::lib_fixup::LibFixupRule;
use crate::module::ExtractModule;

/// Top-level configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Module identity and settings; optional for namespace import files
    pub module: Option<ModuleSection>,

    /// Libraries the target build provides, on top of the defaults
    pub provided_libs: Vec<String>,

    pub lib_fixups: Vec<LibFixupEntry>,

    pub blob_fixups: Vec<BlobFixupEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleSection {
    pub device: String,
    pub vendor: String,
    #[serde(default)]
    pub check_elf: bool,
    #[serde(default)]
    pub namespace_imports: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibFixupEntry {
    pub name: Option<String>,
    pub libs: Vec<String>,
    #[serde(flatten)]
    pub fixup: LibFixupKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "fixup", rename_all = "snake_case")]
pub enum LibFixupKind {
    VendorSuffix,
    VendorCompat,
    Remove,
    StripSuffix { suffix: String },
    Rename { target: String },
}

impl From<LibFixupKind> for LibFixup {
    fn from(kind: LibFixupKind) -> Self {
        match kind {
            LibFixupKind::VendorSuffix => LibFixup::VendorSuffix,
            LibFixupKind::VendorCompat => LibFixup::VendorCompat,
            LibFixupKind::Remove => LibFixup::Remove,
            LibFixupKind::StripSuffix { suffix } => LibFixup::StripSuffix(suffix),
            LibFixupKind::Rename { target } => LibFixup::Rename(target),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobFixupEntry {
    pub name: Option<String>,
    pub files: Vec<String>,
    pub ops: Vec<BlobOpEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BlobOpEntry {
    ReplaceNeeded { from: String, to: String },
    AddNeeded { name: String },
    RemoveNeeded { name: String },
    AddLineIfMissing { line: String },
    Call { callback: String },
}

impl BlobOpEntry {
    fn into_op(self) -> Result<BlobFixupOp, ConfigError> {
        Ok(match self {
            BlobOpEntry::ReplaceNeeded { from, to } => BlobFixupOp::ReplaceNeeded { from, to },
            BlobOpEntry::AddNeeded { name } => BlobFixupOp::AddNeeded(name),
            BlobOpEntry::RemoveNeeded { name } => BlobFixupOp::RemoveNeeded(name),
            BlobOpEntry::AddLineIfMissing { line } => BlobFixupOp::AddLineIfMissing(line),
            BlobOpEntry::Call { callback } => {
                let func = builtin_callback(&callback)
                    .ok_or_else(|| ConfigError::UnknownCallback(callback.clone()))?;
                BlobFixupOp::Call {
                    name: callback,
                    callback: func,
                }
            }
        })
    }
}

impl ModuleConfig {
    pub fn provided_libs(&self) -> &[String] {
        &self.provided_libs
    }

    /// Convert the rule entries; unnamed rules are named `<prefix>#<index>`
    pub fn into_rules(
        self,
        prefix: &str,
    ) -> Result<(Vec<LibFixupRule>, Vec<BlobFixupRule>), ConfigError> {
        let qualify = |name: Option<String>, kind: &str, i: usize| match (prefix.is_empty(), name) {
            (true, Some(name)) => name,
            (true, None) => format!("{kind}#{i}"),
            (false, Some(name)) => format!("{prefix}:{name}"),
            (false, None) => format!("{prefix}:{kind}#{i}"),
        };

        let lib_rules = self
            .lib_fixups
            .into_iter()
            .enumerate()
            .map(|(i, entry)| LibFixupRule {
                name: qualify(entry.name, "lib", i),
                libs: entry.libs,
                fixup: entry.fixup.into(),
            })
            .collect();

        let mut blob_rules = Vec::with_capacity(self.blob_fixups.len());
        for (i, entry) in self.blob_fixups.into_iter().enumerate() {
            let mut fixup = BlobFixup::new();
            for op in entry.ops {
                fixup = fixup.op(op.into_op()?);
            }
            blob_rules.push(BlobFixupRule {
                name: qualify(entry.name, "blob", i),
                paths: entry.files,
                fixup,
            });
        }

        Ok((lib_rules, blob_rules))
    }

    /// Build a module; requires the `[module]` section
    pub fn into_module(self) -> Result<ExtractModule, ConfigError> {
        let section = self
            .module
            .clone()
            .ok_or_else(|| ConfigError::Parse("missing [module] section".to_string()))?;
        let provided = self.provided_libs.clone();
        let (lib_rules, blob_rules) = self.into_rules("")?;

        ExtractModule::builder(section.device, section.vendor)
            .namespace_imports(section.namespace_imports)
            .lib_fixups(lib_rules)
            .blob_fixups(blob_rules)
            .provided_libs(provided)
            .check_elf(section.check_elf)
            .build()
    }
}

/// Parse a configuration file from a string
pub fn parse_module_config(contents: &str) -> Result<ModuleConfig, ConfigError> {
    toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Load and parse a configuration file
pub fn load_module_config(path: &Path) -> Result<ModuleConfig, FixupError> {
    let contents = fs::read_to_string(path).map_err(|source| FixupError::File {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded module config");
    Ok(parse_module_config(&contents)?)
}

/// Load a configuration file and build its module
pub fn load_module(path: &Path) -> Result<ExtractModule, FixupError> {
    Ok(load_module_config(path)?.into_module()?)
}
