//! Types for blob fixups

use std::fmt;
use std::path::Path;

use crate::error::FixupError;
use crate::partition::Partition;

/// What a callback knows about the file it is fixing
#[derive(Debug, Clone, Copy)]
pub struct BlobFixupCtx<'a> {
    pub device: &'a str,
    pub vendor: &'a str,
    /// Path relative to the output root, e.g. `vendor/lib64/libfoo.so`
    pub rel_path: &'a str,
    pub partition: Option<Partition>,
}

/// Free-form edit of the working copy at the given path
pub type BlobFixupCallback = fn(&BlobFixupCtx<'_>, &Path) -> Result<(), FixupError>;

/// One step of a blob fixup
#[derive(Debug, Clone)]
pub enum BlobFixupOp {
    /// Overwrite the needed entry `from` with `to`; `from` must be present
    ReplaceNeeded { from: String, to: String },
    /// Append a needed entry unless already present
    AddNeeded(String),
    /// Drop a needed entry if present
    RemoveNeeded(String),
    /// Append a text line unless an identical line exists
    AddLineIfMissing(String),
    Call {
        name: String,
        callback: BlobFixupCallback,
    },
}

impl fmt::Display for BlobFixupOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobFixupOp::ReplaceNeeded { from, to } => write!(f, "replace_needed({from}, {to})"),
            BlobFixupOp::AddNeeded(name) => write!(f, "add_needed({name})"),
            BlobFixupOp::RemoveNeeded(name) => write!(f, "remove_needed({name})"),
            BlobFixupOp::AddLineIfMissing(line) => write!(f, "add_line_if_missing({line:?})"),
            BlobFixupOp::Call { name, .. } => write!(f, "call({name})"),
        }
    }
}

/// Ordered sequence of operations, built by chaining
///
/// ```
/// use extract_fixups::BlobFixup;
///
/// let fixup = BlobFixup::new()
///     .replace_needed("libbinder.so", "libbinder-v32.so")
///     .add_needed("libbinder-v32.so");
/// assert_eq!(fixup.ops().len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlobFixup {
    ops: Vec<BlobFixupOp>,
}

impl BlobFixup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_needed(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.ops.push(BlobFixupOp::ReplaceNeeded {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn add_needed(mut self, name: impl Into<String>) -> Self {
        self.ops.push(BlobFixupOp::AddNeeded(name.into()));
        self
    }

    pub fn remove_needed(mut self, name: impl Into<String>) -> Self {
        self.ops.push(BlobFixupOp::RemoveNeeded(name.into()));
        self
    }

    pub fn add_line_if_missing(mut self, line: impl Into<String>) -> Self {
        self.ops.push(BlobFixupOp::AddLineIfMissing(line.into()));
        self
    }

    pub fn call(mut self, name: impl Into<String>, callback: BlobFixupCallback) -> Self {
        self.ops.push(BlobFixupOp::Call {
            name: name.into(),
            callback,
        });
        self
    }

    /// Append an already constructed operation
    pub fn op(mut self, op: BlobFixupOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn ops(&self) -> &[BlobFixupOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl fmt::Display for BlobFixup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}
