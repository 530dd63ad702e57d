//! Types for library name fixups

use std::fmt;

use crate::partition::Partition;

/// Free-form fixup. Returns `None` for no change, `Some("")` to remove the
/// library and `Some(name)` to rename it.
pub type LibFixupFn = fn(&str, Partition) -> Option<String>;

/// What to do with a library name that matched a rule
#[derive(Debug, Clone)]
pub enum LibFixup {
    /// Append `_vendor` when the library is placed in the vendor partition
    VendorSuffix,
    /// Append `-vendorcompat` when the library is placed in the vendor partition
    VendorCompat,
    /// Drop the library from dependency lists
    Remove,
    /// Strip the given marker (e.g. `-v32`) once, if present
    StripSuffix(String),
    /// Replace the name outright
    Rename(String),
    Custom(LibFixupFn),
}

impl LibFixup {
    /// Apply this fixup to a single library name
    pub fn apply(&self, lib: &str, partition: Partition) -> LibFixupResult {
        match self {
            LibFixup::VendorSuffix => append_for_vendor(lib, partition, "_vendor"),
            LibFixup::VendorCompat => append_for_vendor(lib, partition, "-vendorcompat"),
            LibFixup::Remove => LibFixupResult::Remove,
            LibFixup::StripSuffix(suffix) => {
                if suffix.is_empty() {
                    return LibFixupResult::Unchanged;
                }
                match lib.strip_suffix(suffix.as_str()) {
                    Some(stripped) => LibFixupResult::Rename(stripped.to_string()),
                    None if lib.contains(suffix.as_str()) => {
                        LibFixupResult::Rename(lib.replacen(suffix.as_str(), "", 1))
                    }
                    None => LibFixupResult::Unchanged,
                }
            }
            LibFixup::Rename(target) => {
                if target == lib {
                    LibFixupResult::Unchanged
                } else {
                    LibFixupResult::from_raw(Some(target.clone()))
                }
            }
            LibFixup::Custom(func) => LibFixupResult::from_raw(func(lib, partition)),
        }
    }
}

fn append_for_vendor(lib: &str, partition: Partition, suffix: &str) -> LibFixupResult {
    if partition != Partition::Vendor || lib.ends_with(suffix) {
        return LibFixupResult::Unchanged;
    }
    LibFixupResult::Rename(format!("{lib}{suffix}"))
}

impl fmt::Display for LibFixup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibFixup::VendorSuffix => f.write_str("vendor_suffix"),
            LibFixup::VendorCompat => f.write_str("vendor_compat"),
            LibFixup::Remove => f.write_str("remove"),
            LibFixup::StripSuffix(suffix) => write!(f, "strip_suffix({suffix})"),
            LibFixup::Rename(target) => write!(f, "rename({target})"),
            LibFixup::Custom(_) => f.write_str("custom"),
        }
    }
}

/// Outcome of resolving a library name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibFixupResult {
    Unchanged,
    Remove,
    Rename(String),
}

impl LibFixupResult {
    /// Convert from the `None` / `""` / name convention
    pub fn from_raw(raw: Option<String>) -> Self {
        match raw {
            None => LibFixupResult::Unchanged,
            Some(name) if name.is_empty() => LibFixupResult::Remove,
            Some(name) => LibFixupResult::Rename(name),
        }
    }

    /// Convert to the `None` / `""` / name convention
    pub fn into_raw(self) -> Option<String> {
        match self {
            LibFixupResult::Unchanged => None,
            LibFixupResult::Remove => Some(String::new()),
            LibFixupResult::Rename(name) => Some(name),
        }
    }

    /// The name to emit, or `None` if the library is removed
    pub fn name_or<'a>(&'a self, original: &'a str) -> Option<&'a str> {
        match self {
            LibFixupResult::Unchanged => Some(original),
            LibFixupResult::Remove => None,
            LibFixupResult::Rename(name) => Some(name),
        }
    }
}

/// A named set of libraries sharing one fixup
#[derive(Debug, Clone)]
pub struct LibFixupRule {
    pub name: String,
    pub libs: Vec<String>,
    pub fixup: LibFixup,
}

impl LibFixupRule {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        libs: impl IntoIterator<Item = S>,
        fixup: LibFixup,
    ) -> Self {
        Self {
            name: name.into(),
            libs: libs.into_iter().map(Into::into).collect(),
            fixup,
        }
    }
}
