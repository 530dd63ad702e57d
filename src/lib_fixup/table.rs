//! Ordered library fixup table with a membership index

use std::collections::HashMap;
use std::collections::HashSet;

use tracing::trace;

use crate::error::ConfigError;
use crate::partition::Partition;

use super::types::LibFixupResult;
use super::types::LibFixupRule;

/// Immutable set of library fixup rules
///
/// Every library belongs to at most one rule. Overlaps are rejected when the
/// table is built.
#[derive(Debug, Clone, Default)]
pub struct LibFixupTable {
    rules: Vec<LibFixupRule>,
    index: HashMap<String, usize>,
}

impl LibFixupTable {
    /// Build a table, rejecting invalid names and overlapping rules
    pub fn new(rules: Vec<LibFixupRule>) -> Result<Self, ConfigError> {
        let mut table = Self::default();
        table.extend(rules)?;
        Ok(table)
    }

    /// Append rules after the existing ones, with the same checks as [`new`](Self::new)
    ///
    /// Either every rule is added or, on error, the table is left as it was.
    pub fn extend(&mut self, rules: Vec<LibFixupRule>) -> Result<(), ConfigError> {
        let mut pending: HashMap<String, usize> = HashMap::new();

        for (offset, rule) in rules.iter().enumerate() {
            if rule.libs.is_empty() {
                return Err(ConfigError::EmptyRule(rule.name.clone()));
            }
            let position = self.rules.len() + offset;
            for lib in &rule.libs {
                if lib.is_empty() || lib.contains('/') {
                    return Err(ConfigError::InvalidLibName {
                        rule: rule.name.clone(),
                        name: lib.clone(),
                    });
                }
                let existing = self.index.get(lib).or_else(|| pending.get(lib));
                if let Some(&existing) = existing {
                    let first = match existing.checked_sub(self.rules.len()) {
                        Some(offset) => rules[offset].name.clone(),
                        None => self.rules[existing].name.clone(),
                    };
                    return Err(ConfigError::OverlappingLibRule {
                        lib: lib.clone(),
                        first,
                        second: rule.name.clone(),
                    });
                }
                pending.insert(lib.clone(), position);
            }
        }

        self.index.extend(pending);
        self.rules.extend(rules);
        Ok(())
    }

    pub fn rules(&self) -> &[LibFixupRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the rule a library belongs to
    pub fn find(&self, lib: &str) -> Option<&LibFixupRule> {
        self.index.get(lib).map(|&i| &self.rules[i])
    }

    /// Resolve the name to emit for `lib` placed in `partition`
    pub fn resolve(&self, lib: &str, partition: Partition) -> LibFixupResult {
        match self.find(lib) {
            Some(rule) => {
                let result = rule.fixup.apply(lib, partition);
                trace!(lib, %partition, rule = %rule.name, ?result, "resolved library");
                result
            }
            None => LibFixupResult::Unchanged,
        }
    }

    /// Map a needed-list (`libfoo.so` entries) to fixed-up module names
    ///
    /// The `.so` extension is stripped before lookup, removed libraries are
    /// dropped and duplicates collapse to their first occurrence.
    pub fn shared_libs<S: AsRef<str>>(&self, needed: &[S], partition: Partition) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut libs = Vec::with_capacity(needed.len());

        for entry in needed {
            let entry = entry.as_ref();
            let base = entry.strip_suffix(".so").unwrap_or(entry);
            let result = self.resolve(base, partition);
            if let Some(name) = result.name_or(base) {
                if seen.insert(name.to_string()) {
                    libs.push(name.to_string());
                }
            }
        }

        libs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lib_fixup::LibFixup;

    fn table() -> LibFixupTable {
        LibFixupTable::new(vec![
            LibFixupRule::new("libs_suffix", ["libmmosal"], LibFixup::VendorSuffix),
            LibFixupRule::new("libs_remove", ["libOmxCore", "libril"], LibFixup::Remove),
            LibFixupRule::new(
                "libs_v32",
                ["libutils-v32", "libbinder-v32"],
                LibFixup::StripSuffix("-v32".to_string()),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_unknown_passes_through() {
        let table = table();
        for partition in Partition::ALL {
            assert_eq!(table.resolve("libfoo", partition), LibFixupResult::Unchanged);
        }
    }

    #[test]
    fn test_overlap_rejected() {
        let err = LibFixupTable::new(vec![
            LibFixupRule::new("a", ["libfoo"], LibFixup::Remove),
            LibFixupRule::new("b", ["libbar", "libfoo"], LibFixup::VendorSuffix),
        ])
        .unwrap_err();
        match err {
            ConfigError::OverlappingLibRule { lib, first, second } => {
                assert_eq!(lib, "libfoo");
                assert_eq!(first, "a");
                assert_eq!(second, "b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_failed_extend_leaves_table_usable() {
        let mut table =
            LibFixupTable::new(vec![LibFixupRule::new("a", ["libfoo"], LibFixup::Remove)]).unwrap();

        let err = table
            .extend(vec![
                LibFixupRule::new("b", ["libbar"], LibFixup::VendorSuffix),
                LibFixupRule::new("c", ["libnew", "libfoo"], LibFixup::VendorSuffix),
            ])
            .unwrap_err();
        assert!(matches!(err, ConfigError::OverlappingLibRule { ref first, .. } if first == "a"));

        assert_eq!(table.len(), 1);
        assert!(table.find("libnew").is_none());
        assert!(table.find("libbar").is_none());
        assert_eq!(table.resolve("libnew", Partition::Vendor), LibFixupResult::Unchanged);
        assert_eq!(table.resolve("libfoo", Partition::Vendor), LibFixupResult::Remove);

        table
            .extend(vec![LibFixupRule::new("c", ["libnew"], LibFixup::VendorSuffix)])
            .unwrap();
        assert_eq!(
            table.resolve("libnew", Partition::Vendor),
            LibFixupResult::Rename("libnew_vendor".to_string())
        );
    }

    #[test]
    fn test_overlap_within_one_extend() {
        let mut table = LibFixupTable::default();
        let err = table
            .extend(vec![
                LibFixupRule::new("a", ["libfoo"], LibFixup::Remove),
                LibFixupRule::new("b", ["libfoo"], LibFixup::Remove),
            ])
            .unwrap_err();
        assert!(matches!(err, ConfigError::OverlappingLibRule { ref first, ref second, .. }
            if first == "a" && second == "b"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_duplicate_within_rule_rejected() {
        let err = LibFixupTable::new(vec![LibFixupRule::new(
            "a",
            ["libfoo", "libfoo"],
            LibFixup::Remove,
        )])
        .unwrap_err();
        assert!(matches!(err, ConfigError::OverlappingLibRule { .. }));
    }

    #[test]
    fn test_invalid_names_rejected() {
        let err = LibFixupTable::new(vec![LibFixupRule::new(
            "a",
            ["vendor/lib64/libfoo"],
            LibFixup::Remove,
        )])
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLibName { .. }));

        let err = LibFixupTable::new(vec![LibFixupRule::new(
            "empty",
            Vec::<String>::new(),
            LibFixup::Remove,
        )])
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyRule(_)));
    }

    #[test]
    fn test_strip_is_idempotent_through_table() {
        let table = table();
        let first = table.resolve("libutils-v32", Partition::Vendor);
        assert_eq!(first, LibFixupResult::Rename("libutils".to_string()));
        assert_eq!(table.resolve("libutils", Partition::Vendor), LibFixupResult::Unchanged);
    }

    #[test]
    fn test_shared_libs() {
        let table = table();
        let needed = [
            "libc.so",
            "libmmosal.so",
            "libOmxCore.so",
            "libutils-v32.so",
            "libutils.so",
        ];
        assert_eq!(
            table.shared_libs(&needed, Partition::Vendor),
            vec!["libc", "libmmosal_vendor", "libutils"]
        );
        assert_eq!(
            table.shared_libs(&needed, Partition::Product),
            vec!["libc", "libmmosal", "libutils"]
        );
    }
}
