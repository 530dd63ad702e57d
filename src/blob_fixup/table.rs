//! Path-keyed blob fixup table

use std::collections::HashMap;

use crate::error::ConfigError;

use super::types::BlobFixup;

/// A set of output paths sharing one fixup
#[derive(Debug, Clone)]
pub struct BlobFixupRule {
    pub name: String,
    pub paths: Vec<String>,
    pub fixup: BlobFixup,
}

impl BlobFixupRule {
    pub fn new<S: Into<String>>(
        name: impl Into<String>,
        paths: impl IntoIterator<Item = S>,
        fixup: BlobFixup,
    ) -> Self {
        Self {
            name: name.into(),
            paths: paths.into_iter().map(Into::into).collect(),
            fixup,
        }
    }

    /// Name unnamed `(paths, fixup)` pairs `#0`, `#1`, ... by position
    pub fn numbered<S: Into<String>>(
        pairs: impl IntoIterator<Item = (Vec<S>, BlobFixup)>,
    ) -> Vec<Self> {
        pairs
            .into_iter()
            .enumerate()
            .map(|(i, (paths, fixup))| Self::new(format!("#{i}"), paths, fixup))
            .collect()
    }
}

/// Immutable set of blob fixup rules, each path in at most one rule
#[derive(Debug, Clone, Default)]
pub struct BlobFixupTable {
    rules: Vec<BlobFixupRule>,
    index: HashMap<String, usize>,
}

impl BlobFixupTable {
    pub fn new(rules: Vec<BlobFixupRule>) -> Result<Self, ConfigError> {
        let mut table = Self::default();
        table.extend(rules)?;
        Ok(table)
    }

    /// Build from unnamed `(paths, fixup)` pairs; rules are named by position
    pub fn from_pairs<S: Into<String>>(
        pairs: impl IntoIterator<Item = (Vec<S>, BlobFixup)>,
    ) -> Result<Self, ConfigError> {
        Self::new(BlobFixupRule::numbered(pairs))
    }

    /// Append rules after the existing ones
    ///
    /// Either every rule is added or, on error, the table is left as it was.
    pub fn extend(&mut self, rules: Vec<BlobFixupRule>) -> Result<(), ConfigError> {
        let mut pending: HashMap<String, usize> = HashMap::new();

        for (offset, rule) in rules.iter().enumerate() {
            if rule.paths.is_empty() || rule.fixup.is_empty() {
                return Err(ConfigError::EmptyRule(rule.name.clone()));
            }
            let position = self.rules.len() + offset;
            for path in &rule.paths {
                if !is_valid_blob_path(path) {
                    return Err(ConfigError::InvalidBlobPath {
                        rule: rule.name.clone(),
                        path: path.clone(),
                    });
                }
                let existing = self.index.get(path).or_else(|| pending.get(path));
                if let Some(&existing) = existing {
                    let first = match existing.checked_sub(self.rules.len()) {
                        Some(offset) => rules[offset].name.clone(),
                        None => self.rules[existing].name.clone(),
                    };
                    return Err(ConfigError::OverlappingBlobRule {
                        path: path.clone(),
                        first,
                        second: rule.name.clone(),
                    });
                }
                pending.insert(path.clone(), position);
            }
        }

        self.index.extend(pending);
        self.rules.extend(rules);
        Ok(())
    }

    pub fn rules(&self) -> &[BlobFixupRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule whose path set contains `rel_path`
    pub fn find(&self, rel_path: &str) -> Option<&BlobFixupRule> {
        self.index.get(rel_path).map(|&i| &self.rules[i])
    }

    /// Every path that has a fixup
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .flat_map(|rule| rule.paths.iter().map(String::as_str))
    }
}

/// Relative, normalized, no parent components
fn is_valid_blob_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.ends_with('/')
        && path
            .split('/')
            .all(|part| !part.is_empty() && part != "." && part != "..")
}
