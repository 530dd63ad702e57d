//! Blob lists: proprietary-files parsing and output tree enumeration

use std::path::Path;

use crate::error::FixupError;

/// One blob to extract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    /// Path in the donor image
    pub source: String,
    /// Path relative to the output root
    pub dest: String,
}

impl BlobEntry {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            source: path.clone(),
            dest: path,
        }
    }
}

/// Parse a proprietary-files list
///
/// Each line names one blob. `#` starts a comment, a leading `-` is ignored,
/// `src:dst` extracts `src` to `dst`, and anything after `;` (module
/// arguments) or `|` (hash pins) is dropped.
pub fn parse_file_list(content: &str) -> Vec<BlobEntry> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let item = line.trim_start_matches('-');
        let item = item.split(['|', ';']).next().unwrap_or("").trim();
        if item.is_empty() {
            continue;
        }

        let entry = match item.split_once(':') {
            Some((src, dst)) if !dst.is_empty() => BlobEntry {
                source: src.to_string(),
                dest: dst.to_string(),
            },
            Some((src, _)) => BlobEntry::new(src),
            None => BlobEntry::new(item),
        };
        entries.push(entry);
    }

    entries
}

/// Every regular file under `root`, as sorted relative paths
pub fn enumerate_tree(root: &Path) -> Result<Vec<BlobEntry>, FixupError> {
    let pattern = format!("{}/**/*", glob::Pattern::escape(&root.to_string_lossy()));

    let paths = glob::glob(&pattern).map_err(|e| FixupError::File {
        path: root.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()),
    })?;

    let mut entries = Vec::new();
    for path in paths {
        let path = path.map_err(|e| FixupError::File {
            path: e.path().to_path_buf(),
            source: std::io::Error::new(e.error().kind(), e.to_string()),
        })?;
        if !path.is_file() {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(root) {
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.push(BlobEntry::new(rel));
        }
    }

    entries.sort_by(|a, b| a.dest.cmp(&b.dest));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_file_list() {
        let list = r#"
# Audio
vendor/lib64/libiVptApi.so
-vendor/lib64/libwvhidl.so
vendor/lib/libfoo.so:vendor/lib/libbar.so
vendor/etc/seccomp_policy/atfwd@2.0.policy|6a0b1ec3c9a2cbb2a13a5f5fdd5b2e5e3b3c2d11
product/lib64/libdpmframework.so;MODULE_SUFFIX=_vendor   # trailing comment

"#;
        let entries = parse_file_list(list);
        assert_eq!(
            entries,
            vec![
                BlobEntry::new("vendor/lib64/libiVptApi.so"),
                BlobEntry::new("vendor/lib64/libwvhidl.so"),
                BlobEntry {
                    source: "vendor/lib/libfoo.so".to_string(),
                    dest: "vendor/lib/libbar.so".to_string(),
                },
                BlobEntry::new("vendor/etc/seccomp_policy/atfwd@2.0.policy"),
                BlobEntry::new("product/lib64/libdpmframework.so"),
            ]
        );
    }

    #[test]
    fn test_enumerate_tree() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("vendor/lib64")).unwrap();
        std::fs::create_dir_all(dir.path().join("vendor/etc/empty")).unwrap();
        std::fs::write(dir.path().join("vendor/lib64/libfoo.so"), "x").unwrap();
        std::fs::write(dir.path().join("vendor/etc/a.policy"), "x").unwrap();

        let entries = enumerate_tree(dir.path()).unwrap();
        let dests: Vec<_> = entries.iter().map(|e| e.dest.as_str()).collect();
        assert_eq!(dests, vec!["vendor/etc/a.policy", "vendor/lib64/libfoo.so"]);
    }
}
