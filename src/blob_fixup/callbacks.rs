//! Built-in callbacks for `call` fixups

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::FixupError;

use super::types::BlobFixupCallback;
use super::types::BlobFixupCtx;

/// Look up a built-in callback by the name used in configuration files
pub fn builtin_callback(name: &str) -> Option<BlobFixupCallback> {
    match name {
        "add_gettid" => Some(add_gettid),
        _ => None,
    }
}

/// Allow `gettid` in a seccomp policy that is missing it
pub fn add_gettid(ctx: &BlobFixupCtx<'_>, path: &Path) -> Result<(), FixupError> {
    let changed = append_line_unless(path, |content| content.contains("gettid"), "gettid: 1")?;
    if changed {
        debug!(file = ctx.rel_path, "added gettid");
    }
    Ok(())
}

/// Append `line` to a text file unless `present` says it is already there.
///
/// A newline is inserted first if the file does not end with one. Returns
/// whether the file was changed.
pub fn append_line_unless(
    path: &Path,
    present: impl Fn(&str) -> bool,
    line: &str,
) -> Result<bool, FixupError> {
    let mut content = fs::read_to_string(path).map_err(|source| FixupError::File {
        path: path.to_path_buf(),
        source,
    })?;

    if present(&content) {
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(line);
    content.push('\n');

    fs::write(path, content).map_err(|source| FixupError::File {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}
