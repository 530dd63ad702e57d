//! Applying a blob fixup to one extracted file
//!
//! Operations run on a temporary copy next to the target. The copy replaces
//! the target only after every operation succeeded, so a failing rule never
//! leaves a half-fixed file behind.

use std::fs;
use std::path::Path;

use tracing::debug;
use tracing::info;

use crate::elf::NeededEditor;
use crate::error::FixupError;

use super::callbacks::append_line_unless;
use super::table::BlobFixupRule;
use super::types::BlobFixupCtx;
use super::types::BlobFixupOp;

/// Summary of a successfully applied rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFixup {
    pub rule: String,
    /// Operations that changed the file, in order
    pub changed: Vec<String>,
    /// Operations that found nothing to do
    pub skipped: Vec<String>,
}

/// Apply `rule` to the file at `target`, replacing it atomically on success
pub fn apply_blob_fixup<E: NeededEditor + ?Sized>(
    rule: &BlobFixupRule,
    ctx: &BlobFixupCtx<'_>,
    editor: &E,
    target: &Path,
) -> Result<AppliedFixup, FixupError> {
    let file_error = |source: std::io::Error| FixupError::File {
        path: target.to_path_buf(),
        source,
    };

    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let work = tempfile::Builder::new()
        .prefix(".fixup-")
        .tempfile_in(dir)
        .map_err(file_error)?;
    // fs::copy also carries over the permission bits
    fs::copy(target, work.path()).map_err(file_error)?;

    let mut applied = AppliedFixup {
        rule: rule.name.clone(),
        changed: Vec::new(),
        skipped: Vec::new(),
    };

    for op in rule.fixup.ops() {
        let changed = apply_op(op, ctx, editor, work.path()).map_err(|source| {
            FixupError::Operation {
                path: ctx.rel_path.to_string(),
                rule: rule.name.clone(),
                op: op.to_string(),
                source: Box::new(source),
            }
        })?;
        debug!(file = ctx.rel_path, %op, changed, "applied");
        if changed {
            applied.changed.push(op.to_string());
        } else {
            applied.skipped.push(op.to_string());
        }
    }

    work.persist(target).map_err(|e| file_error(e.error))?;
    info!(file = ctx.rel_path, rule = %rule.name, "fixed");

    Ok(applied)
}

/// Run one operation against the working copy; returns whether it changed anything
fn apply_op<E: NeededEditor + ?Sized>(
    op: &BlobFixupOp,
    ctx: &BlobFixupCtx<'_>,
    editor: &E,
    path: &Path,
) -> Result<bool, FixupError> {
    match op {
        BlobFixupOp::ReplaceNeeded { from, to } => {
            let needed = editor.needed(path)?;
            if !needed.iter().any(|n| n == from) {
                return Err(FixupError::NeededNotFound {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
            if from == to {
                return Ok(false);
            }
            editor.replace_needed(path, from, to)?;
            Ok(true)
        }
        BlobFixupOp::AddNeeded(name) => {
            if editor.needed(path)?.iter().any(|n| n == name) {
                return Ok(false);
            }
            editor.add_needed(path, name)?;
            Ok(true)
        }
        BlobFixupOp::RemoveNeeded(name) => {
            if !editor.needed(path)?.iter().any(|n| n == name) {
                return Ok(false);
            }
            editor.remove_needed(path, name)?;
            Ok(true)
        }
        BlobFixupOp::AddLineIfMissing(line) => append_line_unless(
            path,
            |content| content.lines().any(|l| l.trim_end() == line.as_str()),
            line,
        ),
        BlobFixupOp::Call { name, callback } => {
            let before = fs::read(path)?;
            callback(ctx, path).map_err(|e| match e {
                FixupError::Callback { .. } => e,
                other => FixupError::Callback {
                    name: name.clone(),
                    message: other.to_string(),
                },
            })?;
            Ok(fs::read(path)? != before)
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::blob_fixup::BlobFixup;
    use crate::testing::ListEditor;

    fn ctx(rel_path: &str) -> BlobFixupCtx<'_> {
        BlobFixupCtx {
            device: "sm8250-common",
            vendor: "sony",
            rel_path,
            partition: crate::Partition::from_path(rel_path),
        }
    }

    fn fail(_ctx: &BlobFixupCtx<'_>, path: &Path) -> Result<(), FixupError> {
        fs::write(path, "garbage")?;
        Err(FixupError::Callback {
            name: "fail".to_string(),
            message: "refusing".to_string(),
        })
    }

    #[test]
    fn test_replace_then_add_keeps_single_entry() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("camera.so");
        ListEditor::write(&target, &["libutils.so", "libbinder.so", "libc.so"]);

        let rule = BlobFixupRule::new(
            "camera",
            ["vendor/lib64/camera.so"],
            BlobFixup::new()
                .replace_needed("libbinder.so", "libbinder-v32.so")
                .add_needed("libbinder-v32.so"),
        );
        let applied =
            apply_blob_fixup(&rule, &ctx("vendor/lib64/camera.so"), &ListEditor, &target).unwrap();

        assert_eq!(
            ListEditor::read(&target),
            vec!["libutils.so", "libbinder-v32.so", "libc.so"]
        );
        assert_eq!(applied.changed, vec!["replace_needed(libbinder.so, libbinder-v32.so)"]);
        assert_eq!(applied.skipped, vec!["add_needed(libbinder-v32.so)"]);
    }

    #[test]
    fn test_missing_replace_target_reports_and_keeps_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("libdpmframework.so");
        ListEditor::write(&target, &["libc.so"]);

        let rule = BlobFixupRule::new(
            "#1",
            ["product/lib64/libdpmframework.so"],
            BlobFixup::new()
                .add_needed("libfoo.so")
                .replace_needed("libhidltransport.so", "libcutils-v29.so"),
        );
        let err = apply_blob_fixup(
            &rule,
            &ctx("product/lib64/libdpmframework.so"),
            &ListEditor,
            &target,
        )
        .unwrap_err();

        match &err {
            FixupError::Operation { path, rule, op, source } => {
                assert_eq!(path, "product/lib64/libdpmframework.so");
                assert_eq!(rule, "#1");
                assert_eq!(op, "replace_needed(libhidltransport.so, libcutils-v29.so)");
                assert!(matches!(**source, FixupError::NeededNotFound { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The add_needed that ran first must not have leaked into the target
        assert_eq!(ListEditor::read(&target), vec!["libc.so"]);
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_failing_callback_keeps_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("atfwd@2.0.policy");
        fs::write(&target, "read: 1\n").unwrap();

        let rule = BlobFixupRule::new("#0", ["vendor/etc/a.policy"], BlobFixup::new().call("fail", fail));
        let err =
            apply_blob_fixup(&rule, &ctx("vendor/etc/a.policy"), &ListEditor, &target).unwrap_err();
        assert!(err.to_string().contains("call(fail)"));
        assert_eq!(fs::read_to_string(&target).unwrap(), "read: 1\n");
    }

    #[test]
    fn test_add_line_if_missing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("init.rc");
        fs::write(&target, "service foo /vendor/bin/foo").unwrap();

        let rule = BlobFixupRule::new(
            "#0",
            ["vendor/etc/init/foo.rc"],
            BlobFixup::new().add_line_if_missing("    disabled"),
        );
        let c = ctx("vendor/etc/init/foo.rc");
        apply_blob_fixup(&rule, &c, &ListEditor, &target).unwrap();
        apply_blob_fixup(&rule, &c, &ListEditor, &target).unwrap();
        assert_eq!(
            fs::read_to_string(&target).unwrap(),
            "service foo /vendor/bin/foo\n    disabled\n"
        );
    }

    #[test]
    fn test_remove_needed_absent_is_noop() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("libfoo.so");
        ListEditor::write(&target, &["libc.so", "libm.so"]);

        let rule = BlobFixupRule::new(
            "#0",
            ["vendor/lib/libfoo.so"],
            BlobFixup::new().remove_needed("libm.so").remove_needed("libdl.so"),
        );
        let applied =
            apply_blob_fixup(&rule, &ctx("vendor/lib/libfoo.so"), &ListEditor, &target).unwrap();
        assert_eq!(ListEditor::read(&target), vec!["libc.so"]);
        assert_eq!(applied.skipped, vec!["remove_needed(libdl.so)"]);
    }
}
