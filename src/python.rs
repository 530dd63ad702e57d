//! Python bindings for extract-fixups using PyO3
//!
//! Exposes the sm8250-common rules to Python extraction scripts with the
//! conventions those scripts already use: a library fixup returns `None` for
//! "keep the name", `""` for "drop it", or the new name.

use std::path::Path;

use pyo3::exceptions::PyFileNotFoundError;
use pyo3::exceptions::PyIOError;
use pyo3::exceptions::PyRuntimeError;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::BlobFixupCtx;
use crate::ConfigError;
use crate::FixupError;
use crate::Partition;
use crate::PatchelfEditor;
use crate::sm8250_common;

/// Convert FixupError to PyErr
impl From<FixupError> for PyErr {
    fn from(err: FixupError) -> PyErr {
        match &err {
            FixupError::Io(io_err) | FixupError::File { source: io_err, .. } => {
                if io_err.kind() == std::io::ErrorKind::NotFound {
                    PyFileNotFoundError::new_err(err.to_string())
                } else {
                    PyIOError::new_err(err.to_string())
                }
            }
            FixupError::MissingFile(_) => PyFileNotFoundError::new_err(err.to_string()),
            FixupError::Config(_) => PyValueError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

fn config_err(err: ConfigError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

/// Resolve a library name for a partition.
///
/// Args:
///     name: Library name without the .so extension
///     partition: One of system, system_ext, product, vendor, odm
///
/// Returns:
///     None to keep the name, "" to drop the library, or the new name
///
/// Raises:
///     ValueError: If the partition is unknown
#[pyfunction]
fn resolve_lib(name: &str, partition: &str) -> PyResult<Option<String>> {
    crate::resolve_lib(name, partition).map_err(config_err)
}

/// Apply the blob fixup registered for a file, if any.
///
/// Args:
///     output_root: Root of the extracted tree
///     rel_path: Path of the file relative to the root
///     patchelf: patchelf binary to use
///
/// Returns:
///     True if a rule matched and was applied, False if no rule matched
///
/// Raises:
///     FileNotFoundError: If the file does not exist
///     RuntimeError: If an operation of the rule fails
#[pyfunction]
#[pyo3(signature = (output_root, rel_path, patchelf = "patchelf"))]
fn apply_blob_fixup(output_root: &str, rel_path: &str, patchelf: &str) -> PyResult<bool> {
    let module = sm8250_common().map_err(config_err)?;
    let Some(rule) = module.blob_fixups().find(rel_path) else {
        return Ok(false);
    };

    let target = Path::new(output_root).join(rel_path);
    if !target.is_file() {
        return Err(FixupError::MissingFile(rel_path.to_string()).into());
    }

    let ctx = BlobFixupCtx {
        device: module.device(),
        vendor: module.vendor(),
        rel_path,
        partition: Partition::from_path(rel_path),
    };
    let editor = PatchelfEditor::new(patchelf);
    crate::apply_blob_fixup(rule, &ctx, &editor, &target)?;
    Ok(true)
}

/// extract_fixups: library and blob fixups for Sony sm8250-common blobs
#[pymodule]
fn extract_fixups(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(resolve_lib, m)?)?;
    m.add_function(wrap_pyfunction!(apply_blob_fixup, m)?)?;
    Ok(())
}
