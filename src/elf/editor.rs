//! Needed-list editing with patchelf
//!
//! patchelf reads and rewrites the dynamic section directly, so it works on
//! binaries for any architecture without executing them.

use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::error::ElfError;

use super::types::NeededEditor;

/// [`NeededEditor`] backed by the `patchelf` command
#[derive(Debug, Clone)]
pub struct PatchelfEditor {
    program: PathBuf,
}

impl Default for PatchelfEditor {
    fn default() -> Self {
        Self::new("patchelf")
    }
}

impl PatchelfEditor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn run(&self, args: &[&str], path: &Path) -> Result<String, ElfError> {
        let program = self.program.display().to_string();
        debug!(program = %program, ?args, path = %path.display(), "running");

        let output = Command::new(&self.program)
            .args(args)
            .arg(path)
            .output()
            .map_err(|source| ElfError::ToolNotFound {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ElfError::Tool {
                program,
                path: path.to_path_buf(),
                message: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl NeededEditor for PatchelfEditor {
    fn needed(&self, path: &Path) -> Result<Vec<String>, ElfError> {
        let stdout = self.run(&["--print-needed"], path)?;
        Ok(parse_print_needed(&stdout))
    }

    fn replace_needed(&self, path: &Path, from: &str, to: &str) -> Result<(), ElfError> {
        self.run(&["--replace-needed", from, to], path)?;
        Ok(())
    }

    fn add_needed(&self, path: &Path, name: &str) -> Result<(), ElfError> {
        self.run(&["--add-needed", name], path)?;
        Ok(())
    }

    fn remove_needed(&self, path: &Path, name: &str) -> Result<(), ElfError> {
        self.run(&["--remove-needed", name], path)?;
        Ok(())
    }
}

/// Parse `patchelf --print-needed` output: one library per line.
pub fn parse_print_needed(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
