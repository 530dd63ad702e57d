//! Test doubles

use std::fs;
use std::path::Path;

use crate::elf::NeededEditor;
use crate::error::ElfError;

/// Editor over plain text files holding one needed entry per line
pub struct ListEditor;

impl ListEditor {
    pub fn write(path: &Path, needed: &[&str]) {
        let mut content = needed.join("\n");
        content.push('\n');
        fs::write(path, content).unwrap();
    }

    pub fn read(path: &Path) -> Vec<String> {
        ListEditor.needed(path).unwrap()
    }

    fn store(path: &Path, needed: &[String]) -> Result<(), ElfError> {
        let mut content = needed.join("\n");
        content.push('\n');
        fs::write(path, content).map_err(|e| tool_error(path, e))
    }
}

fn tool_error(path: &Path, e: std::io::Error) -> ElfError {
    ElfError::Tool {
        program: "list-editor".to_string(),
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

impl NeededEditor for ListEditor {
    fn needed(&self, path: &Path) -> Result<Vec<String>, ElfError> {
        let content = fs::read_to_string(path).map_err(|e| tool_error(path, e))?;
        Ok(content
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn replace_needed(&self, path: &Path, from: &str, to: &str) -> Result<(), ElfError> {
        let needed: Vec<String> = self
            .needed(path)?
            .into_iter()
            .map(|n| if n == from { to.to_string() } else { n })
            .collect();
        Self::store(path, &needed)
    }

    fn add_needed(&self, path: &Path, name: &str) -> Result<(), ElfError> {
        let mut needed = self.needed(path)?;
        needed.push(name.to_string());
        Self::store(path, &needed)
    }

    fn remove_needed(&self, path: &Path, name: &str) -> Result<(), ElfError> {
        let mut needed = self.needed(path)?;
        needed.retain(|n| n != name);
        Self::store(path, &needed)
    }
}
