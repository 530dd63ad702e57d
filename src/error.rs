//! Error types for extract-fixups

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for fixup operations
#[derive(Error, Debug)]
pub enum FixupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on '{path}': {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("ELF error: {0}")]
    Elf(#[from] ElfError),

    #[error("'{from}' is not in the needed-list (wanted to replace it with '{to}')")]
    NeededNotFound { from: String, to: String },

    #[error("callback {name} failed: {message}")]
    Callback { name: String, message: String },

    #[error("{path}: rule {rule}: {op} failed: {source}")]
    Operation {
        path: String,
        rule: String,
        op: String,
        #[source]
        source: Box<FixupError>,
    },

    #[error("Missing file: {0}")]
    MissingFile(String),
}

/// Errors in rule tables and module configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("library '{lib}' appears in both rule {first} and rule {second}")]
    OverlappingLibRule {
        lib: String,
        first: String,
        second: String,
    },

    #[error("file '{path}' appears in both rule {first} and rule {second}")]
    OverlappingBlobRule {
        path: String,
        first: String,
        second: String,
    },

    #[error("Invalid library name in rule {rule}: {name:?}")]
    InvalidLibName { rule: String, name: String },

    #[error("Invalid blob path in rule {rule}: {path:?}")]
    InvalidBlobPath { rule: String, path: String },

    #[error("Rule {0} has no members")]
    EmptyRule(String),

    #[error("Unknown partition: {0}")]
    UnknownPartition(String),

    #[error("Unknown callback: {0}")]
    UnknownCallback(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors from ELF inspection and the external needed-list editor
#[derive(Error, Debug)]
pub enum ElfError {
    #[error("{program} not found or not runnable: {source}")]
    ToolNotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed on {path}: {message}")]
    Tool {
        program: String,
        path: PathBuf,
        message: String,
    },

    #[error("Invalid ELF {path}: {reason}")]
    InvalidElf { path: PathBuf, reason: String },
}

/// Result of checking an extracted tree
#[derive(Debug, Default)]
pub struct CheckResult {
    pub issues: Vec<CheckIssue>,
}

impl CheckResult {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Individual check finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckIssue {
    InvalidElf {
        path: String,
        reason: String,
    },
    UnresolvedNeeded {
        path: String,
        lib: String,
    },
    MissingFile {
        path: String,
    },
    MissingNamespace {
        import: String,
    },
    UnusedBlobRule {
        path: String,
    },
}

impl std::fmt::Display for CheckIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckIssue::InvalidElf { path, reason } => write!(f, "{path}: invalid ELF: {reason}"),
            CheckIssue::UnresolvedNeeded { path, lib } => {
                write!(f, "{path}: needed library {lib} is not provided")
            }
            CheckIssue::MissingFile { path } => write!(f, "{path}: missing"),
            CheckIssue::MissingNamespace { import } => {
                write!(f, "namespace import {import} does not exist")
            }
            CheckIssue::UnusedBlobRule { path } => {
                write!(f, "{path}: has a blob fixup but was not extracted")
            }
        }
    }
}
