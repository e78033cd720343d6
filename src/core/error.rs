//! Defines the custom error types for the import pipeline.

use thiserror::Error;

use crate::sandbox::SandboxError;
use crate::source::SourceError;

/// Fatal pipeline errors. Per-item failures during the walk or during
/// materialization are collected and logged instead of raised; only the
/// conditions below abort an import.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The host cannot provide a directory selection at all.
    #[error("Directory selection is not available in this environment")]
    UnsupportedEnvironment,

    /// No `package.json` anywhere in the selected source. Checked before
    /// the store or the sandbox is touched.
    #[error("No package.json found in the selected project")]
    NoPackageJson,

    /// A second import was triggered while one is still running.
    #[error("An import is already in progress")]
    ImportInProgress,

    /// More files passed the filter than the configured limit allows; the
    /// host must confirm before retrying with confirmation set.
    #[error("Importing {importable} files (of {candidates} found) exceeds the limit of {limit}")]
    ConfirmationRequired {
        candidates: usize,
        importable: usize,
        limit: usize,
    },

    /// The source itself failed (e.g. the root listing), as opposed to a
    /// single file inside it.
    #[error("Failed to read the selected source: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}

/// Errors from the install/start sequence. These surface after a
/// successful materialization and never undo the import itself.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("npm install failed with exit code {0}")]
    InstallFailed(i32),

    /// No run script matched and no fallback script is configured.
    #[error("Could not resolve a start command for the project")]
    StartUnresolved,

    #[error(transparent)]
    Sandbox(#[from] SandboxError),
}
