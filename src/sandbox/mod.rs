//! The sandboxed runtime the pipeline materializes into, expressed as
//! traits so that hosts (in-browser container, native process, test
//! double) stay interchangeable.

pub mod host;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Sandbox I/O error for path {1}: {0}")]
    Io(#[source] std::io::Error, String),

    #[error("Path not found in sandbox: {0}")]
    NotFound(String),

    #[error("Failed to spawn `{command}`: {reason}")]
    Spawn { command: String, reason: String },
}

/// Virtual filesystem surface of the sandbox. All paths are absolute,
/// slash-separated virtual paths.
#[async_trait]
pub trait SandboxFs: Send + Sync {
    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), SandboxError>;

    /// Overwrites existing content at `path` if present.
    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), SandboxError>;

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SandboxError>;

    async fn rm(&self, path: &str, recursive: bool, force: bool) -> Result<(), SandboxError>;
}

/// A process started inside the sandbox.
///
/// Output and exit are observed independently: draining `output` never
/// blocks `exit`, and `exit` resolving does not require the output to have
/// been consumed.
pub struct SpawnedProcess {
    /// Combined stdout/stderr, one line per message. Closes when the
    /// process has nothing more to say.
    pub output: mpsc::UnboundedReceiver<String>,
    /// Resolves with the exit code once the process terminates.
    pub exit: oneshot::Receiver<i32>,
}

/// Process surface of the sandbox.
#[async_trait]
pub trait SandboxSpawner: Send + Sync {
    async fn spawn(
        &self,
        command: &str,
        args: &[String],
        cwd: &str,
    ) -> Result<SpawnedProcess, SandboxError>;
}

pub use host::HostSandbox;
pub use memory::MemorySandbox;
