//! Sandbox implementation over the host OS: virtual paths are mapped
//! beneath a root directory, and processes run as real children with
//! their output forwarded line-by-line.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

use super::{SandboxError, SandboxFs, SandboxSpawner, SpawnedProcess};

pub struct HostSandbox {
    root: PathBuf,
}

impl HostSandbox {
    /// `root` is the host directory that backs the virtual filesystem; the
    /// virtual path `/home/project/x` maps to `<root>/home/project/x`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn host_path(&self, virtual_path: &str) -> PathBuf {
        self.root.join(virtual_path.trim_start_matches('/'))
    }

    fn io_err(e: std::io::Error, path: &str) -> SandboxError {
        if e.kind() == std::io::ErrorKind::NotFound {
            SandboxError::NotFound(path.to_string())
        } else {
            SandboxError::Io(e, path.to_string())
        }
    }
}

#[async_trait]
impl SandboxFs for HostSandbox {
    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), SandboxError> {
        let target = self.host_path(path);
        let result = if recursive {
            tokio::fs::create_dir_all(&target).await
        } else {
            match tokio::fs::create_dir(&target).await {
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
                other => other,
            }
        };
        result.map_err(|e| Self::io_err(e, path))
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), SandboxError> {
        tokio::fs::write(self.host_path(path), contents)
            .await
            .map_err(|e| Self::io_err(e, path))
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SandboxError> {
        tokio::fs::read(self.host_path(path))
            .await
            .map_err(|e| Self::io_err(e, path))
    }

    async fn rm(&self, path: &str, recursive: bool, force: bool) -> Result<(), SandboxError> {
        let target = self.host_path(path);
        let result = if recursive {
            tokio::fs::remove_dir_all(&target).await
        } else {
            tokio::fs::remove_file(&target).await
        };
        match result {
            Err(e) if force && e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other.map_err(|e| Self::io_err(e, path)),
        }
    }
}

#[async_trait]
impl SandboxSpawner for HostSandbox {
    async fn spawn(
        &self,
        command: &str,
        args: &[String],
        cwd: &str,
    ) -> Result<SpawnedProcess, SandboxError> {
        let mut child = Command::new(command)
            .args(args)
            .current_dir(self.host_path(cwd))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SandboxError::Spawn {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        let (out_tx, out_rx) = mpsc::unbounded_channel();

        if let Some(stdout) = child.stdout.take() {
            let tx = out_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        }
        if let Some(stderr) = child.stderr.take() {
            let tx = out_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
        }
        drop(out_tx);

        let (exit_tx, exit_rx) = oneshot::channel();
        let command_name = command.to_string();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code().unwrap_or(-1),
                Err(e) => {
                    tracing::error!("Failed to wait on `{}`: {}", command_name, e);
                    -1
                }
            };
            let _ = exit_tx.send(code);
        });

        Ok(SpawnedProcess {
            output: out_rx,
            exit: exit_rx,
        })
    }
}
