//! In-memory sandbox: a path map standing in for the virtual filesystem
//! and a queue of scripted process results. This is the embedding target
//! for hosts without a real runtime and the double used by the test suite.

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

use super::{SandboxError, SandboxFs, SandboxSpawner, SpawnedProcess};
use crate::core::{is_under, vparent};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Dir,
    File(Vec<u8>),
}

/// The outcome a scripted spawn will produce.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    pub output: Vec<String>,
    pub exit_code: i32,
}

impl ScriptedRun {
    pub fn success(output: &[&str]) -> Self {
        Self {
            output: output.iter().map(|s| s.to_string()).collect(),
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32, output: &[&str]) -> Self {
        Self {
            output: output.iter().map(|s| s.to_string()).collect(),
            exit_code,
        }
    }
}

/// Record of one `spawn` call, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRecord {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: String,
}

#[derive(Default)]
pub struct MemorySandbox {
    nodes: Mutex<BTreeMap<String, Node>>,
    scripted: Mutex<VecDeque<ScriptedRun>>,
    spawned: Mutex<Vec<SpawnRecord>>,
}

impl MemorySandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the result the next spawn will report.
    pub fn script_run(&self, run: ScriptedRun) {
        self.scripted.lock().unwrap().push_back(run);
    }

    /// Spawn calls seen so far, in order.
    pub fn spawn_records(&self) -> Vec<SpawnRecord> {
        self.spawned.lock().unwrap().clone()
    }

    pub fn contains_dir(&self, path: &str) -> bool {
        matches!(self.nodes.lock().unwrap().get(path), Some(Node::Dir))
    }

    pub fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        match self.nodes.lock().unwrap().get(path) {
            Some(Node::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// All paths currently present, for snapshot-style assertions.
    pub fn paths(&self) -> Vec<String> {
        self.nodes.lock().unwrap().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.lock().unwrap().is_empty()
    }

    fn ensure_parent(nodes: &BTreeMap<String, Node>, path: &str) -> Result<(), SandboxError> {
        match vparent(path) {
            None => Ok(()),
            Some(parent) => match nodes.get(parent) {
                Some(Node::Dir) => Ok(()),
                _ => Err(SandboxError::NotFound(parent.to_string())),
            },
        }
    }
}

#[async_trait]
impl SandboxFs for MemorySandbox {
    async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), SandboxError> {
        let mut nodes = self.nodes.lock().unwrap();
        if recursive {
            let mut ancestors = Vec::new();
            let mut current = Some(path);
            while let Some(p) = current {
                ancestors.push(p.to_string());
                current = vparent(p);
            }
            for ancestor in ancestors.into_iter().rev() {
                nodes.entry(ancestor).or_insert(Node::Dir);
            }
            Ok(())
        } else {
            Self::ensure_parent(&nodes, path)?;
            nodes.entry(path.to_string()).or_insert(Node::Dir);
            Ok(())
        }
    }

    async fn write_file(&self, path: &str, contents: &[u8]) -> Result<(), SandboxError> {
        let mut nodes = self.nodes.lock().unwrap();
        Self::ensure_parent(&nodes, path)?;
        nodes.insert(path.to_string(), Node::File(contents.to_vec()));
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SandboxError> {
        match self.nodes.lock().unwrap().get(path) {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            _ => Err(SandboxError::NotFound(path.to_string())),
        }
    }

    async fn rm(&self, path: &str, recursive: bool, force: bool) -> Result<(), SandboxError> {
        let mut nodes = self.nodes.lock().unwrap();
        let exists = nodes.contains_key(path);
        if !exists && !force {
            return Err(SandboxError::NotFound(path.to_string()));
        }
        if recursive {
            nodes.retain(|p, _| !is_under(p, path));
        } else {
            nodes.remove(path);
        }
        Ok(())
    }
}

#[async_trait]
impl SandboxSpawner for MemorySandbox {
    async fn spawn(
        &self,
        command: &str,
        args: &[String],
        cwd: &str,
    ) -> Result<SpawnedProcess, SandboxError> {
        self.spawned.lock().unwrap().push(SpawnRecord {
            command: command.to_string(),
            args: args.to_vec(),
            cwd: cwd.to_string(),
        });

        let run = self
            .scripted
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedRun {
                output: Vec::new(),
                exit_code: 0,
            });

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        for line in run.output {
            let _ = out_tx.send(line);
        }
        drop(out_tx);

        let (exit_tx, exit_rx) = oneshot::channel();
        let _ = exit_tx.send(run.exit_code);

        Ok(SpawnedProcess {
            output: out_rx,
            exit: exit_rx,
        })
    }
}
