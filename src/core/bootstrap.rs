//! Reads the imported `package.json`, resolves the install/start command
//! pair and drives the install-then-run sequence in the sandbox.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ImportConfig;
use crate::core::error::BootstrapError;
use crate::sandbox::{SandboxSpawner, SpawnedProcess};

/// Sink for process output, one line at a time. This is the single
/// well-defined surface the bootstrapper writes command output to,
/// decoupling it from any particular terminal widget.
pub trait LogSink: Send + Sync {
    fn append_line(&self, line: &str);
}

/// The run scripts the bootstrapper knows how to pick, highest priority
/// first.
pub const START_SCRIPT_PRIORITY: [&str; 4] = ["start", "dev", "serve", "develop"];

/// The slice of `package.json` the pipeline cares about.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PackageJson {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

impl PackageJson {
    /// Parses manifest bytes. A malformed manifest is recovered by
    /// synthesizing an empty one; the second value reports whether
    /// parsing succeeded so callers can warn.
    pub fn parse(bytes: &[u8]) -> (Self, bool) {
        match serde_json::from_slice(bytes) {
            Ok(manifest) => (manifest, true),
            Err(e) => {
                tracing::warn!("Failed to parse package.json: {}. Using defaults.", e);
                (Self::default(), false)
            }
        }
    }
}

/// One spawnable command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// The resolved install/start command pair for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub install: CommandSpec,
    pub start: CommandSpec,
    /// The script name the start command runs.
    pub script: String,
}

impl RunPlan {
    /// Picks the run script by priority. When none of the known scripts
    /// are present the configured fallback is used; without a fallback
    /// the start command is unresolvable.
    pub fn resolve(manifest: &PackageJson, config: &ImportConfig) -> Result<Self, BootstrapError> {
        let script = START_SCRIPT_PRIORITY
            .iter()
            .find(|name| manifest.scripts.contains_key(**name))
            .map(|name| name.to_string())
            .or_else(|| config.fallback_start_script.clone())
            .ok_or(BootstrapError::StartUnresolved)?;

        let pm = config.package_manager.clone();
        Ok(Self {
            install: CommandSpec {
                program: pm.clone(),
                args: vec!["install".to_string()],
            },
            start: CommandSpec {
                program: pm,
                args: vec!["run".to_string(), script.clone()],
            },
            script,
        })
    }
}

/// Install/start progression. Terminal states are `InstallFailed`,
/// `StartFailed` and `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootstrapPhase {
    #[default]
    Idle,
    Installing,
    InstallFailed,
    Installed,
    Starting,
    StartFailed,
    Running,
}

/// Drives the sandbox process sequence for one imported project.
pub struct Bootstrapper {
    spawner: Arc<dyn SandboxSpawner>,
    log: Arc<dyn LogSink>,
    phase: BootstrapPhase,
}

impl Bootstrapper {
    pub fn new(spawner: Arc<dyn SandboxSpawner>, log: Arc<dyn LogSink>) -> Self {
        Self {
            spawner,
            log,
            phase: BootstrapPhase::Idle,
        }
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.phase
    }

    /// Runs the install command to completion.
    ///
    /// The install process's output is forwarded to the log sink while
    /// its exit is awaited; neither blocks the other. A non-zero exit is
    /// terminal.
    pub async fn install(
        &mut self,
        plan: &RunPlan,
        project_dir: &str,
    ) -> Result<(), BootstrapError> {
        self.phase = BootstrapPhase::Installing;
        tracing::info!("Running `{}` in {}", plan.install, project_dir);
        let code = self.run_to_exit(&plan.install, project_dir).await?;
        if code != 0 {
            self.phase = BootstrapPhase::InstallFailed;
            return Err(BootstrapError::InstallFailed(code));
        }
        self.phase = BootstrapPhase::Installed;
        Ok(())
    }

    /// Launches the start command and leaves it running, its output
    /// forwarded for the rest of the session.
    pub async fn start(
        &mut self,
        plan: &RunPlan,
        project_dir: &str,
    ) -> Result<(), BootstrapError> {
        self.phase = BootstrapPhase::Starting;
        tracing::info!("Launching `{}` in {}", plan.start, project_dir);
        match self.launch(&plan.start, project_dir).await {
            Ok(()) => {
                self.phase = BootstrapPhase::Running;
                Ok(())
            }
            Err(e) => {
                self.phase = BootstrapPhase::StartFailed;
                Err(e)
            }
        }
    }

    /// Install, then start. Callers that need to observe the boundary
    /// between the two phases drive `install` and `start` themselves.
    pub async fn run(
        &mut self,
        plan: &RunPlan,
        project_dir: &str,
    ) -> Result<(), BootstrapError> {
        self.install(plan, project_dir).await?;
        self.start(plan, project_dir).await
    }

    /// Spawns a command and waits for its exit code while a separate task
    /// drains its output into the log sink.
    async fn run_to_exit(
        &self,
        command: &CommandSpec,
        cwd: &str,
    ) -> Result<i32, BootstrapError> {
        let SpawnedProcess { mut output, exit } = self
            .spawner
            .spawn(&command.program, &command.args, cwd)
            .await?;

        let log = self.log.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(line) = output.recv().await {
                log.append_line(&line);
            }
        });

        let code = exit.await.unwrap_or(-1);
        // The output channel closes on its own once the process is done;
        // joining here only keeps log lines ordered before the result.
        let _ = forwarder.await;
        Ok(code)
    }

    /// Spawns a command without waiting for it to finish. Dev servers run
    /// indefinitely; their exit, if any, is only logged.
    async fn launch(&self, command: &CommandSpec, cwd: &str) -> Result<(), BootstrapError> {
        let SpawnedProcess { mut output, exit } = self
            .spawner
            .spawn(&command.program, &command.args, cwd)
            .await?;

        let log = self.log.clone();
        tokio::spawn(async move {
            while let Some(line) = output.recv().await {
                log.append_line(&line);
            }
        });

        let command_text = command.to_string();
        tokio::spawn(async move {
            if let Ok(code) = exit.await {
                tracing::warn!("`{}` exited with code {}", command_text, code);
            }
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::memory::{MemorySandbox, ScriptedRun};
    use std::sync::Mutex;

    struct CollectingLog(Mutex<Vec<String>>);

    impl LogSink for CollectingLog {
        fn append_line(&self, line: &str) {
            self.0.lock().unwrap().push(line.to_string());
        }
    }

    fn manifest_with(scripts: &[(&str, &str)]) -> PackageJson {
        PackageJson {
            name: Some("demo".into()),
            scripts: scripts
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn run_script_is_picked_by_priority() {
        let config = ImportConfig::default();
        let manifest = manifest_with(&[("dev", "vite"), ("serve", "http-server")]);
        let plan = RunPlan::resolve(&manifest, &config).unwrap();
        assert_eq!(plan.script, "dev");
        assert_eq!(plan.start.args, vec!["run", "dev"]);

        let manifest = manifest_with(&[("start", "node ."), ("dev", "vite")]);
        let plan = RunPlan::resolve(&manifest, &config).unwrap();
        assert_eq!(plan.script, "start");
    }

    #[test]
    fn missing_scripts_fall_back_to_the_configured_default() {
        let config = ImportConfig::default();
        let plan = RunPlan::resolve(&PackageJson::default(), &config).unwrap();
        assert_eq!(plan.script, "start");

        let mut strict = ImportConfig::default();
        strict.fallback_start_script = None;
        let err = RunPlan::resolve(&PackageJson::default(), &strict);
        assert!(matches!(err, Err(BootstrapError::StartUnresolved)));
    }

    #[test]
    fn malformed_manifest_is_recovered_with_a_warning_flag() {
        let (manifest, ok) = PackageJson::parse(b"{ this is not json");
        assert!(!ok);
        assert_eq!(manifest, PackageJson::default());

        let (manifest, ok) = PackageJson::parse(br#"{"scripts":{"dev":"vite"}}"#);
        assert!(ok);
        assert_eq!(manifest.scripts.get("dev").map(String::as_str), Some("vite"));
    }

    #[tokio::test]
    async fn install_failure_is_terminal_and_start_is_not_attempted() {
        let sandbox = Arc::new(MemorySandbox::new());
        sandbox.script_run(ScriptedRun::failure(137, &["npm ERR! boom"]));
        let log = Arc::new(CollectingLog(Mutex::new(Vec::new())));

        let mut bootstrapper = Bootstrapper::new(sandbox.clone(), log.clone());
        let config = ImportConfig::default();
        let plan = RunPlan::resolve(&manifest_with(&[("dev", "vite")]), &config).unwrap();

        let err = bootstrapper.run(&plan, "/home/project").await;
        assert!(matches!(err, Err(BootstrapError::InstallFailed(137))));
        assert_eq!(bootstrapper.phase(), BootstrapPhase::InstallFailed);
        assert_eq!(sandbox.spawn_records().len(), 1);
        assert_eq!(log.0.lock().unwrap().as_slice(), ["npm ERR! boom"]);
    }

    #[tokio::test]
    async fn successful_install_launches_the_start_command() {
        let sandbox = Arc::new(MemorySandbox::new());
        sandbox.script_run(ScriptedRun::success(&["added 12 packages"]));
        sandbox.script_run(ScriptedRun::success(&["vite dev server running"]));
        let log = Arc::new(CollectingLog(Mutex::new(Vec::new())));

        let mut bootstrapper = Bootstrapper::new(sandbox.clone(), log.clone());
        let config = ImportConfig::default();
        let plan = RunPlan::resolve(&manifest_with(&[("dev", "vite")]), &config).unwrap();

        bootstrapper.run(&plan, "/home/project").await.unwrap();
        assert_eq!(bootstrapper.phase(), BootstrapPhase::Running);

        let records = sandbox.spawn_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].args, vec!["install"]);
        assert_eq!(records[1].args, vec!["run", "dev"]);
        assert_eq!(records[1].cwd, "/home/project");
    }
}
