//! The end-to-end import pipeline: walk, check preconditions, reconcile,
//! materialize, persist metadata, then install and start the project.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::settings::{self, ImportMetadata};
use crate::config::ImportConfig;
use crate::core::error::BootstrapError;
use crate::core::store::{reconcile, MergeMode, ProjectStore};
use crate::core::walker::{DirectoryWalker, WalkOutcome};
use crate::core::{
    materialize, shallowest_file_named, BootstrapPhase, Bootstrapper, ImportError, ImportStats,
    LogSink, MaterializeReport, PackageJson, RunPlan,
};
use crate::sandbox::{SandboxFs, SandboxSpawner};
use crate::source::{DirectorySource, FlatFile, SourceError};

use super::events::{ImportEvent, ImportStage, Notification};
use super::proxy::EventSink;

/// Per-import options supplied by the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// How the new entries combine with a prior import of the same root.
    pub mode: MergeMode,
    /// Set after the user approved an import that exceeds the file limit.
    pub confirm_large: bool,
}

/// What one import produced. Install/start failures are reported here
/// rather than as an `Err`: the import itself succeeded once
/// materialization completed.
#[derive(Debug)]
pub struct ImportOutcome {
    pub stats: ImportStats,
    pub report: MaterializeReport,
    /// Directory containing the detected `package.json`.
    pub project_dir: String,
    pub phase: BootstrapPhase,
    pub run_plan: Option<RunPlan>,
    pub bootstrap_error: Option<BootstrapError>,
}

/// Owns the file store and serializes imports against one sandbox.
pub struct ImportPipeline {
    config: ImportConfig,
    store: Mutex<ProjectStore>,
    in_flight: AtomicBool,
    metadata_dir: Option<PathBuf>,
    fs: Arc<dyn SandboxFs>,
    spawner: Arc<dyn SandboxSpawner>,
    events: Arc<dyn EventSink>,
    log: Arc<dyn LogSink>,
}

impl ImportPipeline {
    pub fn new(
        config: ImportConfig,
        fs: Arc<dyn SandboxFs>,
        spawner: Arc<dyn SandboxSpawner>,
        events: Arc<dyn EventSink>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            config,
            store: Mutex::new(ProjectStore::new()),
            in_flight: AtomicBool::new(false),
            metadata_dir: None,
            fs,
            spawner,
            events,
            log,
        }
    }

    /// Overrides where the last-import metadata record is written. Without
    /// an override it goes to the platform config directory; embedded
    /// hosts and tests point it at a private directory instead.
    pub fn with_metadata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.metadata_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Snapshot of the store as of the last reconciliation.
    pub fn store_snapshot(&self) -> ProjectStore {
        self.store.lock().unwrap().clone()
    }

    /// Imports from a hierarchical directory source.
    pub async fn import_directory(
        &self,
        source: &dyn DirectorySource,
        options: ImportOptions,
    ) -> Result<ImportOutcome, ImportError> {
        let _guard = self.acquire()?;
        self.events.send(ImportEvent::Stage(ImportStage::Walking));

        let walker = DirectoryWalker::new(&self.config);
        let outcome = walker.walk_source(source).await.map_err(|e| match e {
            SourceError::Unsupported(_) => ImportError::UnsupportedEnvironment,
            other => ImportError::Source(other),
        })?;

        self.run_import(outcome, options).await
    }

    /// Imports from a flat file list.
    pub async fn import_files(
        &self,
        files: &[FlatFile],
        options: ImportOptions,
    ) -> Result<ImportOutcome, ImportError> {
        let _guard = self.acquire()?;
        self.events.send(ImportEvent::Stage(ImportStage::Walking));

        let walker = DirectoryWalker::new(&self.config);
        let outcome = walker.walk_flat(files);
        self.run_import(outcome, options).await
    }

    fn acquire(&self) -> Result<InFlightGuard<'_>, ImportError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            tracing::warn!("Rejecting import: another import is still running");
            return Err(ImportError::ImportInProgress);
        }
        Ok(InFlightGuard { flag: &self.in_flight })
    }

    async fn run_import(
        &self,
        walk: WalkOutcome,
        options: ImportOptions,
    ) -> Result<ImportOutcome, ImportError> {
        let stats = walk.stats;
        self.events.send(ImportEvent::WalkFinished(stats));

        if stats.importable_files > self.config.max_import_files && !options.confirm_large {
            return Err(ImportError::ConfirmationRequired {
                candidates: stats.candidate_files,
                importable: stats.importable_files,
                limit: self.config.max_import_files,
            });
        }

        // Fatal precondition, checked before the store or the sandbox is
        // touched.
        let project_dir = self
            .detect_project_dir(&walk)
            .ok_or(ImportError::NoPackageJson)
            .inspect_err(|_| {
                self.notify(Notification::error(
                    "No package.json found in the selected project",
                ));
            })?;

        self.events.send(ImportEvent::Stage(ImportStage::Reconciling));
        let plan = {
            let mut store = self.store.lock().unwrap();
            reconcile(&mut store, walk.entries, &self.config.project_root, options.mode)
        };

        self.events
            .send(ImportEvent::Stage(ImportStage::Materializing));
        let report = {
            let store = self.store_snapshot();
            materialize(&plan, &store, self.fs.as_ref()).await
        };
        if !report.is_clean() {
            self.notify(Notification::error(format!(
                "{} paths could not be written to the sandbox",
                report.failed.len()
            )));
        }

        let file_count = {
            let store = self.store.lock().unwrap();
            store.file_count()
        };
        self.persist_metadata(file_count);
        self.events.send(ImportEvent::StoreUpdated {
            root: self.config.project_root.clone(),
            file_count,
        });
        self.notify(Notification::success(format!(
            "Project imported with {file_count} files"
        )));

        let (phase, run_plan, bootstrap_error) = self.bootstrap(&project_dir).await;

        Ok(ImportOutcome {
            stats,
            report,
            project_dir,
            phase,
            run_plan,
            bootstrap_error,
        })
    }

    /// The directory containing the shallowest imported `package.json`,
    /// falling back to the configured root when it sits at the top level.
    fn detect_project_dir(&self, walk: &WalkOutcome) -> Option<String> {
        shallowest_file_named(&walk.entries, "package.json").map(|e| {
            crate::core::vparent(&e.path)
                .unwrap_or(self.config.project_root.as_str())
                .to_string()
        })
    }

    async fn bootstrap(
        &self,
        project_dir: &str,
    ) -> (BootstrapPhase, Option<RunPlan>, Option<BootstrapError>) {
        let manifest_path = crate::core::vjoin(project_dir, "package.json");
        let manifest = match self.fs.read_file(&manifest_path).await {
            Ok(bytes) => {
                let (manifest, parsed) = PackageJson::parse(&bytes);
                if !parsed {
                    self.notify(Notification::info(
                        "package.json could not be parsed; assuming the default start script",
                    ));
                }
                manifest
            }
            Err(e) => {
                tracing::warn!("Could not read back {}: {}", manifest_path, e);
                self.notify(Notification::info(
                    "package.json could not be read back; assuming the default start script",
                ));
                PackageJson::default()
            }
        };

        let plan = match RunPlan::resolve(&manifest, &self.config) {
            Ok(plan) => plan,
            Err(e) => {
                self.notify(Notification::error(e.to_string()));
                return (BootstrapPhase::StartFailed, None, Some(e));
            }
        };

        self.events.send(ImportEvent::Stage(ImportStage::Installing));
        let mut bootstrapper = Bootstrapper::new(self.spawner.clone(), self.log.clone());
        if let Err(e) = bootstrapper.install(&plan, project_dir).await {
            self.notify(Notification::error(e.to_string()));
            return (bootstrapper.phase(), Some(plan), Some(e));
        }

        self.events.send(ImportEvent::Stage(ImportStage::Starting));
        match bootstrapper.start(&plan, project_dir).await {
            Ok(()) => {
                self.notify(Notification::success(format!(
                    "Dependencies installed; running `{}`",
                    plan.start
                )));
                (bootstrapper.phase(), Some(plan), None)
            }
            Err(e) => {
                self.notify(Notification::error(e.to_string()));
                (bootstrapper.phase(), Some(plan), Some(e))
            }
        }
    }

    fn persist_metadata(&self, file_count: usize) {
        let metadata = ImportMetadata {
            timestamp: Utc::now(),
            project_root: self.config.project_root.clone(),
            package_json_found: true,
            processed: true,
            file_count,
        };
        let result = match &self.metadata_dir {
            Some(dir) => settings::save_metadata_to(&metadata, dir),
            None => settings::save_metadata(&metadata),
        };
        if let Err(e) = result {
            tracing::warn!("Could not persist import metadata: {}", e);
        }
    }

    fn notify(&self, notification: Notification) {
        self.events.send(ImportEvent::Notify(notification));
    }
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
