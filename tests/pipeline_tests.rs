//! Integration tests for the import pipeline.
//!
//! Each test runs against an in-memory sandbox and collects pipeline
//! events over a channel, so the whole install/start sequence can be
//! asserted without a real runtime.

use std::sync::{Arc, Mutex, Once};

use workbench_import::app::{
    EventSink, ImportEvent, ImportOptions, ImportPipeline, ImportStage, NotificationLevel,
};
use workbench_import::config::ImportConfig;
use workbench_import::core::store::MergeMode;
use workbench_import::core::{BootstrapPhase, LogSink};
use workbench_import::sandbox::memory::{MemorySandbox, ScriptedRun};
use workbench_import::source::{
    DirectorySource, FlatFile, HostDirectorySource, SourceEntry, SourceError,
};

static LOGGING_INIT: Once = Once::new();

fn setup_test_logging() {
    LOGGING_INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Contains the test infrastructure.
mod helpers {
    use super::*;

    #[derive(Clone, Default)]
    pub struct CollectingSink {
        pub events: Arc<Mutex<Vec<ImportEvent>>>,
        pub log_lines: Arc<Mutex<Vec<String>>>,
    }

    impl EventSink for CollectingSink {
        fn send(&self, event: ImportEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl LogSink for CollectingSink {
        fn append_line(&self, line: &str) {
            self.log_lines.lock().unwrap().push(line.to_string());
        }
    }

    /// Sets up a pipeline over a fresh in-memory sandbox. Import metadata
    /// goes to a private temp directory, never the platform config dir.
    pub struct TestHarness {
        pub sandbox: Arc<MemorySandbox>,
        pub sink: CollectingSink,
        pub pipeline: ImportPipeline,
        pub metadata_dir: tempfile::TempDir,
    }

    impl TestHarness {
        pub fn new() -> Self {
            Self::with_config(ImportConfig::default())
        }

        pub fn with_config(config: ImportConfig) -> Self {
            setup_test_logging();
            let sandbox = Arc::new(MemorySandbox::new());
            let sink = CollectingSink::default();
            let metadata_dir = tempfile::tempdir().unwrap();
            let pipeline = ImportPipeline::new(
                config,
                sandbox.clone(),
                sandbox.clone(),
                Arc::new(sink.clone()),
                Arc::new(sink.clone()),
            )
            .with_metadata_dir(metadata_dir.path());
            Self {
                sandbox,
                sink,
                pipeline,
                metadata_dir,
            }
        }

        pub fn stages(&self) -> Vec<ImportStage> {
            self.sink
                .events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    ImportEvent::Stage(stage) => Some(*stage),
                    _ => None,
                })
                .collect()
        }

        pub fn notifications(&self, level: NotificationLevel) -> Vec<String> {
            self.sink
                .events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    ImportEvent::Notify(n) if n.level == level => Some(n.message.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    /// A minimal Vite-style project as a flat file list.
    pub fn vite_project() -> Vec<FlatFile> {
        vec![
            FlatFile::new(
                "package.json",
                r#"{"name":"demo","scripts":{"dev":"vite"}}"#,
            ),
            FlatFile::new("index.js", "console.log('hi')"),
        ]
    }
}

use helpers::TestHarness;

#[tokio::test]
async fn import_selects_the_dev_script_and_installs_in_the_project_dir() {
    let harness = TestHarness::new();
    harness.sandbox.script_run(ScriptedRun::success(&["added 1 package"]));
    harness
        .sandbox
        .script_run(ScriptedRun::success(&["vite ready"]));

    let outcome = harness
        .pipeline
        .import_files(&helpers::vite_project(), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.stats.candidate_files, 2);
    assert_eq!(outcome.stats.importable_files, 2);
    assert_eq!(outcome.project_dir, "/home/project");
    assert_eq!(outcome.phase, BootstrapPhase::Running);
    let plan = outcome.run_plan.unwrap();
    assert_eq!(plan.script, "dev");

    let records = harness.sandbox.spawn_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].command, "npm");
    assert_eq!(records[0].args, vec!["install"]);
    assert_eq!(records[0].cwd, "/home/project");
    assert_eq!(records[1].args, vec!["run", "dev"]);

    // Install output reached the log sink.
    assert!(harness
        .sink
        .log_lines
        .lock()
        .unwrap()
        .contains(&"added 1 package".to_string()));
}

#[tokio::test]
async fn missing_package_json_aborts_before_any_sandbox_mutation() {
    let harness = TestHarness::new();
    let files = vec![FlatFile::new("index.js", "console.log('hi')")];

    let err = harness
        .pipeline
        .import_files(&files, ImportOptions::default())
        .await;

    assert!(matches!(
        err,
        Err(workbench_import::core::ImportError::NoPackageJson)
    ));
    assert!(harness.sandbox.is_empty(), "sandbox must stay untouched");
    assert!(harness.pipeline.store_snapshot().is_empty());
    assert_eq!(harness.sandbox.spawn_records().len(), 0);
    assert!(!harness.notifications(NotificationLevel::Error).is_empty());
}

#[tokio::test]
async fn install_failure_is_reported_and_start_is_not_attempted() {
    let harness = TestHarness::new();
    harness
        .sandbox
        .script_run(ScriptedRun::failure(7, &["npm ERR! registry down"]));

    let outcome = harness
        .pipeline
        .import_files(&helpers::vite_project(), ImportOptions::default())
        .await
        .unwrap();

    // The import itself succeeded; the later stage failed.
    assert!(outcome.report.is_clean());
    assert_eq!(outcome.phase, BootstrapPhase::InstallFailed);
    assert!(outcome.bootstrap_error.is_some());
    assert_eq!(harness.sandbox.spawn_records().len(), 1);

    let errors = harness.notifications(NotificationLevel::Error);
    assert!(
        errors.iter().any(|m| m.contains("exit code 7")),
        "expected an install failure notification, got {errors:?}"
    );
    assert!(!harness.stages().contains(&ImportStage::Starting));
}

#[tokio::test]
async fn stages_are_announced_in_order_while_they_happen() {
    let harness = TestHarness::new();
    harness
        .pipeline
        .import_files(&helpers::vite_project(), ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(
        harness.stages(),
        vec![
            ImportStage::Walking,
            ImportStage::Reconciling,
            ImportStage::Materializing,
            ImportStage::Installing,
            ImportStage::Starting,
        ]
    );
}

#[tokio::test]
async fn import_metadata_lands_in_the_configured_directory() {
    let harness = TestHarness::new();
    harness
        .pipeline
        .import_files(&helpers::vite_project(), ImportOptions::default())
        .await
        .unwrap();

    let metadata =
        workbench_import::config::settings::load_metadata_from(harness.metadata_dir.path())
            .unwrap();
    assert_eq!(metadata.project_root, "/home/project");
    assert_eq!(metadata.file_count, 2);
    assert!(metadata.processed);
    assert!(metadata.package_json_found);
}

#[tokio::test]
async fn second_import_replaces_stale_entries_under_the_root() {
    let harness = TestHarness::new();

    let first = vec![
        FlatFile::new("package.json", "{}"),
        FlatFile::new("src/old.js", "old"),
    ];
    harness
        .pipeline
        .import_files(&first, ImportOptions::default())
        .await
        .unwrap();
    assert!(harness
        .sandbox
        .file_content("/home/project/src/old.js")
        .is_some());

    let second = vec![
        FlatFile::new("package.json", "{}"),
        FlatFile::new("src/new.js", "new"),
    ];
    harness
        .pipeline
        .import_files(&second, ImportOptions::default())
        .await
        .unwrap();

    let store = harness.pipeline.store_snapshot();
    assert!(!store.contains("/home/project/src/old.js"));
    assert!(store.contains("/home/project/src/new.js"));
    assert!(harness
        .sandbox
        .file_content("/home/project/src/old.js")
        .is_none());
    assert!(harness
        .sandbox
        .file_content("/home/project/src/new.js")
        .is_some());
}

#[tokio::test]
async fn additive_import_keeps_prior_entries() {
    let harness = TestHarness::new();

    harness
        .pipeline
        .import_files(&helpers::vite_project(), ImportOptions::default())
        .await
        .unwrap();

    let extra = vec![
        FlatFile::new("package.json", "{}"),
        FlatFile::new("notes.md", "remember"),
    ];
    let options = ImportOptions {
        mode: MergeMode::Additive,
        ..Default::default()
    };
    harness.pipeline.import_files(&extra, options).await.unwrap();

    let store = harness.pipeline.store_snapshot();
    assert!(store.contains("/home/project/index.js"));
    assert!(store.contains("/home/project/notes.md"));
}

#[tokio::test]
async fn large_imports_need_confirmation_and_counts_are_reported() {
    let mut config = ImportConfig::default();
    config.max_import_files = 100;
    let harness = TestHarness::with_config(config);

    let mut files: Vec<FlatFile> = (0..150)
        .map(|i| FlatFile::new(format!("src/file{i}.js"), "x"))
        .collect();
    files.push(FlatFile::new("package.json", "{}"));

    let err = harness
        .pipeline
        .import_files(&files, ImportOptions::default())
        .await;

    match err {
        Err(workbench_import::core::ImportError::ConfirmationRequired {
            candidates,
            importable,
            limit,
        }) => {
            assert_eq!(candidates, 151);
            assert_eq!(importable, 151);
            assert_eq!(limit, 100);
        }
        other => panic!("expected ConfirmationRequired, got {other:?}"),
    }
    assert!(harness.sandbox.is_empty());

    // The same import goes through once confirmed.
    let options = ImportOptions {
        confirm_large: true,
        ..Default::default()
    };
    let outcome = harness.pipeline.import_files(&files, options).await.unwrap();
    assert_eq!(outcome.stats.importable_files, 151);
}

#[tokio::test]
async fn binary_files_round_trip_byte_identical() {
    let harness = TestHarness::new();
    let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

    let files = vec![
        FlatFile::new("package.json", "{}"),
        FlatFile::new("assets/blob.wasm", payload.clone()),
    ];
    harness
        .pipeline
        .import_files(&files, ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(
        harness
            .sandbox
            .file_content("/home/project/assets/blob.wasm")
            .unwrap(),
        payload
    );
    let store = harness.pipeline.store_snapshot();
    let entry = store.get("/home/project/assets/blob.wasm").unwrap();
    assert!(entry.is_binary);
}

#[tokio::test]
async fn project_ignore_file_filters_the_flat_import() {
    let harness = TestHarness::new();
    let files = vec![
        FlatFile::new("package.json", "{}"),
        FlatFile::new(".gitignore", "dist/\n*.log\n"),
        FlatFile::new("dist/bundle.js", "built"),
        FlatFile::new("trace.log", "noise"),
        FlatFile::new("src/app.js", "code"),
    ];

    let outcome = harness
        .pipeline
        .import_files(&files, ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.stats.candidate_files, 5);
    assert_eq!(outcome.stats.importable_files, 3);
    let store = harness.pipeline.store_snapshot();
    assert!(!store.contains("/home/project/dist/bundle.js"));
    assert!(!store.contains("/home/project/trace.log"));
    assert!(store.contains("/home/project/src/app.js"));
}

#[tokio::test]
async fn directory_source_import_walks_the_tree() {
    let harness = TestHarness::new();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src/components")).unwrap();
    std::fs::create_dir_all(dir.path().join("node_modules/react")).unwrap();
    std::fs::write(
        dir.path().join("package.json"),
        r#"{"scripts":{"start":"node server.js"}}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("src/components/app.jsx"), "jsx").unwrap();
    std::fs::write(dir.path().join("node_modules/react/index.js"), "dep").unwrap();

    let source = HostDirectorySource::open(dir.path()).unwrap();
    let outcome = harness
        .pipeline
        .import_directory(&source, ImportOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.run_plan.unwrap().script, "start");
    let store = harness.pipeline.store_snapshot();
    assert!(store.contains("/home/project/src/components/app.jsx"));
    assert!(!store.contains("/home/project/node_modules/react/index.js"));
    assert!(harness
        .sandbox
        .file_content("/home/project/package.json")
        .is_some());
}

#[tokio::test]
async fn unavailable_directory_selection_is_reported_as_unsupported() {
    struct UnavailableSource;

    #[async_trait::async_trait]
    impl DirectorySource for UnavailableSource {
        async fn list(&self, _rel_dir: &str) -> Result<Vec<SourceEntry>, SourceError> {
            Err(SourceError::Unsupported("no directory picker".into()))
        }
        async fn read(&self, _rel_path: &str) -> Result<Vec<u8>, SourceError> {
            Err(SourceError::Unsupported("no directory picker".into()))
        }
    }

    let harness = TestHarness::new();
    let err = harness
        .pipeline
        .import_directory(&UnavailableSource, ImportOptions::default())
        .await;
    assert!(matches!(
        err,
        Err(workbench_import::core::ImportError::UnsupportedEnvironment)
    ));
    assert!(harness.sandbox.is_empty());

    // A plain file is refused at the source level already.
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("not-a-dir.txt");
    std::fs::write(&file, "x").unwrap();
    assert!(HostDirectorySource::open(&file).is_err());
}

#[tokio::test]
async fn concurrent_imports_are_rejected() {
    let harness = Arc::new(TestHarness::new());
    // Overlapping attempts must either win the in-flight flag or get
    // ImportInProgress; they never interleave.
    let files = helpers::vite_project();

    let a = harness.pipeline.import_files(&files, ImportOptions::default());
    let b = harness.pipeline.import_files(&files, ImportOptions::default());
    let (ra, rb) = tokio::join!(a, b);

    let failures = [&ra, &rb]
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(workbench_import::core::ImportError::ImportInProgress)
            )
        })
        .count();
    let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes + failures, 2);
    assert!(successes >= 1);
}
