//! Applies a materialization plan to the sandbox filesystem, best-effort.

use crate::core::store::{MaterializationPlan, ProjectStore};
use crate::core::EntryKind;
use crate::sandbox::SandboxFs;

/// One path that could not be materialized, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPath {
    pub path: String,
    pub reason: String,
}

/// Aggregate result of a materialization pass. Individual failures never
/// abort the pass; they are collected here and surfaced at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub directories_created: usize,
    pub files_written: usize,
    pub failed: Vec<FailedPath>,
}

impl MaterializeReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Issues, in order: the optional root clear, one recursive mkdir per
/// planned directory, then one overwriting write per planned file.
pub async fn materialize(
    plan: &MaterializationPlan,
    store: &ProjectStore,
    sandbox: &dyn SandboxFs,
) -> MaterializeReport {
    let mut report = MaterializeReport::default();

    if let Some(root) = &plan.clear_root {
        if let Err(e) = sandbox.rm(root, true, true).await {
            tracing::warn!("Failed to clear {} before import: {}", root, e);
            report.failed.push(FailedPath {
                path: root.clone(),
                reason: e.to_string(),
            });
        }
    }

    for dir in &plan.directories {
        match sandbox.mkdir(dir, true).await {
            Ok(()) => report.directories_created += 1,
            Err(e) => {
                tracing::warn!("mkdir failed for {}: {}", dir, e);
                report.failed.push(FailedPath {
                    path: dir.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for path in &plan.files {
        let entry = match store.get(path) {
            Some(entry) if entry.kind == EntryKind::File => entry,
            _ => {
                tracing::warn!("Planned file {} is no longer in the store", path);
                report.failed.push(FailedPath {
                    path: path.clone(),
                    reason: "missing from store".to_string(),
                });
                continue;
            }
        };
        match sandbox.write_file(path, &entry.content).await {
            Ok(()) => report.files_written += 1,
            Err(e) => {
                tracing::warn!("write failed for {}: {}", path, e);
                report.failed.push(FailedPath {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        "Materialized {} directories and {} files ({} failures)",
        report.directories_created,
        report.files_written,
        report.failed.len()
    );
    report
}
