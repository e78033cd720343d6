pub mod bootstrap;
pub mod error;
pub mod filter;
pub mod ignore;
pub mod materialize;
pub mod store;
pub mod walker;

/// One imported unit: a file or a directory, addressed by an absolute,
/// slash-separated virtual path (e.g. `/home/project/src/main.js`).
///
/// Virtual paths are plain strings on purpose. They name locations inside
/// the sandbox, never on the host, so platform path types do not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub path: String,
    pub kind: EntryKind,
    /// Raw bytes for files; always empty for directories.
    pub content: Vec<u8>,
    /// `true` when the content failed the text probe. The host UI uses this
    /// to decide whether an entry can be shown in the editor.
    pub is_binary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl Entry {
    pub fn file(path: impl Into<String>, content: Vec<u8>) -> Self {
        let is_binary = !crate::utils::file_detection::is_text_content(&content);
        Self {
            path: path.into(),
            kind: EntryKind::File,
            content,
            is_binary,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
            content: Vec::new(),
            is_binary: false,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Counters reported after a walk. The host needs the pre-filter and
/// post-filter numbers separately to drive its large-import confirmation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Files encountered in the source before any filtering.
    pub candidate_files: usize,
    /// Files that passed the filter and were read successfully.
    pub importable_files: usize,
    /// Files (or directory listings) skipped because reading them failed.
    pub read_failures: usize,
}

/// Joins a virtual base path and a relative, slash-separated suffix.
pub fn vjoin(base: &str, rel: &str) -> String {
    let base = base.trim_end_matches('/');
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{rel}")
    }
}

/// Number of path segments; `/home/project` has depth 2.
pub fn vdepth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

/// Parent of a virtual path, `None` at the root.
pub fn vparent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    if idx == 0 {
        None
    } else {
        Some(&trimmed[..idx])
    }
}

/// `true` when `path` equals `prefix` or lies inside it.
pub fn is_under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

pub use bootstrap::{BootstrapPhase, Bootstrapper, CommandSpec, LogSink, PackageJson, RunPlan};
pub use error::{BootstrapError, ImportError};
pub use filter::PathFilter;
pub use ignore::IgnoreRule;
pub use materialize::{materialize, MaterializeReport};
pub use store::{reconcile, shallowest_file_named, MaterializationPlan, MergeMode, ProjectStore};
pub use walker::{DirectoryWalker, WalkOutcome};
