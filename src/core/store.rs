//! The in-memory file store and the reconciliation step that merges a
//! walk's entries into it while planning the sandbox materialization.

use std::collections::BTreeMap;

use crate::core::{is_under, vdepth, vparent, Entry, EntryKind};

/// Mapping from virtual path to entry. Mutated only by [`reconcile`];
/// everything else gets a snapshot of whatever the last reconciliation
/// produced.
#[derive(Debug, Clone, Default)]
pub struct ProjectStore {
    entries: BTreeMap<String, Entry>,
}

impl ProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of file entries (directories excluded).
    pub fn file_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| e.kind == EntryKind::File)
            .count()
    }

}

/// Shallowest file named `name` among `entries`, if present. Used to pick
/// the project's `package.json` when nested copies exist.
pub fn shallowest_file_named<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
    name: &str,
) -> Option<&'a Entry> {
    entries
        .into_iter()
        .filter(|e| e.kind == EntryKind::File)
        .filter(|e| e.path.rsplit('/').next() == Some(name))
        .min_by_key(|e| vdepth(&e.path))
}

/// How new entries combine with what a prior import left in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Remove everything under the root prefix first, then insert. The
    /// plan clears the sandbox root before repopulating it.
    #[default]
    Replace,
    /// Keep existing entries; new ones overwrite on path collision only.
    Additive,
}

/// Ordered instructions for the materializer: directories by ascending
/// depth, then files. Every file's ancestor chain appears among the
/// directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializationPlan {
    /// Root to clear in the sandbox before applying, when replacing.
    pub clear_root: Option<String>,
    pub directories: Vec<String>,
    pub files: Vec<String>,
}

/// Merges `new_entries` into `store` and returns the materialization plan.
///
/// Missing ancestor directories are synthesized, so after reconciliation
/// every file path's full ancestor chain is present as directory entries.
/// Re-running with an identical entry set leaves the store unchanged.
pub fn reconcile(
    store: &mut ProjectStore,
    new_entries: Vec<Entry>,
    root_prefix: &str,
    mode: MergeMode,
) -> MaterializationPlan {
    if mode == MergeMode::Replace {
        let stale: Vec<String> = store
            .entries
            .keys()
            .filter(|path| is_under(path, root_prefix))
            .cloned()
            .collect();
        if !stale.is_empty() {
            tracing::info!(
                "Removing {} stale entries under {} before merge",
                stale.len(),
                root_prefix
            );
        }
        for path in stale {
            store.entries.remove(&path);
        }
    }

    // Index the incoming set, directories first so that a directory entry
    // is never clobbered by a same-path file from a malformed source.
    let mut incoming: BTreeMap<String, Entry> = BTreeMap::new();
    for entry in new_entries {
        match entry.kind {
            EntryKind::Directory => {
                incoming.entry(entry.path.clone()).or_insert(entry);
            }
            EntryKind::File => {
                incoming.insert(entry.path.clone(), entry);
            }
        }
    }

    // Synthesize any ancestor directories the walk did not emit.
    let file_paths: Vec<String> = incoming
        .values()
        .filter(|e| e.kind == EntryKind::File)
        .map(|e| e.path.clone())
        .collect();
    for path in file_paths {
        let mut current = vparent(&path).map(str::to_string);
        while let Some(dir) = current {
            incoming
                .entry(dir.clone())
                .or_insert_with(|| Entry::dir(dir.clone()));
            if dir == root_prefix {
                break;
            }
            current = vparent(&dir).map(str::to_string);
        }
    }

    let mut directories: Vec<String> = incoming
        .values()
        .filter(|e| e.kind == EntryKind::Directory)
        .map(|e| e.path.clone())
        .collect();
    directories.sort_by_key(|p| (vdepth(p), p.clone()));

    let files: Vec<String> = incoming
        .values()
        .filter(|e| e.kind == EntryKind::File)
        .map(|e| e.path.clone())
        .collect();

    for (path, entry) in incoming {
        store.entries.insert(path, entry);
    }

    MaterializationPlan {
        clear_root: (mode == MergeMode::Replace).then(|| root_prefix.to_string()),
        directories,
        files,
    }
}
