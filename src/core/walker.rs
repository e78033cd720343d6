//! Turns a selection (hierarchical or flat) into a flat set of entries,
//! applying the path filter and the project's own ignore rules as it goes.

use std::collections::{BTreeSet, VecDeque};

use crate::config::ImportConfig;
use crate::core::filter::PathFilter;
use crate::core::ignore::{self, IgnoreRule};
use crate::core::{vjoin, Entry, ImportStats};
use crate::source::{DirectorySource, FlatFile, SourceEntry, SourceEntryKind, SourceError};

/// Result of one walk. `entries` always starts with the project root
/// directory; file entries carry their full content.
#[derive(Debug)]
pub struct WalkOutcome {
    pub entries: Vec<Entry>,
    pub stats: ImportStats,
    pub ignore_rules: Vec<IgnoreRule>,
}

pub struct DirectoryWalker<'a> {
    config: &'a ImportConfig,
}

impl<'a> DirectoryWalker<'a> {
    pub fn new(config: &'a ImportConfig) -> Self {
        Self { config }
    }

    /// Walks a hierarchical source with an iterative worklist, one
    /// directory listing at a time. A failed read of a single file or
    /// subdirectory is logged and skipped; only a failure to list the
    /// root aborts the walk.
    pub async fn walk_source(
        &self,
        source: &dyn DirectorySource,
    ) -> Result<WalkOutcome, SourceError> {
        let root_listing = source.list("").await?;
        let ignore_rules = self.load_ignore_rules(source, &root_listing).await;

        let filter = PathFilter::new(self.config);
        let root = self.config.project_root.as_str();
        let mut entries = vec![Entry::dir(root)];
        let mut stats = ImportStats::default();

        let mut worklist: VecDeque<(String, Vec<SourceEntry>)> = VecDeque::new();
        worklist.push_back((String::new(), root_listing));

        while let Some((rel_dir, listing)) = worklist.pop_front() {
            for child in listing {
                let rel = if rel_dir.is_empty() {
                    child.name.clone()
                } else {
                    format!("{rel_dir}/{}", child.name)
                };

                match child.kind {
                    SourceEntryKind::Directory => {
                        if !filter.should_import(&rel, 0, &ignore_rules) {
                            continue;
                        }
                        match source.list(&rel).await {
                            Ok(children) => {
                                entries.push(Entry::dir(vjoin(root, &rel)));
                                worklist.push_back((rel, children));
                            }
                            Err(e) => {
                                tracing::warn!("Skipping unreadable directory {}: {}", rel, e);
                                stats.read_failures += 1;
                            }
                        }
                    }
                    SourceEntryKind::File => {
                        stats.candidate_files += 1;
                        if !filter.should_import(&rel, child.size, &ignore_rules) {
                            continue;
                        }
                        match source.read(&rel).await {
                            Ok(bytes) => {
                                stats.importable_files += 1;
                                entries.push(Entry::file(vjoin(root, &rel), bytes));
                            }
                            Err(e) => {
                                tracing::warn!("Skipping unreadable file {}: {}", rel, e);
                                stats.read_failures += 1;
                            }
                        }
                    }
                }
            }
        }

        tracing::info!(
            "Walk finished: {} of {} files importable, {} read failures",
            stats.importable_files,
            stats.candidate_files,
            stats.read_failures
        );
        Ok(WalkOutcome {
            entries,
            stats,
            ignore_rules,
        })
    }

    /// Walks a flat file list. Directories are derived from the proper
    /// prefixes of every kept file's relative path, shallowest first.
    pub fn walk_flat(&self, files: &[FlatFile]) -> WalkOutcome {
        let ignore_rules = files
            .iter()
            .find(|f| normalize(&f.relative_path) == self.config.ignore_file_name)
            .map(|f| ignore::parse(&String::from_utf8_lossy(&f.bytes)))
            .unwrap_or_default();

        let filter = PathFilter::new(self.config);
        let root = self.config.project_root.as_str();
        let mut stats = ImportStats {
            candidate_files: files.len(),
            ..Default::default()
        };

        let mut kept: Vec<(&str, &FlatFile)> = Vec::new();
        for file in files {
            let rel = normalize(&file.relative_path);
            if rel.is_empty() {
                continue;
            }
            if filter.should_import(rel, file.bytes.len() as u64, &ignore_rules) {
                kept.push((rel, file));
            }
        }
        stats.importable_files = kept.len();

        // (depth, path) ordering gives parents before children.
        let mut dir_prefixes: BTreeSet<(usize, String)> = BTreeSet::new();
        for (rel, _) in &kept {
            let segments: Vec<&str> = rel.split('/').collect();
            for end in 1..segments.len() {
                dir_prefixes.insert((end, segments[..end].join("/")));
            }
        }

        let mut entries = vec![Entry::dir(root)];
        for (_, prefix) in dir_prefixes {
            entries.push(Entry::dir(vjoin(root, &prefix)));
        }
        for (rel, file) in kept {
            entries.push(Entry::file(vjoin(root, rel), file.bytes.clone()));
        }

        WalkOutcome {
            entries,
            stats,
            ignore_rules,
        }
    }

    async fn load_ignore_rules(
        &self,
        source: &dyn DirectorySource,
        root_listing: &[SourceEntry],
    ) -> Vec<IgnoreRule> {
        let present = root_listing.iter().any(|e| {
            e.kind == SourceEntryKind::File && e.name == self.config.ignore_file_name
        });
        if !present {
            return Vec::new();
        }
        match source.read(&self.config.ignore_file_name).await {
            Ok(bytes) => ignore::parse(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                tracing::warn!(
                    "Could not read {}: {}. Importing without project ignore rules.",
                    self.config.ignore_file_name,
                    e
                );
                Vec::new()
            }
        }
    }
}

fn normalize(path: &str) -> &str {
    let path = path.strip_prefix("./").unwrap_or(path);
    path.trim_start_matches('/')
}
