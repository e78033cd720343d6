//! Decides whether a candidate path is worth importing.

use crate::config::ImportConfig;
use crate::core::ignore::IgnoreRule;

/// Static import filter over a configuration. Pure: the same inputs always
/// give the same answer, and nothing is read from disk.
pub struct PathFilter<'a> {
    config: &'a ImportConfig,
}

impl<'a> PathFilter<'a> {
    pub fn new(config: &'a ImportConfig) -> Self {
        Self { config }
    }

    /// `path` is relative to the source root and slash-separated. `size`
    /// is the file size in bytes (0 for directories).
    pub fn should_import(&self, path: &str, size: u64, ignore_rules: &[IgnoreRule]) -> bool {
        let path = path.trim_start_matches('/');

        if path
            .split('/')
            .any(|segment| self.config.excluded_dirs.contains(segment))
        {
            return false;
        }

        if let Some(ext) = final_extension(path) {
            if self.config.excluded_extensions.contains(ext) {
                return false;
            }
        }

        if size > self.config.max_file_size_bytes {
            return false;
        }

        !ignore_rules.iter().any(|rule| rule.matches(path))
    }
}

/// Final extension of the last path segment. Dotfiles like `.gitignore`
/// have no extension.
fn final_extension(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next()?;
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => Some(&name[idx + 1..]),
        _ => None,
    }
}
