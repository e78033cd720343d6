pub mod settings;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tunables for the import pipeline: what gets filtered out, how much is
/// allowed in, and where imported projects live inside the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportConfig {
    /// Virtual root every imported project is placed under.
    pub project_root: String,
    /// Path segments that exclude a whole subtree (dependency caches,
    /// version-control metadata, build output).
    pub excluded_dirs: HashSet<String>,
    /// File extensions that are never imported (binary/media/lock/log/map).
    pub excluded_extensions: HashSet<String>,
    /// Files above this size are presumed non-essential and skipped.
    pub max_file_size_bytes: u64,
    /// Importing more files than this requires host-side confirmation.
    pub max_import_files: usize,
    /// Name of the project's own ignore file, read from the source root.
    pub ignore_file_name: String,
    /// Package manager binary used for install and run commands.
    pub package_manager: String,
    /// Run script assumed when none of the known scripts are present.
    /// `None` makes an unresolved start command a hard error.
    pub fallback_start_script: Option<String>,
}

impl ImportConfig {
    pub fn load() -> Result<Self> {
        settings::load_config()
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        let mut excluded_dirs = HashSet::new();
        let dir_segments = [
            "node_modules",
            ".git",
            ".svn",
            ".hg",
            "dist",
            "build",
            "out",
            ".next",
            ".nuxt",
            ".output",
            "coverage",
            ".cache",
            ".turbo",
            ".vercel",
            "__pycache__",
            ".idea",
            ".DS_Store",
        ];
        for segment in dir_segments {
            excluded_dirs.insert(segment.to_string());
        }

        let mut excluded_extensions = HashSet::new();
        let media_extensions = [
            "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "avif", "tiff", "mp3", "mp4",
            "avi", "mov", "wav", "webm",
        ];
        for ext in media_extensions {
            excluded_extensions.insert(ext.to_string());
        }

        let binary_extensions = [
            "exe", "dll", "so", "dylib", "bin", "dat", "db", "sqlite", "zip", "tar", "gz", "7z",
            "rar", "pdf", "woff", "woff2", "ttf", "eot", "otf", "lock", "log", "map",
        ];
        for ext in binary_extensions {
            excluded_extensions.insert(ext.to_string());
        }

        Self {
            project_root: "/home/project".to_string(),
            excluded_dirs,
            excluded_extensions,
            max_file_size_bytes: 1024 * 1024,
            max_import_files: 100,
            ignore_file_name: ".gitignore".to_string(),
            package_manager: "npm".to_string(),
            fallback_start_script: Some("start".to_string()),
        }
    }
}
