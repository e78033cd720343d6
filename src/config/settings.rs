use anyhow::Result;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::ImportConfig;

const APP_NAME: &str = "WorkbenchImport";
const CONFIG_FILE: &str = "config.json";
const METADATA_FILE: &str = "last_import.json";

/// Best-effort record of the last import, kept so the host can offer a
/// re-import after a reload. Never used to reconstruct file content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportMetadata {
    pub timestamp: DateTime<Utc>,
    pub project_root: String,
    pub package_json_found: bool,
    pub processed: bool,
    pub file_count: usize,
}

/// Returns the platform-specific configuration directory for the application.
pub fn get_config_directory() -> Option<PathBuf> {
    ProjectDirs::from("com", "workbenchimport", APP_NAME)
        .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
}

/// Loads the pipeline configuration from the config file.
/// If the file doesn't exist, it creates a default one.
/// If the file is corrupted or cannot be parsed, it logs a warning
/// and falls back to the default configuration to prevent a crash.
pub fn load_config() -> Result<ImportConfig> {
    let config_dir = get_config_directory()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    load_config_from(&config_dir)
}

pub fn load_config_from(config_dir: &Path) -> Result<ImportConfig> {
    let config_path = config_dir.join(CONFIG_FILE);

    if !config_path.exists() {
        tracing::info!(
            "Config file not found, creating default config at {:?}",
            config_path
        );
        let default_config = ImportConfig::default();
        save_config_to(&default_config, config_dir)?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(&config_path)?;
    match serde_json::from_str::<ImportConfig>(&config_content) {
        Ok(config) => {
            tracing::info!("Loaded config from {:?}", config_path);
            Ok(config)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse config file at {:?}: {}. Falling back to default config.",
                config_path,
                e
            );
            Ok(ImportConfig::default())
        }
    }
}

/// Saves the provided configuration to the config file.
pub fn save_config(config: &ImportConfig) -> Result<()> {
    let config_dir = get_config_directory()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    save_config_to(config, &config_dir)
}

pub fn save_config_to(config: &ImportConfig, config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        fs::create_dir_all(config_dir)?;
        tracing::info!("Created config directory: {:?}", config_dir);
    }

    let config_path = config_dir.join(CONFIG_FILE);
    let config_json = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_json)?;
    tracing::info!("Saved config to {:?}", config_path);

    Ok(())
}

/// Persists the metadata record for the last import. Best-effort: callers
/// log a warning on failure and move on.
pub fn save_metadata(metadata: &ImportMetadata) -> Result<()> {
    let config_dir = get_config_directory()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    save_metadata_to(metadata, &config_dir)
}

pub fn save_metadata_to(metadata: &ImportMetadata, config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        fs::create_dir_all(config_dir)?;
    }
    let path = config_dir.join(METADATA_FILE);
    fs::write(&path, serde_json::to_string_pretty(metadata)?)?;
    tracing::info!("Saved import metadata to {:?}", path);
    Ok(())
}

/// Loads the last-import record, if one exists and still parses.
pub fn load_metadata() -> Option<ImportMetadata> {
    let config_dir = get_config_directory()?;
    load_metadata_from(&config_dir)
}

pub fn load_metadata_from(config_dir: &Path) -> Option<ImportMetadata> {
    let path = config_dir.join(METADATA_FILE);
    let content = fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&content) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            tracing::warn!("Discarding unreadable import metadata at {:?}: {}", path, e);
            None
        }
    }
}
