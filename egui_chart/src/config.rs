//! Editor configuration file.
//!
//! A JSON document holding view options and keybinds. Every field is
//! optional; missing ones fall back to their defaults.

use crate::editor::{EditorOptions, Keybinds};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub options: EditorOptions,
    pub keybinds: Keybinds,
}

impl EditorConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load `path`, logging and falling back to defaults when it is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from_path(path) {
            Ok(config) => {
                log::info!("loaded editor config from {}", path.display());
                config
            }
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no editor config at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => {
                log::warn!("ignoring editor config {}: {err}", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snap::Snap;
    use pretty_assertions::assert_eq;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("egui_chart_{}_{name}", std::process::id()))
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(EditorConfig::from_json_str("{}").unwrap(), EditorConfig::default());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            EditorConfig::from_json_str("{\"options\": 3"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("config.json");
        let mut config = EditorConfig::default();
        config.options.snap = Snap::Sixteenth;
        config.keybinds.sv = vec!["L".to_string()];
        config.save_to_path(&path).unwrap();
        let loaded = EditorConfig::load_from_path(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_falls_back() {
        let path = temp_path("does_not_exist.json");
        assert!(matches!(
            EditorConfig::load_from_path(&path),
            Err(ConfigError::Io(_))
        ));
        assert_eq!(EditorConfig::load_or_default(&path), EditorConfig::default());
    }
}
