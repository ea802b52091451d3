use crate::errors::{WorkspaceError, WorkspaceResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use trellis_parser::ReferenceData;

pub const DEFAULT_CONFIG_NAME: &str = "trellis.config.json";

/// Trellis project configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Project-relative path opened on load and used as the last fallback
    #[serde(default)]
    pub initial_file: Option<String>,

    /// Entry names the reconciler skips
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Project-relative path of a JSON reference table; built-in HTML if absent
    #[serde(default)]
    pub reference_data: Option<String>,

    #[serde(default = "default_watch_debounce_ms")]
    pub watch_debounce_ms: u64,

    /// Element used to wrap grouped nodes
    #[serde(default)]
    pub group_container: Option<String>,
}

fn default_ignore() -> Vec<String> {
    vec![".git".to_string(), "node_modules".to_string(), ".DS_Store".to_string()]
}

fn default_watch_debounce_ms() -> u64 {
    200
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            initial_file: None,
            ignore: default_ignore(),
            reference_data: None,
            watch_debounce_ms: default_watch_debounce_ms(),
            group_container: None,
        }
    }
}

impl ProjectConfig {
    /// Load config from a project directory; defaults if there is none
    pub fn load(root: &Path) -> WorkspaceResult<Self> {
        let config_path = root.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| WorkspaceError::Config(format!("{}: {}", config_path.display(), e)))?;
            Self::from_json(&content)
        } else {
            tracing::debug!(path = %config_path.display(), "no project config, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_json(source: &str) -> WorkspaceResult<Self> {
        serde_json::from_str(source).map_err(|e| WorkspaceError::Config(e.to_string()))
    }

    /// Reference table for the project
    pub fn load_reference(&self, root: &Path) -> WorkspaceResult<ReferenceData> {
        match &self.reference_data {
            Some(relative) => {
                let path: PathBuf = root.join(relative);
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| WorkspaceError::Config(format!("{}: {}", path.display(), e)))?;
                Ok(ReferenceData::from_json(&content)?)
            }
            None => Ok(ReferenceData::html()),
        }
    }

    /// Uid of the initial file, if one is configured
    pub fn initial_file_uid(&self) -> Option<String> {
        self.initial_file.as_deref().map(trellis_common::file_uid_for_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "initialFile": "pages/index.html",
            "ignore": ["dist"],
            "referenceData": "reference.json",
            "watchDebounceMs": 50,
            "groupContainer": "section"
        }"#;

        let config = ProjectConfig::from_json(json).unwrap();
        assert_eq!(config.initial_file.as_deref(), Some("pages/index.html"));
        assert_eq!(config.ignore, vec!["dist"]);
        assert_eq!(config.watch_debounce_ms, 50);
        assert_eq!(config.group_container.as_deref(), Some("section"));
        assert_eq!(config.initial_file_uid().as_deref(), Some("ROOT/pages/index.html"));
    }

    #[test]
    fn test_default_config() {
        let config = ProjectConfig::from_json("{}").unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert!(config.ignore.contains(&".git".to_string()));
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.watch_debounce_ms, 200);
        assert!(config.load_reference(dir.path()).unwrap().is_void("br"));
    }

    #[test]
    fn test_custom_reference_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("reference.json"),
            r#"{ "elements": { "slot": { "void": true } } }"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "referenceData": "reference.json" }"#).unwrap();

        let config = ProjectConfig::load(dir.path()).unwrap();
        let reference = config.load_reference(dir.path()).unwrap();
        assert!(reference.is_void("slot"));
        assert!(!reference.contains("div"));
    }

    #[test]
    fn test_malformed_config() {
        let err = ProjectConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, WorkspaceError::Config(_)));
    }
}
