use crate::errors::EditorResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "mosaic.config.json";

/// Synchronization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    /// Spaces per indentation level in generated and re-indented text
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,

    /// Property that holds plain child objects
    #[serde(default = "default_property")]
    pub default_property: String,

    /// Run the action compressor before applying a batch
    #[serde(default = "default_true")]
    pub compress_actions: bool,

    /// Check the written text against the model after every apply pass
    #[serde(default = "default_true")]
    pub validate_after_apply: bool,

    /// Re-indent the whole document when a batch moved nodes around
    #[serde(default = "default_true")]
    pub reindent_all_on_reparent: bool,

    /// Debounce the host should wait before reporting text changes
    #[serde(default = "default_merge_debounce_ms")]
    pub merge_debounce_ms: u64,
}

fn default_indent_width() -> usize {
    4
}

fn default_property() -> String {
    "data".to_string()
}

fn default_true() -> bool {
    true
}

fn default_merge_debounce_ms() -> u64 {
    400
}

impl SyncConfig {
    /// Load config from a directory, falling back to defaults
    pub fn load(dir: impl AsRef<Path>) -> EditorResult<Self> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(json: &str) -> EditorResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn indent_unit(&self) -> String {
        " ".repeat(self.indent_width)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            indent_width: default_indent_width(),
            default_property: default_property(),
            compress_actions: true,
            validate_after_apply: true,
            reindent_all_on_reparent: true,
            merge_debounce_ms: default_merge_debounce_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "indentWidth": 2,
            "compressActions": false
        }"#;

        let config = SyncConfig::from_json(json).unwrap();
        assert_eq!(config.indent_width, 2);
        assert!(!config.compress_actions);
        assert_eq!(config.default_property, "data");
        assert!(config.validate_after_apply);
        assert_eq!(config.merge_debounce_ms, 400);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SyncConfig::from_json("{}").unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = std::env::temp_dir().join("mosaic-config-missing");
        let config = SyncConfig::load(&dir).unwrap();
        assert_eq!(config.indent_unit(), "    ");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(SyncConfig::from_json("{ indentWidth: }").is_err());
    }
}
