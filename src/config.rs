//! Runtime configuration, loadable from TOML or JSON.

use serde::{ Deserialize, Serialize };

use std::path::Path;

use crate::authorized::AuthorizedConfig;
use crate::error::LprError;
use crate::image_process::LocalizerConfig;
use crate::ocr::OcrConfig;
use crate::utils::IMAGE_EXTENSIONS;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LprConfig {
    pub localizer: LocalizerConfig,
    pub ocr: OcrConfig,
    pub authorized: AuthorizedConfig,
    /// file extensions picked up when the input is a directory
    pub extensions: Vec<String>,
}

impl Default for LprConfig {
    fn default() -> Self {
        Self {
            localizer: LocalizerConfig::default(),
            ocr: OcrConfig::default(),
            authorized: AuthorizedConfig::default(),
            extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl LprConfig {

    /// Load from a `.toml` or `.json` file; missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, LprError> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| LprError::config(format!("failed to parse JSON config: {}", e))),
            other => Err(LprError::config(format!("unsupported config file extension: {:?}", other))),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, LprError> {
        toml::from_str(content)
            .map_err(|e| LprError::config(format!("failed to parse TOML config: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String, LprError> {
        toml::to_string_pretty(self)
            .map_err(|e| LprError::config(format!("failed to serialize config: {}", e)))
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = LprConfig::from_toml("").unwrap();
        assert_eq!(config.localizer.max_candidates, 10);
        assert_eq!(config.localizer.epsilon_ratio, 0.018);
        assert_eq!(config.ocr.psm, 6);
        assert_eq!(config.authorized.column, 1);
        assert_eq!(config.extensions.len(), 5);
    }

    #[test]
    fn partial_toml_overrides_only_given_keys() {
        let config = LprConfig::from_toml(
            "[localizer]\ncanny_low = 50.0\n\n[authorized]\nsheet_url = \"https://example.com/export?format=csv\"\n",
        ).unwrap();
        assert_eq!(config.localizer.canny_low, 50.0);
        assert_eq!(config.localizer.canny_high, 200.0);
        assert_eq!(config.authorized.sheet_url.as_deref(), Some("https://example.com/export?format=csv"));
        assert_eq!(config.authorized.attempts, 3);
    }

    #[test]
    fn toml_round_trip_keeps_values() {
        let mut config = LprConfig::default();
        config.ocr.lang = "por".to_string();
        let loaded = LprConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(loaded.ocr.lang, "por");
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let path = std::env::temp_dir().join(format!("lpr_gate_config_{}.yaml", std::process::id()));
        std::fs::write(&path, "x: 1").unwrap();
        let result = LprConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn json_config_is_accepted() {
        let path = std::env::temp_dir().join(format!("lpr_gate_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"ocr": {"psm": 7}}"#).unwrap();
        let result = LprConfig::load(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(result.unwrap().ocr.psm, 7);
    }
}
