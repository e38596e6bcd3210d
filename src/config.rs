use crate::core::error::SearchError;
use crate::core::hash::HashConfig;
use crate::core::scanner::ScanOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "simpics";
const CONFIG_FILE: &str = "config.json";

/// Defaults for scans and detections, optionally read from a JSON file.
///
/// ```json
/// { "scan": { "recursive": true }, "hash": { "algorithm": "perceptual-hash", "hash_size": 16 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scan: ScanOptions,
    pub hash: HashConfig,
}

impl Settings {
    /// `<config dir>/simpics/config.json`, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, SearchError> {
        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load `explicit` if given, else the default file when it exists, else the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, SearchError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        self.hash.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::HashAlgorithm;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "scan": { "recursive": true } }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert!(settings.scan.recursive);
        assert!(!settings.scan.follow_links);
        assert_eq!(settings.hash, HashConfig::default());
    }

    #[test]
    fn test_algorithm_aliases_in_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "hash": { "algorithm": "phash", "hash_size": 16, "max_distance": 20 } }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.hash.algorithm, HashAlgorithm::Perceptual);
        assert_eq!(settings.hash.hash_size, 16);
        assert_eq!(settings.hash.max_distance, Some(20));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        fs::write(&path, r#"{ "hash": { "algorithm": "marr-hildreth" } }"#).unwrap();
        assert!(matches!(Settings::load(&path), Err(SearchError::Json(_))));

        fs::write(&path, r#"{ "hash": { "hash_size": 128 } }"#).unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(SearchError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.json");
        assert!(matches!(
            Settings::discover(Some(&missing)),
            Err(SearchError::Io(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let settings = Settings {
            scan: ScanOptions::recursive(),
            hash: HashConfig {
                algorithm: HashAlgorithm::Block,
                ..HashConfig::default()
            },
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"block-hash\""));
        assert_eq!(serde_json::from_str::<Settings>(&json).unwrap(), settings);
    }
}
