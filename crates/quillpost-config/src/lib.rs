use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// Host-side settings: where attachments are resolved from, the initial
/// document, and the transfer knobs.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory relative attachment paths resolve against
    pub assets_dir: Option<PathBuf>,
    /// Document loaded at startup when none is given on the command line
    pub document_path: Option<PathBuf>,
    /// Upload size ceiling in bytes; unlimited when absent
    pub max_upload_bytes: Option<u64>,
    /// Artificial delay before each transfer starts, for demos
    pub simulated_latency_ms: Option<u64>,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the loaded paths
        config.assets_dir = config.assets_dir.map(|p| Self::expand_path(&p).unwrap_or(p));
        config.document_path = config
            .document_path
            .map(|p| Self::expand_path(&p).unwrap_or(p));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to_path(Self::config_path())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/quillpost");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_parses_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "assets_dir = \"/tmp/assets\"\nmax_upload_bytes = 1048576\nsimulated_latency_ms = 1500\n",
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap().unwrap();
        assert_eq!(config.assets_dir, Some(PathBuf::from("/tmp/assets")));
        assert_eq!(config.document_path, None);
        assert_eq!(config.max_upload_bytes, Some(1_048_576));
        assert_eq!(config.simulated_latency_ms, Some(1500));
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_upload_bytes = \"lots\"").unwrap();

        let err = Config::load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = Config {
            assets_dir: Some(PathBuf::from("/pics")),
            document_path: Some(PathBuf::from("/notes/draft.md")),
            max_upload_bytes: Some(42),
            simulated_latency_ms: None,
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap().unwrap();
        assert_eq!(loaded.assets_dir, config.assets_dir);
        assert_eq!(loaded.document_path, config.document_path);
        assert_eq!(loaded.max_upload_bytes, Some(42));
        assert_eq!(loaded.simulated_latency_ms, None);
    }

    #[test]
    fn test_env_vars_expand_in_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "assets_dir = \"$HOME/pics\"\n").unwrap();

        let config = Config::load_from_path(&path).unwrap().unwrap();
        let assets = config.assets_dir.unwrap();
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(assets, PathBuf::from(home).join("pics"));
        }
    }
}
