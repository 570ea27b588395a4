//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use capscan_analysis::HttpAnalysisConfig;
use capscan_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// SQLite database holding runs and capabilities
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Directories searched for relative document paths
    #[serde(default)]
    pub upload_dirs: Vec<PathBuf>,

    /// Analysis task API connection
    #[serde(default = "default_analysis")]
    pub analysis: HttpAnalysisConfig,

    /// Pipeline tuning
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
}

impl CliConfig {
    /// Directory holding the configuration and default database.
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".capscan"))
    }

    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load configuration from `path`, or the default location.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::path()?,
        };

        let config = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            toml::from_str(&contents)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`, or the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::path()?,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.analysis.base_url.trim().is_empty() {
            return Err(CliError::Config("analysis.base_url must be set".into()));
        }
        self.extractor.validate().map_err(CliError::Config)
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            upload_dirs: Vec::new(),
            analysis: default_analysis(),
            extractor: ExtractorConfig::default(),
            settings: Settings::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_database_path() -> PathBuf {
    CliConfig::home_dir()
        .map(|dir| dir.join("capscan.db"))
        .unwrap_or_else(|_| PathBuf::from("capscan.db"))
}

fn default_analysis() -> HttpAnalysisConfig {
    HttpAnalysisConfig::new("http://localhost:8000")
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert!(config.settings.color);
        assert_eq!(config.settings.format, OutputFormat::Table);
        assert!(config.database_path.ends_with("capscan.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
database_path = "/var/lib/capscan/runs.db"

[analysis]
base_url = "https://analysis.example.com"

[extractor]
standardize_threshold = 40
"#,
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/var/lib/capscan/runs.db"));
        assert_eq!(config.analysis.base_url, "https://analysis.example.com");
        assert_eq!(config.extractor.standardize_threshold, 40);
        assert_eq!(config.extractor.max_chunk_size, 80_000);
        assert!(config.upload_dirs.is_empty());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.extractor.standardize_threshold, 150);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = CliConfig::default();
        config.upload_dirs.push(PathBuf::from("/srv/uploads"));
        config.settings.format = OutputFormat::Json;
        config.save(Some(&path)).unwrap();

        let loaded = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.upload_dirs, vec![PathBuf::from("/srv/uploads")]);
        assert_eq!(loaded.settings.format, OutputFormat::Json);
    }

    #[test]
    fn test_invalid_extractor_section_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[extractor]\nmax_chunk_size = 0\n").unwrap();
        assert!(matches!(
            CliConfig::load(Some(&path)),
            Err(CliError::Config(_))
        ));
    }
}
