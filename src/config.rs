use std::{
    fs,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{write_atomic, NotepadError, Result};

/// Seconds between reminder scans.
pub const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 60;

/// Application configuration settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory holding the `notes`, `todos` and `settings` values
    pub data_dir: PathBuf,

    /// Where `export` writes backup files when no output is given
    pub export_dir: PathBuf,

    /// How often the reminder scheduler scans todos (in seconds)
    pub reminder_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = ProjectDirs::from("", "", "notepad")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".notepad"));

        Self {
            data_dir,
            export_dir: PathBuf::from("."),
            reminder_interval_secs: DEFAULT_REMINDER_INTERVAL_SECS,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "notepad").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Loads configuration from `path`.
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// read or parsed is a [`NotepadError::ConfigError`].
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|e| NotepadError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| NotepadError::ConfigError {
            message: format!("invalid config {}: {}", path.display(), e),
        })?;
        config.validate()?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file is created with the defaults.
    ///
    /// Failing to write the new file is logged and otherwise ignored.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        let config = Self::default();
        match config.save(path) {
            Ok(()) => info!("Wrote default configuration to {}", path.display()),
            Err(e) => warn!("Could not write default config {}: {}", path.display(), e),
        }
        Ok(config)
    }

    /// Writes the configuration as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.reminder_interval_secs == 0 {
            return Err(NotepadError::ConfigError {
                message: "reminder_interval_secs must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.reminder_interval_secs, 60);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"data_dir":"/tmp/np","reminder_interval_secs":5}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/np"));
        assert_eq!(config.reminder_interval_secs, 5);
        assert_eq!(config.export_dir, Config::default().export_dir);
    }

    #[test]
    fn malformed_or_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(NotepadError::ConfigError { .. })
        ));

        fs::write(&path, r#"{"reminder_interval_secs":0}"#).unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(NotepadError::ConfigError { .. })
        ));
    }

    #[test]
    fn first_run_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.json");

        let config = Config::load_or_init(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        fs::write(&path, r#"{"reminder_interval_secs":15}"#).unwrap();
        assert_eq!(Config::load_or_init(&path).unwrap().reminder_interval_secs, 15);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            data_dir: dir.path().join("data"),
            export_dir: dir.path().join("exports"),
            reminder_interval_secs: 30,
        };

        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
