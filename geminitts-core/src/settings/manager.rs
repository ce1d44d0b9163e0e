use crate::settings::config::Settings;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Loads [`Settings`] from a TOML file, creating it with defaults when it
/// does not exist yet.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings_path: PathBuf,
    settings: Settings,
}

impl SettingsManager {
    /// Create a settings manager using the default location
    pub fn new() -> Result<Self> {
        Self::from_path(Self::default_settings_path()?)
    }

    /// Create a settings manager from a specific path
    pub fn from_path(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            Self::write_defaults(&path)?;
        }

        let settings = Self::load_from_file_with_backup(&path)?;
        settings.validate(&path)?;

        Ok(Self {
            settings_path: path,
            settings,
        })
    }

    /// ~/.geminitts/settings.toml
    pub fn default_settings_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".geminitts").join("settings.toml"))
    }

    fn write_defaults(path: &Path) -> Result<Settings> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {parent:?}"))?;
        }

        let defaults = Settings::default();
        let contents =
            toml::to_string_pretty(&defaults).context("Failed to serialize default settings")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write default settings to {path:?}"))?;
        Ok(defaults)
    }

    /// Load settings, moving an unparseable file aside and starting over
    fn load_from_file_with_backup(path: &Path) -> Result<Settings> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {path:?}"))?;

        match toml::from_str(&contents) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                let backup_path = path.with_extension("toml.backup");
                warn!(?path, ?backup_path, error = %e, "Settings file is corrupt, replacing with defaults");
                fs::rename(path, &backup_path).with_context(|| {
                    format!("Failed to backup corrupted settings to {backup_path:?}")
                })?;

                Self::write_defaults(path)
            }
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }
}
