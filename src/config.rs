use crate::{case_map::DATA_DIR_NAME, error::KeeperError, starfield};
use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const APP_DIR_NAME: &str = "loadorder-keeper";
pub const PLUGINS_FILE_NAME: &str = "Plugins.txt";
pub const REFERENCE_FILE_NAME: &str = "Plugins.reference.txt";
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub app_data_path: PathBuf,
    #[serde(default)]
    pub game_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_check_interval_seconds: Option<i64>,
}

impl AppConfig {
    pub fn load_or_create() -> Result<Self> {
        let path = config_path()?;
        let mut config = if path.exists() {
            match Self::load_from(&path) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!("ignoring unreadable settings at {}: {err:#}", path.display());
                    AppConfig::default()
                }
            }
        } else {
            AppConfig::default()
        };

        if config.fill_detected_paths() || !path.exists() {
            config.save()?;
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).context("read app config")?;
        let config = serde_json::from_str(&raw).context("parse app config")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().context("config parent dir")?;
        fs::create_dir_all(parent).context("create app data dir")?;
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        fs::write(path, raw).context("write app config")?;
        Ok(())
    }

    /// Fills empty paths from auto-detection. Returns true when anything changed.
    pub fn fill_detected_paths(&mut self) -> bool {
        let mut changed = false;
        if self.game_path.as_os_str().is_empty() {
            if let Some(path) = starfield::find_game_root() {
                tracing::info!("detected game folder {}", path.display());
                self.game_path = path;
                changed = true;
            }
        }
        if self.app_data_path.as_os_str().is_empty() {
            if let Some(path) = starfield::find_app_data_dir() {
                tracing::info!("detected AppData folder {}", path.display());
                self.app_data_path = path;
                changed = true;
            }
        }
        changed
    }

    pub fn plugins_file_path(&self) -> PathBuf {
        self.app_data_path.join(PLUGINS_FILE_NAME)
    }

    pub fn reference_file_path(&self) -> PathBuf {
        self.app_data_path.join(REFERENCE_FILE_NAME)
    }

    pub fn data_dir_path(&self) -> PathBuf {
        self.game_path.join(DATA_DIR_NAME)
    }

    pub fn monitor_interval(&self) -> Duration {
        let secs = match self.plugin_check_interval_seconds {
            Some(value) if value > 0 => value as u64,
            _ => DEFAULT_CHECK_INTERVAL_SECS,
        };
        Duration::from_secs(secs)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> std::result::Result<(), KeeperError> {
        if self.app_data_path.as_os_str().is_empty() {
            return Err(KeeperError::invalid("AppData folder is not set"));
        }
        if self.game_path.as_os_str().is_empty() {
            return Err(KeeperError::invalid("game folder is not set"));
        }
        if !self.app_data_path.is_dir() {
            return Err(KeeperError::invalid(format!(
                "AppData folder does not exist: {}",
                self.app_data_path.display()
            )));
        }
        if !self.game_path.is_dir() {
            return Err(KeeperError::invalid(format!(
                "game folder does not exist: {}",
                self.game_path.display()
            )));
        }
        if !self.data_dir_path().is_dir() {
            return Err(KeeperError::invalid(format!(
                "game folder has no {DATA_DIR_NAME} directory: {}",
                self.game_path.display()
            )));
        }
        Ok(())
    }
}

pub fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join(APP_DIR_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(base_data_dir()?.join("config.json"))
}
