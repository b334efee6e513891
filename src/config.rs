use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::appearance::NavigationAppearance;
use crate::errors::{AppError, AppResult};
use crate::security::InputValidator;

const APP_DIR_NAME: &str = "Plisn Uploader";

/// How a selection is sent to the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// One `image_data=<base64>` form POST per image.
    #[default]
    Form,
    /// All images in one multipart/form-data POST.
    Multipart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub upload_mode: UploadMode,
    pub request_timeout_secs: Option<u64>,
    pub library_dir: Option<PathBuf>,
    pub log_level: String,
    pub appearance: NavigationAppearance,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://xxx.xxx.com".to_string(),
            upload_mode: UploadMode::Form,
            request_timeout_secs: None,
            library_dir: None,
            log_level: "info".to_string(),
            appearance: NavigationAppearance::default(),
        }
    }
}

impl Config {
    /// Where album directories live, falling back to `<Pictures>/Plisn`.
    pub fn library_dir(&self) -> AppResult<PathBuf> {
        if let Some(dir) = &self.library_dir {
            return Ok(dir.clone());
        }

        dirs::picture_dir()
            .or_else(dirs::data_dir)
            .map(|dir| dir.join("Plisn"))
            .ok_or_else(|| AppError::Config("Could not find a pictures directory".to_string()))
    }
}

pub fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join(APP_DIR_NAME);

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

pub fn load_config() -> AppResult<Config> {
    load_config_from(&get_config_path()?)
}

/// Load and validate, writing defaults on first run.
///
/// A file that no longer parses is moved aside to `config.json.old` and
/// replaced with defaults.
pub fn load_config_from(config_path: &Path) -> AppResult<Config> {
    if !config_path.exists() {
        let default_config = Config::default();
        save_config_internal(config_path, &default_config)?;
        return Ok(default_config);
    }

    let config_str = fs::read_to_string(config_path)?;
    let config = match serde_json::from_str::<Config>(&config_str) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Failed to parse config file: {}. Using defaults.", e);

            let backup_path = config_path.with_extension("json.old");
            fs::copy(config_path, &backup_path)?;
            log::info!("Old configuration backed up to {}", backup_path.display());

            let default_config = Config::default();
            save_config_internal(config_path, &default_config)?;
            default_config
        }
    };

    validate_config(&config)?;
    Ok(config)
}

pub fn save_config_to(config_path: &Path, config: &Config) -> AppResult<()> {
    validate_config(config)?;
    save_config_internal(config_path, config)
}

fn save_config_internal(config_path: &Path, config: &Config) -> AppResult<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Create backup of existing config
    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(config_path, config_str)?;

    log::info!("Configuration saved to {}", config_path.display());
    Ok(())
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    InputValidator::validate_base_url(&config.base_url)?;

    if let Some(timeout) = config.request_timeout_secs {
        if timeout == 0 || timeout > 600 {
            return Err(AppError::validation(
                "request_timeout_secs",
                "Must be between 1 and 600",
            ));
        }
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    config.appearance.validate()?;

    Ok(())
}

/// Reset configuration to defaults, keeping the old file next to it.
pub fn reset_config_at(config_path: &Path) -> AppResult<Config> {
    if config_path.exists() {
        let backup_path = config_path.with_extension("json.reset_backup");
        fs::copy(config_path, &backup_path)?;
        log::info!("Existing config backed up to {}", backup_path.display());
    }

    let default_config = Config::default();
    save_config_internal(config_path, &default_config)?;

    log::info!("Configuration reset to defaults");
    Ok(default_config)
}
