//! Configuration directory for Mailbridge
//!
//! Mailbridge keeps two files in its config directory: the JSON settings
//! file with OAuth client credentials and the SQLite credential database.
//! The directory defaults to `~/.config/mailbridge/` and can be moved with
//! the `MAILBRIDGE_CONFIG_DIR` environment variable.
//!
//! Call [`init`] at application startup to bootstrap the config directory.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Name of the directory under the platform config dir
const APP_DIR: &str = "mailbridge";

/// Environment variable that replaces the config directory
pub const CONFIG_DIR_ENV: &str = "MAILBRIDGE_CONFIG_DIR";

/// OAuth client settings
pub const SETTINGS_FILE: &str = "mailbridge.json";

/// SQLite database holding account credentials
pub const CREDENTIALS_DB: &str = "accounts.db";

/// Create the config directory if needed and return it.
///
/// The directory holds refresh tokens, so on Unix it is restricted to the
/// current user.
pub fn init() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    ensure_dir(&dir)?;
    Ok(dir)
}

/// The config directory: `$MAILBRIDGE_CONFIG_DIR`, else `~/.config/mailbridge/`
pub fn config_dir() -> Option<PathBuf> {
    resolve_dir(std::env::var_os(CONFIG_DIR_ENV), dirs::config_dir())
}

fn resolve_dir(override_dir: Option<OsString>, platform_dir: Option<PathBuf>) -> Option<PathBuf> {
    match override_dir.filter(|d| !d.is_empty()) {
        Some(dir) => Some(PathBuf::from(dir)),
        None => platform_dir.map(|p| p.join(APP_DIR)),
    }
}

/// Path of the settings file
pub fn settings_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(SETTINGS_FILE))
}

/// Path of the credential database, creating its directory
pub fn credentials_db_path() -> Result<PathBuf> {
    Ok(init()?.join(CREDENTIALS_DB))
}

/// Load the settings file, or the default value when there is none
pub fn load_settings<T: DeserializeOwned + Default>() -> Result<T> {
    match settings_path() {
        Some(path) => load_json_optional(&path),
        None => Ok(T::default()),
    }
}

/// Parse a JSON file; a missing file yields the default value
pub fn load_json_optional<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        log::debug!("No config file at {}; using defaults", path.display());
        return Ok(T::default());
    }
    load_json_file(path)
}

/// Parse a JSON file that must exist
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
            .with_context(|| format!("Failed to restrict config directory: {}", dir.display()))?;
    }

    Ok(())
}
