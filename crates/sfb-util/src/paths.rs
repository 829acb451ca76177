//! Default paths for sfbd components
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/sfbd/config.toml` or `~/.config/sfbd/config.toml`
//! - Data: `$XDG_DATA_HOME/sfbd` or `~/.local/share/sfbd`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const SFB_CONFIG_ENV: &str = "SFB_CONFIG";

/// Environment variable for overriding the data directory
pub const SFB_DATA_DIR_ENV: &str = "SFB_DATA_DIR";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "sfbd";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$SFB_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/sfbd/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/sfbd/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(SFB_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the config path without checking the SFB_CONFIG env var.
pub fn config_path_without_env() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$SFB_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/sfbd` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/sfbd` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(SFB_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking the SFB_DATA_DIR env var.
/// Used for default values in configs where the env var is checked separately.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_toml_under_app_dir() {
        let path = config_path_without_env();
        assert!(path.to_string_lossy().contains("sfbd"));
        assert_eq!(path.file_name().unwrap(), "config.toml");
    }

    #[test]
    fn data_dir_contains_app_dir() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("sfbd"));
    }
}
