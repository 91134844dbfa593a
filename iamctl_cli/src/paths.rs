//! Centralized path management for the iamctl CLI
//!
//! Config lives under the platform config directory, the local directory
//! snapshot under the platform data directory.

use std::path::PathBuf;

/// The name of the application directory used across all platforms
const APP_DIR: &str = "iamctl";

/// The name of the local directory snapshot
const STATE_FILE: &str = "directory.json";

const CONFIG_FILE: &str = "config.toml";

/// Returns the base data directory for the application
///
/// - Linux: `~/.local/share/iamctl`
/// - macOS: `~/Library/Application Support/iamctl`
/// - Windows: `%APPDATA%/iamctl`
///
/// Falls back to `.iamctl` in the current directory.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".iamctl"))
}

/// Default path of the JSON snapshot used by the local directory backend
pub fn get_state_path() -> PathBuf {
    get_data_dir().join(STATE_FILE)
}

/// Returns the configuration directory
///
/// `XDG_CONFIG_HOME` wins on Unix-like systems.
pub fn get_config_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join(APP_DIR);
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".iamctl"))
}

pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_path_is_in_data_dir() {
        let state = get_state_path();
        assert!(state.starts_with(get_data_dir()));
        assert_eq!(
            state.file_name().and_then(|n| n.to_str()),
            Some(STATE_FILE)
        );
    }

    #[test]
    fn test_config_path_has_app_dir() {
        let path = get_config_path();
        assert!(path.to_string_lossy().contains(APP_DIR));
        assert!(path.ends_with(CONFIG_FILE));
    }
}
