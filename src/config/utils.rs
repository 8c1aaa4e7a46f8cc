//! Configuration loading and access helpers
//!
//! The global CONFIG is the single source of truth for configuration values.
//! Load it once at startup; if the file is missing a default config.toml is
//! written next to the binary so operators have something to edit.

use super::schemas::Config;
use crate::logger::{self, LogTag};
use crate::paths;
use once_cell::sync::OnceCell;
use std::sync::RwLock;

/// Global configuration instance
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Load configuration from the default path and initialize the global CONFIG
///
/// Writes a default config.toml when none exists.
pub fn load_config() -> Result<(), String> {
    let path = paths::get_config_path();
    let path_str = path.to_string_lossy().to_string();
    load_config_from_path(&path_str)
}

/// Load configuration from a specific file path
pub fn load_config_from_path(path: &str) -> Result<(), String> {
    let config = if std::path::Path::new(path).exists() {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;

        toml::from_str::<Config>(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path, e))?
    } else {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, writing defaults", path),
        );
        let config = Config::default();
        let contents = toml::to_string_pretty(&config)
            .map_err(|e| format!("Failed to serialize default config: {}", e))?;
        std::fs::write(path, contents)
            .map_err(|e| format!("Failed to write default config '{}': {}", path, e))?;
        config
    };

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| "Config already initialized".to_string())?;

    Ok(())
}

/// Get a snapshot of the current configuration
///
/// Falls back to defaults if the config was never loaded (tool binaries that
/// only need public endpoints).
pub fn get_config() -> Config {
    match CONFIG.get() {
        Some(lock) => lock.read().map(|c| c.clone()).unwrap_or_default(),
        None => Config::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_file_and_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.strategy.volatility_target = 0.4;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let loaded: Config = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.strategy.volatility_target, 0.4);
    }
}
