//! Session configuration loader.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`SessionConfig`]. Falls back to defaults when the file is missing or
//! malformed; a malformed file is worth a warning, a missing one is not.

use std::path::Path;

use colloquy_types::config::SessionConfig;

/// Load session configuration from `{data_dir}/config.toml`.
pub async fn load_session_config(data_dir: &Path) -> SessionConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml at {}, using defaults", config_path.display());
            return SessionConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return SessionConfig::default();
        }
    };

    match toml::from_str::<SessionConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            SessionConfig::default()
        }
    }
}
