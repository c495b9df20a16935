//! Shared config utilities for loading/saving JSON config files
//! and resolving secrets from fields or environment variables.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::engine::EngineConfig;
use crate::telegram::TelegramConfig;

/// Top-level application config. Everything has a default so a partial
/// (or missing) config file still produces a runnable setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path to the personality profile JSON produced by the offline
    /// analysis pipeline. Loading failure is fatal at startup.
    pub profile_path: PathBuf,
    pub telegram: TelegramConfig,
    pub backend: BackendConfig,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile_path: PathBuf::from("profile.json"),
            telegram: TelegramConfig::default(),
            backend: BackendConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// Completion backend connection settings (OpenAI-compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// API key (direct value).
    pub api_key: Option<String>,
    /// Or read the key from this environment variable.
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            base_url: None,
            model: None,
        }
    }
}

impl BackendConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_api_key(&self.api_key, &self.api_key_env)
    }
}

/// Generic load for any Serde config type with a `Default` implementation.
/// Falls back to `T::default()` if the file is missing or unparsable.
pub fn load_json_config<T: DeserializeOwned + Default>(path: &Path, label: &str) -> T {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<T>(&content) {
            Ok(config) => {
                info!("[{}] Loaded config from {}", label, path.display());
                config
            }
            Err(e) => {
                warn!(
                    "[{}] Failed to parse config {}: {}, using defaults",
                    label,
                    path.display(),
                    e
                );
                T::default()
            }
        },
        Err(_) => {
            info!(
                "[{}] No config file at {}, using defaults",
                label,
                path.display()
            );
            T::default()
        }
    }
}

/// Generic save for any Serde config type.
pub fn save_json_config<T: Serialize>(path: &Path, config: &T, label: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))?;
    info!("[{}] Saved config to {}", label, path.display());
    Ok(())
}

/// Resolve an API key: check the direct `api_key` field first,
/// then fall back to reading the environment variable named in `api_key_env`.
pub fn resolve_api_key(api_key: &Option<String>, api_key_env: &Option<String>) -> Option<String> {
    if let Some(ref key) = api_key {
        if !key.is_empty() {
            return Some(key.clone());
        }
    }
    if let Some(ref env_var) = api_key_env {
        if let Ok(key) = std::env::var(env_var) {
            if !key.is_empty() {
                return Some(key);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config: AppConfig =
            load_json_config(Path::new("/nonexistent/doppel.json"), "TEST");
        assert!(config.telegram.allowed_chat_ids.is_empty());
        assert_eq!(config.backend.api_key_env.as_deref(), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn config_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doppel.json");

        let mut config = AppConfig::default();
        config.profile_path = PathBuf::from("profiles/dima.json");
        config.telegram.allowed_chat_ids = vec![-100123456789];
        config.backend.model = Some("gpt-4o-mini".to_string());

        save_json_config(&path, &config, "TEST").unwrap();
        let loaded: AppConfig = load_json_config(&path, "TEST");

        assert_eq!(loaded.profile_path, PathBuf::from("profiles/dima.json"));
        assert_eq!(loaded.telegram.allowed_chat_ids, vec![-100123456789]);
        assert_eq!(loaded.backend.model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn direct_key_wins_over_env() {
        let key = resolve_api_key(
            &Some("direct-key".to_string()),
            &Some("DOPPEL_TEST_UNSET_VAR".to_string()),
        );
        assert_eq!(key.as_deref(), Some("direct-key"));
    }

    #[test]
    fn empty_direct_key_falls_through() {
        std::env::set_var("DOPPEL_TEST_KEY_VAR", "from-env");
        let key = resolve_api_key(
            &Some(String::new()),
            &Some("DOPPEL_TEST_KEY_VAR".to_string()),
        );
        assert_eq!(key.as_deref(), Some("from-env"));
        std::env::remove_var("DOPPEL_TEST_KEY_VAR");
    }
}
