//! Telegram connector: lifecycle management and configuration.

pub mod bot;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tracing::info;

use crate::engine::PersonaEngine;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token (direct value).
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Or read the token from this environment variable.
    #[serde(default)]
    pub bot_token_env: Option<String>,
    /// Chat ID whitelist. Empty list = observe every chat.
    #[serde(default)]
    pub allowed_chat_ids: Vec<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            bot_token_env: Some("TELEGRAM_BOT_TOKEN".to_string()),
            allowed_chat_ids: Vec::new(),
        }
    }
}

impl TelegramConfig {
    /// Resolve the bot token: check the direct field first, then the env var.
    pub fn resolve_bot_token(&self) -> Option<String> {
        crate::config::resolve_api_key(&self.bot_token, &self.bot_token_env)
    }
}

/// Start/stop wrapper around the polling loop.
#[derive(Clone)]
pub struct TelegramService {
    config: Arc<RwLock<TelegramConfig>>,
    /// Sender half of the shutdown signal. `Some` = bot is running.
    shutdown_tx: Arc<RwLock<Option<oneshot::Sender<()>>>>,
}

impl TelegramService {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            shutdown_tx: Arc::new(RwLock::new(None)),
        }
    }

    /// Whether the polling loop is currently running.
    pub async fn is_running(&self) -> bool {
        self.shutdown_tx.read().await.is_some()
    }

    /// Start the polling loop. Returns Err if already running or no token.
    pub async fn start(&self, engine: Arc<PersonaEngine>) -> Result<(), String> {
        if self.is_running().await {
            return Err("Telegram bot is already running".to_string());
        }

        let config = self.config.read().await.clone();
        let token = config
            .resolve_bot_token()
            .ok_or("No bot token configured")?;

        let (tx, rx) = oneshot::channel::<()>();
        {
            let mut shutdown = self.shutdown_tx.write().await;
            *shutdown = Some(tx);
        }

        let shutdown_flag = self.shutdown_tx.clone();

        tokio::spawn(async move {
            info!("Bot polling started");
            bot::run_polling(token, config, engine, rx).await;
            info!("Bot polling stopped");
            // Clear the shutdown sender so is_running() returns false
            let mut guard = shutdown_flag.write().await;
            *guard = None;
        });

        Ok(())
    }

    /// Stop the polling loop gracefully.
    pub async fn stop(&self) -> Result<(), String> {
        let mut shutdown = self.shutdown_tx.write().await;
        if let Some(tx) = shutdown.take() {
            let _ = tx.send(());
            Ok(())
        } else {
            Err("Telegram bot is not running".to_string())
        }
    }
}
