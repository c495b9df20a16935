//! Binary entrypoint: load config + profile, wire the engine to Telegram,
//! run until interrupted.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use doppel::config::{load_json_config, AppConfig};
use doppel::engine::profile::PersonalityProfile;
use doppel::engine::PersonaEngine;
use doppel::llm::openai::OpenAiBackend;
use doppel::llm::CompletionBackend;
use doppel::telegram::TelegramService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "doppel.json".to_string());
    let config: AppConfig = load_json_config(Path::new(&config_path), "APP");

    // A broken profile is fatal here, never at decision time.
    let profile = PersonalityProfile::load(&config.profile_path)
        .context("personality profile is required at startup")?;
    info!(
        name = %profile.name,
        patterns = profile.patterns.len(),
        "profile loaded"
    );

    let backend: Arc<dyn CompletionBackend> = Arc::new(OpenAiBackend::new(
        config.backend.resolve_api_key().unwrap_or_default(),
        config.backend.base_url.clone(),
        config.backend.model.clone(),
    ));
    let engine = Arc::new(PersonaEngine::new(
        Arc::new(profile),
        backend,
        config.engine.clone(),
    ));

    let service = TelegramService::new(config.telegram.clone());
    service.start(engine).await.map_err(|e| anyhow!(e))?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutting down");
    let _ = service.stop().await;

    Ok(())
}
