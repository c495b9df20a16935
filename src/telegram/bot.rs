//! Long-polling loop feeding observed group messages into the engine.

use super::TelegramConfig;
use crate::engine::PersonaEngine;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::ChatAction;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Run the long-polling loop. Blocks until `shutdown_rx` fires or an error occurs.
pub async fn run_polling(
    token: String,
    config: TelegramConfig,
    engine: Arc<PersonaEngine>,
    shutdown_rx: oneshot::Receiver<()>,
) {
    let bot = Bot::new(&token);
    let config = Arc::new(config);

    let handler = Update::filter_message().endpoint(handle_message);

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![config, engine])
        .default_handler(|_upd| async {})
        .build();

    // Run the dispatcher in a spawned task so we can select on shutdown
    let shutdown_token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        dispatcher.dispatch().await;
    });

    let _ = shutdown_rx.await;
    let shutdown_result = shutdown_token.shutdown();
    match shutdown_result {
        Ok(fut) => fut.await,
        Err(e) => warn!("Failed to shutdown dispatcher: {}", e),
    }
}

/// Observe one message and maybe reply, with human-like latency.
async fn handle_message(
    bot: Bot,
    msg: Message,
    config: Arc<TelegramConfig>,
    engine: Arc<PersonaEngine>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let chat_id = msg.chat.id;

    // Access control: check whitelist
    if !config.allowed_chat_ids.is_empty() && !config.allowed_chat_ids.contains(&chat_id.0) {
        debug!("Chat {} not in whitelist, ignoring", chat_id.0);
        return Ok(());
    }

    // Only plain text drives the persona; media and service messages are
    // transport detail the engine never sees.
    let Some(text) = msg.text() else {
        return Ok(());
    };

    // Never react to other bots (or to our own echoes).
    let author = match msg.from.as_ref() {
        Some(user) if !user.is_bot => user.full_name(),
        _ => return Ok(()),
    };

    let reply = engine
        .handle_message(chat_id.0, &author, text, msg.date)
        .await;

    if let Some(reply) = reply {
        // Advisory latency: look like a human typing, not a trigger wire.
        let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
        tokio::time::sleep(Duration::from_millis(reply.delay_ms)).await;
        if let Err(e) = bot.send_message(chat_id, &reply.text).await {
            warn!("Failed to send reply to chat {}: {}", chat_id.0, e);
        }
    }

    Ok(())
}
