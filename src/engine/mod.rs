//! The response decision engine.
//!
//! One `PersonaEngine` serves every monitored chat. Each chat gets its own
//! session (rolling context + arbitrator) behind an async mutex: a message
//! is fully processed before the next one for the same chat starts, so the
//! repetition counters never race. Chats are independent and run
//! concurrently.

pub mod arbiter;
pub mod context;
pub mod patterns;
pub mod profile;
pub mod prompt;
pub mod repetition;
pub mod schedule;
pub mod similarity;


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::llm::provider::{CompletionBackend, CompletionRequest, LlmParams};
use arbiter::{ArbiterConfig, ResponseArbitrator, ResponseStrategy};
use context::ChatContext;
use profile::PersonalityProfile;

/// Engine tuning knobs. Passed in explicitly so tests can construct the
/// engine without any ambient configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rolling window capacity per chat.
    pub context_capacity: usize,
    /// How many recent messages ground a generated reply.
    pub context_excerpt_len: usize,
    #[serde(flatten)]
    pub arbiter: ArbiterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            context_capacity: 30,
            context_excerpt_len: 6,
            arbiter: ArbiterConfig::default(),
        }
    }
}

/// A reply the connector should deliver after `delay_ms` of human-like
/// latency.
#[derive(Debug, Clone)]
pub struct EngineReply {
    pub text: String,
    pub delay_ms: u64,
}

/// Per-chat mutable state. The mutex around it is held across the backend
/// call, which is what serializes decisions within one chat.
struct ChatSession {
    context: ChatContext,
    arbitrator: ResponseArbitrator,
}

pub struct PersonaEngine {
    profile: Arc<PersonalityProfile>,
    backend: Arc<dyn CompletionBackend>,
    config: EngineConfig,
    sessions: RwLock<HashMap<i64, Arc<Mutex<ChatSession>>>>,
    /// Base seed for per-chat arbitrators; `None` means entropy.
    seed: Option<u64>,
}

impl PersonaEngine {
    pub fn new(
        profile: Arc<PersonalityProfile>,
        backend: Arc<dyn CompletionBackend>,
        config: EngineConfig,
    ) -> Self {
        Self {
            profile,
            backend,
            config,
            sessions: RwLock::new(HashMap::new()),
            seed: None,
        }
    }

    /// Deterministic variant for tests: chat sessions derive their RNG
    /// seeds from `seed`.
    pub fn with_seed(
        profile: Arc<PersonalityProfile>,
        backend: Arc<dyn CompletionBackend>,
        config: EngineConfig,
        seed: u64,
    ) -> Self {
        Self {
            profile,
            backend,
            config,
            sessions: RwLock::new(HashMap::new()),
            seed: Some(seed),
        }
    }

    pub fn profile(&self) -> &PersonalityProfile {
        &self.profile
    }

    async fn session(&self, chat_id: i64) -> Arc<Mutex<ChatSession>> {
        if let Some(session) = self.sessions.read().await.get(&chat_id) {
            return session.clone();
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(chat_id)
            .or_insert_with(|| {
                let arbiter_config = self.config.arbiter.clone();
                let arbitrator = match self.seed {
                    Some(seed) => {
                        ResponseArbitrator::with_seed(arbiter_config, seed ^ chat_id as u64)
                    }
                    None => ResponseArbitrator::new(arbiter_config),
                };
                Arc::new(Mutex::new(ChatSession {
                    context: ChatContext::new(self.config.context_capacity),
                    arbitrator,
                }))
            })
            .clone()
    }

    /// Process one observed message and maybe produce a reply.
    ///
    /// Never returns an error: every failure on the way (backend outage,
    /// empty sanitized completion, no matching pattern) degrades to `None`,
    /// and the next message is processed normally.
    pub async fn handle_message(
        &self,
        chat_id: i64,
        author: &str,
        text: &str,
        now: DateTime<Utc>,
    ) -> Option<EngineReply> {
        let session = self.session(chat_id).await;
        let mut session = session.lock().await;

        // Analysis runs against the history as it was before this message:
        // an author with no prior entries is trivially calm, and the
        // inactivity period measures the gap this message just ended.
        let analysis = repetition::analyze(text, author, &session.context);
        let modifiers = schedule::modifiers(now, session.context.last_message_at(), &self.profile.schedule);
        session.context.update(author, text, now);

        let decision = session.arbitrator.decide(
            self.profile.response_style.activity_level,
            &modifiers,
            &analysis,
        );
        debug!(
            chat_id,
            author,
            repetition = analysis.repetition_count,
            irritation = ?analysis.irritation_level,
            active_time = modifiers.is_active_time,
            pending = session.context.messages_since_last_response(),
            respond = decision.should_respond,
            "arbitrated"
        );
        if !decision.should_respond {
            return None;
        }

        let reply_text = match decision.strategy {
            ResponseStrategy::Pattern => match patterns::pick(text, &self.profile) {
                Some(response) => response.to_string(),
                None => {
                    debug!(chat_id, "pattern path found nothing to say");
                    return None;
                }
            },
            ResponseStrategy::Generated => {
                match self.generate(text, author, &session.context, &analysis).await {
                    Some(reply) => reply,
                    None => return None,
                }
            }
        };

        // The persona's own message is part of the conversation the window
        // tracks; the counter resets after the append.
        let name = self.profile.name.clone();
        session.context.update(&name, &reply_text, now);
        session.context.record_response_sent();

        Some(EngineReply {
            text: reply_text,
            delay_ms: decision.target_delay_ms,
        })
    }

    async fn generate(
        &self,
        text: &str,
        author: &str,
        context: &ChatContext,
        analysis: &repetition::RepetitionAnalysis,
    ) -> Option<String> {
        let shaped = prompt::build(
            text,
            author,
            context,
            &self.profile,
            analysis,
            self.config.context_excerpt_len,
        );
        let request = CompletionRequest {
            instructions: shaped.instructions,
            content: shaped.content,
            params: style_params(&self.profile.response_style),
        };
        let raw = match self.backend.complete(request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(backend = self.backend.id(), error = %e, "completion failed, staying silent");
                return None;
            }
        };
        match prompt::sanitize_reply(&raw, &self.profile.all_name_variants()) {
            Some(reply) => Some(reply),
            None => {
                warn!("completion empty after sanitization, staying silent");
                None
            }
        }
    }
}

/// Style parameters for the completion call, derived from the learned
/// response style.
fn style_params(style: &profile::ResponseStyle) -> LlmParams {
    // Rough chars-to-tokens conversion with generous headroom.
    let max_tokens = ((style.average_length / 2).max(48) as u32).min(512);
    LlmParams {
        temperature: Some(0.9),
        max_tokens: Some(max_tokens),
        frequency_penalty: Some(0.4),
        presence_penalty: Some(0.2),
        ..LlmParams::default()
    }
}

pub use arbiter::GenerationMode;
pub use profile::ProfileError;
