//! Rolling conversational context per chat.
//!
//! Pure state container: a bounded FIFO window of recent messages plus
//! derived counters. No decisions happen here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// One observed chat message inside the rolling window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMessage {
    pub author: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Bounded window of recent messages for a single chat.
///
/// Oldest entries are evicted first once the window exceeds its capacity.
/// The window is advisory short-term memory, not a source of truth; it is
/// lost on restart.
#[derive(Debug, Clone)]
pub struct ChatContext {
    window: VecDeque<ContextMessage>,
    capacity: usize,
    active_users: HashSet<String>,
    messages_since_last_response: u32,
}

impl ChatContext {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            active_users: HashSet::new(),
            messages_since_last_response: 0,
        }
    }

    /// Append an observed message, evicting the oldest entry on overflow,
    /// and refresh the derived state. Always succeeds.
    pub fn update(&mut self, author: &str, text: &str, timestamp: DateTime<Utc>) {
        self.window.push_back(ContextMessage {
            author: author.to_string(),
            text: text.to_string(),
            timestamp,
        });
        if self.window.len() > self.capacity {
            self.window.pop_front();
        }
        // Recompute from the window so evicted authors drop out.
        self.active_users = self.window.iter().map(|m| m.author.clone()).collect();
        self.messages_since_last_response = self.messages_since_last_response.saturating_add(1);
    }

    /// Reset the since-last-reply counter after the bot has spoken.
    pub fn record_response_sent(&mut self) {
        self.messages_since_last_response = 0;
    }

    /// Timestamp of the newest message in the window, if any.
    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.window.back().map(|m| m.timestamp)
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&ContextMessage> {
        let start = self.window.len().saturating_sub(n);
        self.window.iter().skip(start).collect()
    }

    pub fn messages(&self) -> impl Iterator<Item = &ContextMessage> {
        self.window.iter()
    }

    pub fn active_users(&self) -> &HashSet<String> {
        &self.active_users
    }

    pub fn messages_since_last_response(&self) -> u32 {
        self.messages_since_last_response
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
