//! Repetition analysis: how provoked is the persona by the incoming message?
//!
//! Counts near-duplicates of the current message among the *same author's*
//! recent messages and maps the count onto a four-step irritation level.
//! Other authors never contribute to one author's irritation score.

use serde::{Deserialize, Serialize};

use super::context::ChatContext;
use super::similarity::similarity;

/// Two messages scoring at or above this are considered near-duplicates.
/// Tunable starting point; recalibrate against a reference corpus before
/// treating it as a compatibility contract.
pub const NEAR_DUPLICATE_THRESHOLD: f64 = 0.8;

/// Escalation classification of how repetitive the current prompt is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrritationLevel {
    None,
    Mild,
    Moderate,
    High,
}

impl IrritationLevel {
    /// Deterministic step function of the near-duplicate count.
    pub fn from_count(count: usize) -> Self {
        match count {
            0 => Self::None,
            1..=2 => Self::Mild,
            3..=4 => Self::Moderate,
            _ => Self::High,
        }
    }
}

/// Per-message analysis result. Ephemeral: recomputed for every incoming
/// message, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepetitionAnalysis {
    pub repetition_count: usize,
    pub irritation_level: IrritationLevel,
    pub should_adapt_prompt: bool,
}

impl RepetitionAnalysis {
    fn none() -> Self {
        Self {
            repetition_count: 0,
            irritation_level: IrritationLevel::None,
            should_adapt_prompt: false,
        }
    }
}

/// Scan the context window for `author`'s near-duplicates of `message`.
pub fn analyze(message: &str, author: &str, context: &ChatContext) -> RepetitionAnalysis {
    if message.trim().is_empty() {
        return RepetitionAnalysis::none();
    }

    let repetition_count = context
        .messages()
        .filter(|m| m.author == author)
        .filter(|m| similarity(message, &m.text) >= NEAR_DUPLICATE_THRESHOLD)
        .count();

    let irritation_level = IrritationLevel::from_count(repetition_count);
    RepetitionAnalysis {
        repetition_count,
        irritation_level,
        should_adapt_prompt: irritation_level != IrritationLevel::None,
    }
}
