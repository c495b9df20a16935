//! Response arbitration: the single respond/stay-quiet decision.
//!
//! Composes the personality's base activity level, the activity-schedule
//! multiplier and the repetition escalation into one probability, rolls the
//! dice, and picks a reply strategy plus an advisory human-like delay.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::repetition::{IrritationLevel, RepetitionAnalysis};
use super::schedule::ActivityModifiers;

/// Upper bound on the composed probability. The decision must stay
/// probabilistic even under maximal provocation.
pub const MAX_RESPONSE_PROBABILITY: f64 = 0.95;

/// Whether replies may be generated by the completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    /// Canned patterns only.
    Never,
    /// Every reply goes through the backend.
    Always,
    /// Coin flip per reply, weighted by `generation_probability`.
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStrategy {
    Pattern,
    Generated,
}

/// Outcome of arbitration for one incoming message. Consumed immediately,
/// never persisted.
#[derive(Debug, Clone)]
pub struct Decision {
    pub should_respond: bool,
    pub strategy: ResponseStrategy,
    /// Advisory reply latency, not a rate limiter.
    pub target_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    pub generation_mode: GenerationMode,
    /// Probability of the generated path in `Mixed` mode.
    pub generation_probability: f64,
    /// Base reply delay before the schedule multiplier and jitter.
    pub base_delay_ms: u64,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            generation_mode: GenerationMode::Mixed,
            generation_probability: 0.5,
            base_delay_ms: 2500,
        }
    }
}

/// Stateful only in its random source. One arbitrator per chat session.
#[derive(Debug)]
pub struct ResponseArbitrator {
    config: ArbiterConfig,
    rng: StdRng,
}

impl ResponseArbitrator {
    pub fn new(config: ArbiterConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic replay for tests.
    pub fn with_seed(config: ArbiterConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn decide(
        &mut self,
        activity_level: f64,
        modifiers: &ActivityModifiers,
        analysis: &RepetitionAnalysis,
    ) -> Decision {
        let probability = (activity_level
            * modifiers.response_multiplier
            * escalation_factor(analysis.irritation_level))
        .min(MAX_RESPONSE_PROBABILITY);

        let should_respond = self.rng.gen::<f64>() < probability;

        let strategy = if !should_respond {
            ResponseStrategy::Pattern
        } else {
            match self.config.generation_mode {
                GenerationMode::Never => ResponseStrategy::Pattern,
                GenerationMode::Always => ResponseStrategy::Generated,
                GenerationMode::Mixed => {
                    if self.rng.gen::<f64>() < self.config.generation_probability {
                        ResponseStrategy::Generated
                    } else {
                        ResponseStrategy::Pattern
                    }
                }
            }
        };

        // Human-like latency: scheduled pace with a bit of jitter.
        let jitter = self.rng.gen_range(0.7..1.3);
        let target_delay_ms =
            (self.config.base_delay_ms as f64 * modifiers.delay_multiplier * jitter).round() as u64;

        Decision {
            should_respond,
            strategy,
            target_delay_ms,
        }
    }
}

/// Being provoked directly makes a reply more likely.
fn escalation_factor(level: IrritationLevel) -> f64 {
    match level {
        IrritationLevel::None => 1.0,
        IrritationLevel::Mild => 1.2,
        IrritationLevel::Moderate => 1.5,
        IrritationLevel::High => 2.0,
    }
}
