//! Activity scheduling: would this person be around right now?
//!
//! Derives multiplicative adjustments for response probability and reply
//! delay from the time of day, the learned schedule and how long the chat
//! has been silent. Multipliers feed straight into the arbitrator's
//! probability composition, so they must stay strictly positive.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::profile::SchedulePattern;

/// Lower bound for both multipliers. A multiplier of 0 would make the
/// persona permanently mute.
pub const MULTIPLIER_FLOOR: f64 = 0.05;

/// Chat silence longer than this (minutes) encourages re-engagement.
const LONG_SILENCE_MINUTES: i64 = 60;
/// Silence shorter than this (minutes) means a live back-and-forth the
/// persona should not dominate.
const RAPID_EXCHANGE_MINUTES: i64 = 5;

/// Time-derived adjustments. Ephemeral: recomputed on demand, never cached
/// across a clock boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityModifiers {
    pub is_active_time: bool,
    pub response_multiplier: f64,
    pub delay_multiplier: f64,
    /// Minutes since the last chat message.
    pub inactivity_period: i64,
}

/// Compute modifiers for `now` given the newest prior message timestamp.
/// `last_message` of `None` (nothing observed yet) counts as long silence.
pub fn modifiers(
    now: DateTime<Utc>,
    last_message: Option<DateTime<Utc>>,
    schedule: &SchedulePattern,
) -> ActivityModifiers {
    let hour = now.hour();
    let weekday = now.weekday().num_days_from_monday();
    let is_active_time =
        schedule.active_hours.contains(&hour) && schedule.active_days.contains(&weekday);

    // Time-of-day bucket baseline.
    let (mut response_multiplier, mut delay_multiplier): (f64, f64) = match hour {
        0..=6 => (0.3, 2.2),
        7..=11 => (0.8, 1.2),
        12..=17 => (1.0, 1.0),
        _ => (1.2, 0.8),
    };

    if !is_active_time {
        response_multiplier *= 0.5;
        delay_multiplier *= 1.5;
    }

    let inactivity_period = last_message
        .map(|t| (now - t).num_minutes().max(0))
        .unwrap_or(24 * 60);

    if inactivity_period > LONG_SILENCE_MINUTES {
        response_multiplier *= 1.5;
    } else if inactivity_period < RAPID_EXCHANGE_MINUTES {
        response_multiplier *= 0.7;
    }

    let response_multiplier = response_multiplier.max(MULTIPLIER_FLOOR);
    let delay_multiplier = delay_multiplier.max(MULTIPLIER_FLOOR);
    debug_assert!(response_multiplier > 0.0 && delay_multiplier > 0.0);

    ActivityModifiers {
        is_active_time,
        response_multiplier,
        delay_multiplier,
        inactivity_period,
    }
}
