//! Personality profile: the static description of the simulated speaker.
//!
//! Produced by the external offline analysis pipeline, loaded once at
//! startup and read-only for the lifetime of the process. Validation is
//! eager; a broken profile aborts startup instead of surfacing at decision
//! time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A learned canned exchange: if the trigger phrase appears in an incoming
/// message, `response` is a plausible thing this person would say.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePattern {
    pub trigger: String,
    pub response: String,
}

/// Learned surface features of how this person writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseStyle {
    /// Typical reply length in characters.
    pub average_length: usize,
    /// Most frequent words, most frequent first.
    pub common_words: Vec<String>,
    /// Most frequent emojis, most frequent first.
    pub common_emojis: Vec<String>,
    /// 0.0 = slang-heavy, 1.0 = very formal.
    pub formality_level: f64,
    /// Base willingness to speak at all, in [0, 1].
    pub activity_level: f64,
}

impl Default for ResponseStyle {
    fn default() -> Self {
        Self {
            average_length: 60,
            common_words: Vec::new(),
            common_emojis: Vec::new(),
            formality_level: 0.5,
            activity_level: 0.3,
        }
    }
}

/// When this person is usually around. Days are 0..=6 with 0 = Monday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulePattern {
    pub active_hours: BTreeSet<u32>,
    pub active_days: BTreeSet<u32>,
}

impl Default for SchedulePattern {
    fn default() -> Self {
        Self {
            active_hours: (9..=23).collect(),
            active_days: (0..=6).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityProfile {
    /// Display name the persona posts under.
    pub name: String,
    /// Known spellings of the name, used when stripping self-attribution
    /// prefixes from generated replies.
    pub name_variants: Vec<String>,
    pub patterns: Vec<ResponsePattern>,
    pub response_style: ResponseStyle,
    pub schedule: SchedulePattern,
}

impl Default for PersonalityProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            name_variants: Vec::new(),
            patterns: Vec::new(),
            response_style: ResponseStyle::default(),
            schedule: SchedulePattern::default(),
        }
    }
}

/// Fatal configuration errors. Detected at load, never at decision time.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse profile {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("profile name must not be empty")]
    EmptyName,
    #[error("response_style.{field} must be within [0, 1], got {value}")]
    StyleOutOfRange { field: &'static str, value: f64 },
    #[error("schedule.active_hours must contain at least one hour")]
    EmptyActiveHours,
    #[error("schedule.active_days must contain at least one day")]
    EmptyActiveDays,
    #[error("schedule hour {0} is out of range 0..=23")]
    HourOutOfRange(u32),
    #[error("schedule day {0} is out of range 0..=6 (0 = Monday)")]
    DayOutOfRange(u32),
}

impl PersonalityProfile {
    /// Load and validate a profile from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let profile: Self =
            serde_json::from_str(&content).map_err(|source| ProfileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.name.trim().is_empty() {
            return Err(ProfileError::EmptyName);
        }
        for (field, value) in [
            ("formality_level", self.response_style.formality_level),
            ("activity_level", self.response_style.activity_level),
        ] {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(ProfileError::StyleOutOfRange { field, value });
            }
        }
        if self.schedule.active_hours.is_empty() {
            return Err(ProfileError::EmptyActiveHours);
        }
        if self.schedule.active_days.is_empty() {
            return Err(ProfileError::EmptyActiveDays);
        }
        if let Some(&hour) = self.schedule.active_hours.iter().find(|&&h| h > 23) {
            return Err(ProfileError::HourOutOfRange(hour));
        }
        if let Some(&day) = self.schedule.active_days.iter().find(|&&d| d > 6) {
            return Err(ProfileError::DayOutOfRange(day));
        }
        Ok(())
    }

    /// The display name plus every known variant, for sanitization.
    pub fn all_name_variants(&self) -> Vec<String> {
        let mut variants = vec![self.name.clone()];
        for v in &self.name_variants {
            if !variants.iter().any(|known| known.eq_ignore_ascii_case(v)) {
                variants.push(v.clone());
            }
        }
        variants
    }
}
