//! Canned response selection for the non-generative path.

use super::profile::PersonalityProfile;

/// Pick the learned response whose trigger best matches the message.
///
/// Case-folded containment match; the longest matching trigger wins as the
/// most specific one. `None` means "decided to respond but found nothing
/// to say", which the caller logs and drops.
pub fn pick<'a>(message: &str, profile: &'a PersonalityProfile) -> Option<&'a str> {
    let haystack = message.to_lowercase();
    profile
        .patterns
        .iter()
        .filter(|p| !p.trigger.trim().is_empty())
        .filter(|p| haystack.contains(&p.trigger.to_lowercase()))
        .max_by_key(|p| p.trigger.chars().count())
        .map(|p| p.response.as_str())
}
