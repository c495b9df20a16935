//! Prompt shaping for the completion backend, and sanitization of what
//! comes back.
//!
//! The instructions describe the persona (tone from the learned formality
//! tier, favorite words and emojis, target length) and, when the analyzer
//! flagged repetition, a tone directive scaled to the irritation level.
//! The content carries a verbatim excerpt of the recent conversation.

use super::context::ChatContext;
use super::profile::PersonalityProfile;
use super::repetition::{IrritationLevel, RepetitionAnalysis};

/// Instruction/content pair for one completion call.
#[derive(Debug, Clone)]
pub struct ShapedPrompt {
    pub instructions: String,
    pub content: String,
}

/// Build the prompt for a generated reply to `message` from `author`.
pub fn build(
    message: &str,
    author: &str,
    context: &ChatContext,
    profile: &PersonalityProfile,
    analysis: &RepetitionAnalysis,
    excerpt_len: usize,
) -> ShapedPrompt {
    let style = &profile.response_style;
    let mut parts = Vec::new();

    parts.push(format!(
        "You are {}, a real person chatting in a group. Write exactly the way {} would.",
        profile.name, profile.name
    ));
    parts.push(format!("Your tone is {}.", tone_words(style.formality_level)));

    if !style.common_words.is_empty() {
        parts.push(format!(
            "Words you often use: {}.",
            style.common_words
                .iter()
                .take(8)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    if !style.common_emojis.is_empty() {
        parts.push(format!(
            "Emojis you sometimes use: {}.",
            style.common_emojis
                .iter()
                .take(5)
                .cloned()
                .collect::<Vec<_>>()
                .join(" ")
        ));
    }
    parts.push(format!(
        "Keep the reply around {} characters, like your usual messages.",
        style.average_length.max(10)
    ));

    if analysis.should_adapt_prompt {
        if let Some(directive) = irritation_directive(analysis.irritation_level) {
            parts.push(directive.to_string());
        }
    }

    parts.push(
        "Reply with the message text only. Never prefix it with your name, \
         a speaker label or any 'Name:' attribution. Never mention being an AI."
            .to_string(),
    );

    let instructions = parts.join("\n");

    // Recent conversation verbatim, with the incoming message as the final
    // turn. The excerpt may already contain it as the newest entry.
    let mut lines: Vec<String> = context
        .recent(excerpt_len + 1)
        .iter()
        .map(|m| format!("{}: {}", m.author, m.text))
        .collect();
    if let Some(last) = lines.last() {
        if *last == format!("{}: {}", author, message) {
            lines.pop();
        }
    }
    if lines.len() > excerpt_len {
        lines.remove(0);
    }

    let mut content = String::new();
    if !lines.is_empty() {
        content.push_str("Recent messages:\n");
        content.push_str(&lines.join("\n"));
        content.push_str("\n\n");
    }
    content.push_str(&format!("{}: {}\n", author, message));
    content.push_str(&format!("Write {}'s next message.", profile.name));

    ShapedPrompt {
        instructions,
        content,
    }
}

fn tone_words(formality_level: f64) -> &'static str {
    if formality_level > 0.7 {
        "polite and well-mannered"
    } else if formality_level >= 0.3 {
        "casual and friendly"
    } else {
        "very relaxed, with slang and loose grammar"
    }
}

fn irritation_directive(level: IrritationLevel) -> Option<&'static str> {
    match level {
        IrritationLevel::None => None,
        IrritationLevel::Mild => Some(
            "The last message repeats something already said. \
             You may acknowledge the repetition in passing.",
        ),
        IrritationLevel::Moderate => Some(
            "The same request keeps coming. Let mild exasperation show in your wording.",
        ),
        IrritationLevel::High => Some(
            "You have been asked the same thing over and over. \
             Respond curtly and visibly annoyed; make it clear you noticed the spam.",
        ),
    }
}

/// Strip a leading `Name:` self-attribution from a completion.
///
/// Repeats until no known name variant prefixes the text, so stacked
/// prefixes collapse; idempotent on its own output. Returns `None` when
/// nothing usable remains.
pub fn sanitize_reply(raw: &str, name_variants: &[String]) -> Option<String> {
    let mut text = raw.trim();
    loop {
        let mut stripped = false;
        for variant in name_variants {
            if variant.trim().is_empty() {
                continue;
            }
            if let Some(rest) = strip_attribution(text, variant) {
                text = rest;
                stripped = true;
                break;
            }
        }
        if !stripped {
            break;
        }
    }
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// If `text` starts with `name` (case-insensitive) followed by a colon,
/// return the remainder.
fn strip_attribution<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let after_name = case_insensitive_prefix_len(text, name)?;
    let rest = text[after_name..].trim_start();
    let rest = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix('：'))?;
    Some(rest.trim_start())
}

/// Byte length of `prefix` as it appears at the start of `text`, compared
/// case-insensitively character by character.
fn case_insensitive_prefix_len(text: &str, prefix: &str) -> Option<usize> {
    let mut end = 0;
    let mut text_chars = text.char_indices();
    for expected in prefix.chars() {
        let (idx, actual) = text_chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
        end = idx + actual.len_utf8();
    }
    Some(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::profile::{ResponseStyle, SchedulePattern};
    use crate::engine::repetition::analyze;
    use chrono::{TimeZone, Utc};

    fn profile() -> PersonalityProfile {
        PersonalityProfile {
            name: "Дима".to_string(),
            name_variants: vec!["Dima".to_string(), "Димон".to_string()],
            patterns: Vec::new(),
            response_style: ResponseStyle {
                average_length: 40,
                common_words: vec!["ну".to_string(), "короче".to_string()],
                common_emojis: vec![")".to_string()],
                formality_level: 0.2,
                activity_level: 0.6,
            },
            schedule: SchedulePattern::default(),
        }
    }

    fn spammed_context() -> ChatContext {
        let mut context = ChatContext::new(30);
        for i in 0..6 {
            context.update(
                "vova",
                "ответь",
                Utc.with_ymd_and_hms(2024, 5, 6, 12, i, 0).unwrap(),
            );
        }
        context
    }

    #[test]
    fn instructions_carry_persona_and_tone() {
        let context = spammed_context();
        let analysis = analyze("ответь", "vova", &context);
        let prompt = build("ответь", "vova", &context, &profile(), &analysis, 6);

        assert!(prompt.instructions.contains("Дима"));
        assert!(
            prompt.instructions.contains("slang"),
            "Low formality should pick the relaxed tone tier"
        );
        assert!(prompt.instructions.contains("ну"), "Common words belong in the persona");
        assert!(prompt.instructions.contains("Never prefix"));
    }

    #[test]
    fn irritation_directive_scales_with_level() {
        let context = spammed_context();
        let analysis = analyze("ответь", "vova", &context);
        assert_eq!(analysis.irritation_level, IrritationLevel::High);

        let prompt = build("ответь", "vova", &context, &profile(), &analysis, 6);
        assert!(
            prompt.instructions.contains("visibly annoyed"),
            "High irritation should demand visible annoyance"
        );

        let calm = RepetitionAnalysis {
            repetition_count: 0,
            irritation_level: IrritationLevel::None,
            should_adapt_prompt: false,
        };
        let prompt = build("привет", "alice", &context, &profile(), &calm, 6);
        assert!(
            !prompt.instructions.contains("annoyed"),
            "No irritation, no annoyance directive"
        );
    }

    #[test]
    fn content_grounds_on_recent_context() {
        let mut context = ChatContext::new(30);
        context.update(
            "alice",
            "кто идёт вечером?",
            Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap(),
        );
        context.update(
            "vova",
            "я пас",
            Utc.with_ymd_and_hms(2024, 5, 6, 12, 1, 0).unwrap(),
        );
        let calm = RepetitionAnalysis {
            repetition_count: 0,
            irritation_level: IrritationLevel::None,
            should_adapt_prompt: false,
        };
        let prompt = build("а ты, Дима?", "alice", &context, &profile(), &calm, 6);

        assert!(prompt.content.contains("alice: кто идёт вечером?"));
        assert!(prompt.content.contains("vova: я пас"));
        assert!(prompt.content.ends_with("Write Дима's next message."));
    }

    #[test]
    fn incoming_message_is_not_duplicated() {
        let mut context = ChatContext::new(30);
        context.update(
            "alice",
            "Дима, ты тут?",
            Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap(),
        );
        let calm = RepetitionAnalysis {
            repetition_count: 0,
            irritation_level: IrritationLevel::None,
            should_adapt_prompt: false,
        };
        // The incoming message is already the newest context entry, the way
        // the engine calls build after updating the tracker.
        let prompt = build("Дима, ты тут?", "alice", &context, &profile(), &calm, 6);
        assert_eq!(
            prompt.content.matches("Дима, ты тут?").count(),
            1,
            "The incoming message must appear exactly once"
        );
    }

    #[test]
    fn sanitize_strips_known_name_prefixes() {
        let variants = profile().all_name_variants();
        assert_eq!(
            sanitize_reply("Дима: ну привет", &variants).as_deref(),
            Some("ну привет")
        );
        assert_eq!(
            sanitize_reply("dima: ну привет", &variants).as_deref(),
            Some("ну привет")
        );
        assert_eq!(
            sanitize_reply("  Димон:   здарова)", &variants).as_deref(),
            Some("здарова)")
        );
    }

    #[test]
    fn sanitize_collapses_stacked_prefixes() {
        let variants = profile().all_name_variants();
        assert_eq!(
            sanitize_reply("Дима: Dima: привет", &variants).as_deref(),
            Some("привет")
        );
    }

    #[test]
    fn sanitize_is_idempotent() {
        let variants = profile().all_name_variants();
        let inputs = ["Дима: ну привет", "просто текст", "Dima:  ", "Дима: Дима: ок"];
        for input in inputs {
            let once = sanitize_reply(input, &variants);
            let twice = once
                .as_deref()
                .and_then(|text| sanitize_reply(text, &variants));
            assert_eq!(once, twice, "Sanitizing twice must equal sanitizing once");
        }
    }

    #[test]
    fn sanitize_keeps_unrelated_colons() {
        let variants = profile().all_name_variants();
        assert_eq!(
            sanitize_reply("важно: не опаздывай", &variants).as_deref(),
            Some("важно: не опаздывай")
        );
    }

    #[test]
    fn empty_after_stripping_is_no_response() {
        let variants = profile().all_name_variants();
        assert_eq!(sanitize_reply("Дима:", &variants), None);
        assert_eq!(sanitize_reply("   ", &variants), None);
        assert_eq!(sanitize_reply("Дима: Dima:  ", &variants), None);
    }
}
