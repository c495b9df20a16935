//! Text similarity scoring tolerant to cosmetic noise.
//!
//! "ответь", "ответь!" and "ОТВЕТЬ!!!" carry the same sentiment, so the
//! scorer folds case, collapses whitespace and strips trailing punctuation
//! runs before computing a normalized Levenshtein ratio.

/// Characters treated as noise when they trail a message ("???", "!!!", "..").
const TRAILING_NOISE: &[char] = &['!', '?', '.', ',', ';', '…', '~', ')', '(' ];

/// Normalize a message for comparison: lowercase, trim, collapse internal
/// whitespace runs, strip trailing punctuation/repetition marks.
pub fn normalize(text: &str) -> String {
    let folded = text.to_lowercase();
    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| TRAILING_NOISE.contains(&c))
        .trim_end()
        .to_string()
}

/// Closeness of two strings in [0, 1]. 1.0 means identical after
/// normalization; symmetric in its arguments.
pub fn similarity(a: &str, b: &str) -> f64 {
    let na = normalize(a);
    let nb = normalize(b);
    if na.is_empty() && nb.is_empty() {
        return 1.0;
    }
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(&na, &nb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(similarity("привет", "привет"), 1.0);
        assert_eq!(similarity("hello there", "hello there"), 1.0);
    }

    #[test]
    fn punctuation_variants_score_one() {
        assert_eq!(similarity("ответь", "ответь!"), 1.0);
        assert_eq!(similarity("ответь", "ответь!!!"), 1.0);
        assert_eq!(similarity("ну что", "ну что???"), 1.0);
    }

    #[test]
    fn case_and_whitespace_are_folded() {
        assert_eq!(similarity("Ответь", "ОТВЕТЬ"), 1.0);
        assert_eq!(similarity("  ну   что  ", "ну что"), 1.0);
    }

    #[test]
    fn unrelated_strings_score_low() {
        let s = similarity("ответь", "пошли гулять вечером");
        assert!(s < 0.5, "Unrelated strings should score low, got {}", s);
    }

    #[test]
    fn near_variants_score_high() {
        let s = similarity("ну ответь же", "ну ответь жее");
        assert!(s >= 0.8, "Near variants should score high, got {}", s);
    }

    #[test]
    fn empty_vs_nonempty_scores_zero() {
        assert_eq!(similarity("", "привет"), 0.0);
        assert_eq!(similarity("!!!", "привет"), 0.0);
    }

    #[test]
    fn both_empty_after_normalization_score_one() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("???", "!!!"), 1.0);
    }

    #[test]
    fn trailing_punctuation_never_drops_score_much() {
        // Appending a single punctuation character must not reduce
        // similarity by more than 0.1 relative to the unmodified pair.
        let pairs = [("ответь", "ответь"), ("ну что там", "ну что тут")];
        for (a, b) in pairs {
            let base = similarity(a, b);
            for mark in ['!', '?', '.'] {
                let modified = format!("{}{}", b, mark);
                let scored = similarity(a, &modified);
                assert!(
                    base - scored <= 0.1,
                    "Appending '{}' dropped similarity too far: {} -> {}",
                    mark,
                    base,
                    scored
                );
            }
        }
    }

    proptest! {
        #[test]
        fn prop_identity_is_one(s in "\\PC{1,40}") {
            prop_assume!(!normalize(&s).is_empty());
            prop_assert!((similarity(&s, &s) - 1.0).abs() < 1e-9);
        }

        #[test]
        fn prop_symmetric(a in "\\PC{0,40}", b in "\\PC{0,40}") {
            prop_assert_eq!(similarity(&a, &b), similarity(&b, &a));
        }

        #[test]
        fn prop_bounded(a in "\\PC{0,40}", b in "\\PC{0,40}") {
            let s = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&s));
        }
    }
}
