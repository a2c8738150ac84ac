//! Keyword heuristics for free-text actions.
//!
//! [`classify`] is a pure function of the input text. It is the
//! deterministic substitute for the narrative collaborator's own
//! classification and never consults state or randomness.

use cubicle_types::Intent;

/// Result of classifying a piece of free text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Selected intent. `SmallTalk` when nothing matched.
    pub intent: Intent,
    /// Intensity in `0.0..=2.0`.
    pub magnitude: f64,
    /// Whether a keyword selected the intent. Unmatched text leaves the
    /// decision to the collaborator.
    pub matched: bool,
}

/// Magnitude used for unmatched chatter.
pub const SMALL_TALK_MAGNITUDE: f64 = 0.4;

const WORK_WORDS: &[&str] = &[
    "加班", "爆肝", "肝", "工作", "修bug", "修复", "debug", "写代码", "改需求", "推进", "work",
    "code", "coding", "fix", "ship", "deploy", "overtime", "implement", "refactor",
];
const REFUSE_WORDS: &[&str] = &[
    "摸鱼", "休息", "摆烂", "躺平", "slack", "rest", "nap", "break", "skip", "day off",
];
const SHOP_WORDS: &[&str] = &[
    "买", "吃", "喝", "外卖", "奶茶", "咖啡", "点餐", "buy", "eat", "drink", "coffee", "snack",
    "order", "lunch", "dinner",
];
const LEARN_WORDS: &[&str] = &[
    "学习", "培训", "上课", "复盘", "读文档", "learn", "study", "course", "training", "read docs",
    "tutorial", "retro",
];
const ATTACK_WORDS: &[&str] = &[
    "打", "骂", "滚", "傻", "废物", "操", "你妈", "idiot", "stupid", "shut up", "useless",
    "damn", "get lost",
];

const INTENSE_WORDS: &[&str] = &[
    "通宵", "爆肝", "肝爆", "死磕", "all night", "all nighter", "crunch", "grind",
];
const LIGHT_WORDS: &[&str] = &["稍微", "一点", "小加班", "a bit", "a little", "quickly", "briefly"];
const EARNEST_WORDS: &[&str] = &["加班", "努力", "认真", "hard", "focus", "seriously"];

/// Classify free text into an intent and magnitude.
pub fn classify(text: &str) -> Classification {
    let lowered = text.to_lowercase();
    let padded = pad_words(&lowered);
    let has_any = |words: &[&str]| words.iter().any(|w| mentions(&lowered, &padded, w));

    let intent = if has_any(WORK_WORDS) {
        Some(Intent::Work)
    } else if has_any(REFUSE_WORDS) {
        Some(Intent::Refuse)
    } else if has_any(SHOP_WORDS) {
        Some(Intent::Shop)
    } else if has_any(LEARN_WORDS) {
        Some(Intent::Learn)
    } else if has_any(ATTACK_WORDS) {
        Some(Intent::Attack)
    } else {
        None
    };

    let Some(intent) = intent else {
        return Classification {
            intent: Intent::SmallTalk,
            magnitude: SMALL_TALK_MAGNITUDE,
            matched: false,
        };
    };

    let magnitude = if has_any(INTENSE_WORDS) {
        1.6
    } else if has_any(LIGHT_WORDS) {
        0.8
    } else if has_any(EARNEST_WORDS) {
        1.2
    } else {
        1.0
    };

    Classification {
        intent,
        magnitude,
        matched: true,
    }
}

/// Whether `text` mentions any of `words`, using the same matching rules as
/// [`classify`].
pub fn mentions_any(text: &str, words: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    let padded = pad_words(&lowered);
    words.iter().any(|w| mentions(&lowered, &padded, w))
}

/// Lowercased text with every non-alphanumeric ASCII character turned into a
/// space and a space on each end, so ASCII keywords match whole words only.
fn pad_words(lowered: &str) -> String {
    let mut padded = String::with_capacity(lowered.len().saturating_add(2));
    padded.push(' ');
    padded.extend(lowered.chars().map(|c| {
        if c.is_ascii() && !c.is_ascii_alphanumeric() {
            ' '
        } else {
            c
        }
    }));
    padded.push(' ');
    padded
}

/// CJK keywords match as substrings; ASCII keywords match whole words.
fn mentions(lowered: &str, padded: &str, word: &str) -> bool {
    if word.is_ascii() {
        padded.contains(&format!(" {word} "))
    } else {
        lowered.contains(word)
    }
}

/// Clamp a magnitude into the supported range. `NaN` becomes 1.0.
pub fn clamp_magnitude(magnitude: f64) -> f64 {
    if magnitude.is_nan() {
        1.0
    } else {
        magnitude.clamp(0.0, 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_keywords_select_work() {
        let c = classify("今天加班修bug");
        assert_eq!(c.intent, Intent::Work);
        assert!(c.matched);
        assert!((c.magnitude - 1.2).abs() < f64::EPSILON);
    }

    #[test]
    fn intensity_words_scale_magnitude() {
        assert!((classify("通宵写代码").magnitude - 1.6).abs() < f64::EPSILON);
        assert!((classify("稍微推进一下").magnitude - 0.8).abs() < f64::EPSILON);
        assert!((classify("Let me code the login page").magnitude - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn intent_priority_follows_keyword_order() {
        // Both a work and a shop keyword: work wins.
        assert_eq!(classify("buy coffee then work").intent, Intent::Work);
        assert_eq!(classify("摸鱼喝奶茶").intent, Intent::Refuse);
        assert_eq!(classify("study the new docs").intent, Intent::Learn);
        assert_eq!(classify("you are useless").intent, Intent::Attack);
    }

    #[test]
    fn unmatched_text_is_small_talk() {
        let c = classify("hello everyone, great weather");
        assert_eq!(c.intent, Intent::SmallTalk);
        assert!(!c.matched);
        assert!((c.magnitude - SMALL_TALK_MAGNITUDE).abs() < f64::EPSILON);
    }

    #[test]
    fn english_keywords_match_whole_words() {
        assert_eq!(classify("an interesting theater").intent, Intent::SmallTalk);
        assert_eq!(classify("time for a nap!").intent, Intent::Refuse);
        assert_eq!(classify("pulling an all-nighter to fix it").intent, Intent::Work);
    }

    #[test]
    fn classification_is_pure() {
        let text = "通宵加班推进需求";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn magnitude_is_clamped() {
        assert!((clamp_magnitude(5.0) - 2.0).abs() < f64::EPSILON);
        assert!(clamp_magnitude(-1.0).abs() < f64::EPSILON);
        assert!((clamp_magnitude(f64::NAN) - 1.0).abs() < f64::EPSILON);
    }
}
