use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum number of labeled turns required for a rubric evaluation
pub const DEFAULT_MIN_TURNS: usize = 3;

/// A labeled turn with at least one non-whitespace character after the label
static TURN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(?:テレアポ担当者|顧客)\]\s*\S+").unwrap());

/// Whether a conversation is too short to be worth a completion call.
///
/// Counts labeled turns in the formatted transcript; an empty or blank text
/// is always too short. Gated rows get a no-conversation record instead of a
/// rubric evaluation.
pub fn is_conversation_too_short(raw_text: &str, min_turns: usize) -> bool {
    if raw_text.trim().is_empty() {
        return true;
    }
    TURN_PATTERN.find_iter(raw_text).count() < min_turns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_is_too_short() {
        assert!(is_conversation_too_short("", DEFAULT_MIN_TURNS));
        assert!(is_conversation_too_short("   \n ", DEFAULT_MIN_TURNS));
    }

    #[test]
    fn test_two_turns_is_too_short() {
        let text = "[テレアポ担当者] もしもし\n[顧客] はい\n";
        assert!(is_conversation_too_short(text, DEFAULT_MIN_TURNS));
    }

    #[test]
    fn test_three_turns_passes() {
        let text = "[テレアポ担当者] もしもし\n[顧客] はい\n[テレアポ担当者] 鈴木と申します\n";
        assert!(!is_conversation_too_short(text, DEFAULT_MIN_TURNS));
    }

    #[test]
    fn test_label_without_content_does_not_count() {
        let text = "[テレアポ担当者] \n[顧客] \n[テレアポ担当者] \n";
        assert!(is_conversation_too_short(text, DEFAULT_MIN_TURNS));
    }

    #[test]
    fn test_unlabeled_lines_do_not_count() {
        let text = "もしもし\nはい\nこんにちは\n";
        assert!(is_conversation_too_short(text, DEFAULT_MIN_TURNS));
    }
}
