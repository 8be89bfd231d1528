use once_cell::sync::Lazy;
use regex::Regex;

/// Phrases indicating the customer hung up mid-call
static ABRUPT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"ガチャ切り",
        r"電話を切られ",
        r"一方的に切",
        r"途中で切",
        r"会話が途中で終了",
        r"通話が切断",
        r"突然終了",
        r"無言で切",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Polite sign-off phrases indicating a normal close
static NORMAL_CLOSE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"失礼(?:いた)?します",
        r"ありがとうございました",
        r"お時間をいただき",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Detect whether the customer hung up on the agent.
///
/// Purely lexical, independent of any model verdict. A polite closing phrase
/// suppresses the abrupt-termination match unconditionally: a call that ends
/// with a proper sign-off is never flagged, even if an abrupt phrase also
/// appears earlier in the text.
pub fn detect_hangup(text: &str) -> bool {
    if NORMAL_CLOSE_PATTERNS.iter().any(|p| p.is_match(text)) {
        return false;
    }
    ABRUPT_PATTERNS.iter().any(|p| p.is_match(text))
}
