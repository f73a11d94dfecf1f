//! `@bb` mention detection for inbound WhatsApp text.

use serde::Serialize;

/// Phrases that address the assistant, matched case-insensitively.
pub const MENTION_PATTERNS: &[&str] = &[
    "@bb",
    "@bargainb",
    "@bargain",
    "hey bb",
    "hi bb",
    "bb help",
    "bb please",
    "bb can you",
];

/// Result of scanning a message for mentions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BbMention {
    pub is_bb_mention: bool,
    /// Message with every found pattern removed and punctuation trimmed.
    pub user_query: String,
    pub original_content: String,
    pub mention_patterns: Vec<&'static str>,
}

/// Find mention patterns and extract the question addressed to the assistant.
pub fn detect_bb_mention(content: &str) -> BbMention {
    let lower = content.to_ascii_lowercase();
    let found: Vec<&'static str> = MENTION_PATTERNS
        .iter()
        .copied()
        .filter(|pattern| lower.contains(pattern))
        .collect();

    if found.is_empty() {
        return BbMention {
            is_bb_mention: false,
            user_query: String::new(),
            original_content: content.to_string(),
            mention_patterns: found,
        };
    }

    let mut cleaned = content.to_string();
    for pattern in &found {
        cleaned = remove_ignore_ascii_case(&cleaned, pattern);
    }

    let is_filler = |c: char| c == ',' || c == '-' || c.is_whitespace();
    let user_query = cleaned
        .trim_start_matches(is_filler)
        .trim_end_matches(is_filler)
        .to_string();

    BbMention {
        is_bb_mention: true,
        user_query,
        original_content: content.to_string(),
        mention_patterns: found,
    }
}

/// Remove the first `@bb` tag and the whitespace after it.
pub fn strip_bb_tag(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    let Some(start) = lower.find("@bb") else {
        return message.trim().to_string();
    };
    let rest = message[start + 3..].trim_start();
    format!("{}{}", &message[..start], rest).trim().to_string()
}

/// Delete every occurrence of an ASCII pattern, ignoring ASCII case.
fn remove_ignore_ascii_case(text: &str, pattern: &str) -> String {
    let bytes = text.as_bytes();
    let needle = pattern.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes.len() - i >= needle.len() && bytes[i..i + needle.len()].eq_ignore_ascii_case(needle) {
            i += needle.len();
            continue;
        }
        let Some(ch) = text[i..].chars().next() else {
            break;
        };
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_message_is_not_a_mention() {
        let result = detect_bb_mention("Hoeveel kost melk?");
        assert!(!result.is_bb_mention);
        assert!(result.user_query.is_empty());
        assert!(result.mention_patterns.is_empty());
    }

    #[test]
    fn leading_tag_is_removed() {
        let result = detect_bb_mention("@bb where is milk cheapest?");
        assert!(result.is_bb_mention);
        assert_eq!(result.user_query, "where is milk cheapest?");
        assert_eq!(result.mention_patterns, vec!["@bb"]);
    }

    #[test]
    fn case_insensitive_and_punctuation_trimmed() {
        let result = detect_bb_mention("Hey BB, - any deals on coffee? -");
        assert!(result.is_bb_mention);
        assert_eq!(result.mention_patterns, vec!["hey bb"]);
        assert_eq!(result.user_query, "any deals on coffee?");
    }

    #[test]
    fn overlapping_patterns_all_removed() {
        let result = detect_bb_mention("@BargainB help me plan dinner");
        assert_eq!(result.mention_patterns, vec!["@bargainb", "@bargain"]);
        assert_eq!(result.user_query, "help me plan dinner");
    }

    #[test]
    fn non_ascii_text_survives() {
        let result = detect_bb_mention("@bb crème brûlée ingrediënten?");
        assert_eq!(result.user_query, "crème brûlée ingrediënten?");
    }

    #[test]
    fn strip_tag_only_first() {
        assert_eq!(strip_bb_tag("@bb   what's on sale"), "what's on sale");
        assert_eq!(strip_bb_tag("hi @BB list please"), "hi list please");
        assert_eq!(strip_bb_tag("  no tag  "), "no tag");
    }
}
