//! Event title parsing
//!
//! Calendar titles often carry a category tag. Several conventions are in use,
//! so extraction is tolerant:
//!
//! - `WORK: Quarterly review` / `work: Quarterly review`
//! - `Quarterly review category: work` (legacy trailing marker)
//! - `[work] Quarterly review` (the tag may appear anywhere)
//!
//! Formats are tried in that order, so a leading label wins over a trailing
//! marker. Titles without a recognised tag pass through unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

static CATEGORY_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\bcategory:\s*(\S+)").expect("category marker regex is valid")
});

static PREFIX_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_-]+):\s*(.+)$").expect("prefix label regex is valid")
});

static BRACKET_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\[([^\]]+)\]").expect("bracket tag regex is valid"));

/// Result of parsing an event title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTitle {
    /// Lower-cased category tag, if one was found
    pub category: Option<String>,
    /// Title text with the tag removed
    pub text: String,
}

impl ParsedTitle {
    fn untagged(text: &str) -> Self {
        Self {
            category: None,
            text: text.to_string(),
        }
    }

    fn tagged(category: &str, text: &str, original: &str) -> Self {
        let text = text.trim();
        Self {
            category: Some(category.trim().to_lowercase()),
            text: if text.is_empty() {
                original.to_string()
            } else {
                text.to_string()
            },
        }
    }
}

/// Extract the category tag and remaining text from an event title
pub fn parse_event_title(title: &str) -> ParsedTitle {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return ParsedTitle::untagged("No title");
    }

    if let Some(caps) = PREFIX_LABEL.captures(trimmed) {
        // "10:30 sync" is a time, not a label
        if caps[1].chars().any(|c| c.is_ascii_alphabetic()) {
            return ParsedTitle::tagged(&caps[1], &caps[2], trimmed);
        }
    }

    if let Some(caps) = CATEGORY_MARKER.captures(trimmed) {
        let text = CATEGORY_MARKER.replace(trimmed, "");
        return ParsedTitle::tagged(&caps[1], &text, trimmed);
    }

    if let Some(caps) = BRACKET_TAG.captures(trimmed) {
        let text = BRACKET_TAG.replace(trimmed, "");
        return ParsedTitle::tagged(&caps[1], &text, trimmed);
    }

    ParsedTitle::untagged(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uppercase_prefix_label() {
        let parsed = parse_event_title("WORK: Quarterly review");
        assert_eq!(parsed.category.as_deref(), Some("work"));
        assert_eq!(parsed.text, "Quarterly review");
    }

    #[test]
    fn test_lowercase_prefix_label() {
        let parsed = parse_event_title("personal: Dentist");
        assert_eq!(parsed.category.as_deref(), Some("personal"));
        assert_eq!(parsed.text, "Dentist");
    }

    #[test]
    fn test_bracket_tag_at_start() {
        let parsed = parse_event_title("[Meeting] Design sync");
        assert_eq!(parsed.category.as_deref(), Some("meeting"));
        assert_eq!(parsed.text, "Design sync");
    }

    #[test]
    fn test_bracket_tag_at_end() {
        let parsed = parse_event_title("Design sync [meeting]");
        assert_eq!(parsed.category.as_deref(), Some("meeting"));
        assert_eq!(parsed.text, "Design sync");
    }

    #[test]
    fn test_trailing_category_marker_is_case_insensitive() {
        let parsed = parse_event_title("Gym session Category: health");
        assert_eq!(parsed.category.as_deref(), Some("health"));
        assert_eq!(parsed.text, "Gym session");
    }

    #[test]
    fn test_prefix_label_wins_over_category_marker() {
        let parsed = parse_event_title("Category: Planning meeting");
        assert_eq!(parsed.category.as_deref(), Some("category"));
        assert_eq!(parsed.text, "Planning meeting");
    }

    #[test]
    fn test_untagged_title_passes_through() {
        let parsed = parse_event_title("Lunch with Sam");
        assert_eq!(parsed.category, None);
        assert_eq!(parsed.text, "Lunch with Sam");
    }

    #[test]
    fn test_time_prefix_is_not_a_category() {
        let parsed = parse_event_title("10:30 standup");
        assert_eq!(parsed.category, None);
        assert_eq!(parsed.text, "10:30 standup");
    }

    #[test]
    fn test_empty_title() {
        let parsed = parse_event_title("   ");
        assert_eq!(parsed.category, None);
        assert_eq!(parsed.text, "No title");
    }
}
