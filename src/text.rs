fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Replaces typographic quotes and non-breaking spaces so headings and plan names
/// compare equal regardless of how the document was authored. Line breaks and
/// whitespace runs are preserved because the table parser depends on them.
pub fn normalize_text(input: &str) -> String {
    input
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace('\u{00A0}', " ")
        .replace(['\u{200B}', '\u{FEFF}'], "")
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Lower-cased word tokens, in order of appearance.
pub fn tokenize(input: &str) -> Vec<String> {
    tokens_with_min_len(input, 1)
}

/// Lower-cased word tokens that have at least `min_chars` characters.
pub fn tokens_with_min_len(input: &str, min_chars: usize) -> Vec<String> {
    input
        .to_lowercase()
        .split(|c: char| !is_word_char(c))
        .filter(|token| !token.is_empty())
        .filter(|token| token.chars().count() >= min_chars)
        .map(|token| token.to_string())
        .collect()
}

/// Lower-cased text with every whitespace run collapsed to one space.
pub fn collapse_whitespace(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_drops_punctuation() {
        assert_eq!(
            tokenize("I have the GOLD plan, domestic cover!"),
            vec!["i", "have", "the", "gold", "plan", "domestic", "cover"]
        );
    }

    #[test]
    fn min_len_filter_drops_single_letters() {
        assert_eq!(tokens_with_min_len("I am a Gold member", 2), vec!["am", "gold", "member"]);
    }

    #[test]
    fn normalize_keeps_column_gaps() {
        let normalized = normalize_text("Gold\u{00A0}\u{00A0}\u{00A0}100000\r\nExclusions \u{2013} Domestic");
        assert_eq!(normalized, "Gold   100000\nExclusions - Domestic");
    }

    #[test]
    fn collapse_whitespace_lowercases() {
        assert_eq!(collapse_whitespace("  Within \t Country "), "within country");
    }
}
