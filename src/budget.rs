pub const DEFAULT_TRANSCRIPT_CAP: usize = 30_000;

pub fn approx_tokens(s: &str) -> usize {
    // heuristic ~4 chars/token
    (s.chars().count() + 3) / 4
}

/// Leading `max_chars` characters of a transcript, cut on a char boundary.
pub fn cap_transcript(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(cap_transcript("hello", 30_000), "hello");
        assert_eq!(cap_transcript("hello", 5), "hello");
    }

    #[test]
    fn test_cap_counts_chars_not_bytes() {
        let text = "ééééé";
        assert_eq!(cap_transcript(text, 3), "ééé");
        assert_eq!(cap_transcript(text, 0), "");
    }

    #[test]
    fn test_default_cap() {
        let long = "a".repeat(DEFAULT_TRANSCRIPT_CAP + 500);
        assert_eq!(cap_transcript(&long, DEFAULT_TRANSCRIPT_CAP).len(), DEFAULT_TRANSCRIPT_CAP);
    }

    #[test]
    fn test_approx_tokens() {
        assert_eq!(approx_tokens(""), 0);
        assert_eq!(approx_tokens("abcd"), 1);
        assert_eq!(approx_tokens("abcde"), 2);
    }
}
