// src/summarize.rs
//! Boundary-aware truncation of translated text. Lengths are counted in chars.

use once_cell::sync::OnceCell;
use regex::Regex;

pub const ELLIPSIS: &str = "…";

/// Shorten `text` to about `max_len` chars, preferring whole sentences, then whole words.
///
/// Text within the limit is returned unchanged. Otherwise up to `max_sentences` leading
/// sentences are kept as long as they fit in `max_len`. When not even the first sentence
/// fits, the cut falls on the last whitespace before `max_len`. The ellipsis is appended
/// in both cases.
pub fn summarize(text: &str, max_len: usize, max_sentences: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }

    static RE_SENTENCE: OnceCell<Regex> = OnceCell::new();
    let re = RE_SENTENCE
        .get_or_init(|| Regex::new(r"(?s).*?[.!?](?:\s|$)").expect("valid sentence regex"));

    let mut summary = String::new();
    let mut summary_len = 0usize;
    for m in re.find_iter(text).take(max_sentences) {
        let sentence = m.as_str().trim();
        if sentence.is_empty() {
            continue;
        }
        let sep = usize::from(!summary.is_empty());
        let len = sentence.chars().count();
        if summary_len + sep + len > max_len {
            break;
        }
        if sep == 1 {
            summary.push(' ');
        }
        summary.push_str(sentence);
        summary_len += sep + len;
    }

    if !summary.is_empty() {
        summary.push_str(ELLIPSIS);
        return summary;
    }

    truncate_at_word(text, max_len)
}

fn truncate_at_word(text: &str, max_len: usize) -> String {
    let cut = text
        .char_indices()
        .nth(max_len)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let head = &text[..cut];

    let end = match head.rfind(char::is_whitespace) {
        Some(i) if i > 0 => i,
        _ => cut,
    };
    format!("{}{}", head[..end].trim_end(), ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(summarize("Short. Text.", 100, 2), "Short. Text.");
    }

    #[test]
    fn keeps_first_sentences_with_ellipsis() {
        let out = summarize("A. B. C. D. E. F.", 10, 2);
        assert_eq!(out, "A. B.…");
        assert!(out.chars().count() <= 10 + ELLIPSIS.chars().count());
    }

    #[test]
    fn mixed_terminators_count_as_boundaries() {
        let out = summarize("Is it up? Yes! Markets rallied. Then fell.", 32, 5);
        assert_eq!(out, "Is it up? Yes! Markets rallied.…");
    }

    #[test]
    fn sentences_are_capped_by_count() {
        let text = "One. Two. Three. Four. Five. Six. Seven.";
        assert_eq!(summarize(text, 30, 3), "One. Two. Three.…");
    }

    #[test]
    fn falls_back_to_word_boundary_without_sentences() {
        let out = summarize("alpha beta gamma delta epsilon", 12, 5);
        assert_eq!(out, "alpha beta…");
    }

    #[test]
    fn falls_back_when_first_sentence_is_too_long() {
        let out = summarize("alpha beta gamma delta epsilon. Short.", 14, 5);
        assert_eq!(out, "alpha beta…");
    }

    #[test]
    fn hard_cut_without_whitespace() {
        let out = summarize("abcdefghijklmnop", 5, 3);
        assert_eq!(out, "abcde…");
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundary() {
        let text = "Рынки выросли сильно сегодня утром";
        let out = summarize(text, 15, 2);
        assert_eq!(out, "Рынки выросли…");
    }
}
