//! Prompt Compressor (C9): deterministic, lossless-enough rewriting that
//! shrinks a prompt's estimated token count before it goes upstream.
//!
//! Token counts are estimated as `ceil(len / 4)`, a common rough proxy for
//! English text tokenization. Rewriting strips redundant whitespace and a
//! fixed list of filler phrases, and collapses immediately repeated
//! phrases. Content inside triple-backtick fences is never touched —
//! code and verbatim data blocks must survive byte-for-byte.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

const FILLER_PHRASES: &[&str] = &[
    "please note that ",
    "it is important to note that ",
    "as an ai language model, ",
    "i would like to ",
    "in order to ",
    "just to be clear, ",
];

pub fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}

pub struct CompressionResult {
    pub text: String,
    pub original_tokens: usize,
    pub compressed_tokens: usize,
}

pub struct PromptCompressor;

impl PromptCompressor {
    pub fn new() -> Self {
        Self
    }

    pub fn compress(&self, text: &str) -> CompressionResult {
        let original_tokens = estimate_tokens(text);
        let segments = split_on_fences(text);
        let mut out = String::with_capacity(text.len());
        for segment in segments {
            match segment {
                Segment::Fenced(content) => out.push_str(content),
                Segment::Plain(content) => out.push_str(&rewrite(content)),
            }
        }
        let compressed_tokens = estimate_tokens(&out);
        CompressionResult { text: out, original_tokens, compressed_tokens }
    }
}

impl Default for PromptCompressor {
    fn default() -> Self {
        Self::new()
    }
}

enum Segment<'a> {
    Plain(&'a str),
    Fenced(&'a str),
}

/// Splits `text` on triple-backtick fences, alternating plain and fenced
/// segments. An unterminated trailing fence is treated as fenced through
/// to the end, erring on the side of not rewriting it.
fn split_on_fences(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = text;
    loop {
        match rest.find("```") {
            None => {
                segments.push(Segment::Plain(rest));
                break;
            }
            Some(start) => {
                if start > 0 {
                    segments.push(Segment::Plain(&rest[..start]));
                }
                let after_open = &rest[start..];
                match after_open[3..].find("```") {
                    Some(end) => {
                        let fence_end = 3 + end + 3;
                        segments.push(Segment::Fenced(&after_open[..fence_end]));
                        rest = &after_open[fence_end..];
                    }
                    None => {
                        segments.push(Segment::Fenced(after_open));
                        break;
                    }
                }
            }
        }
    }
    segments
}

fn rewrite(text: &str) -> String {
    let mut result = text.to_lowercase();
    for phrase in FILLER_PHRASES {
        result = result.replace(phrase, "");
    }
    // Re-derive case-preserving output: only whitespace and phrase removal
    // touch the original, so operate on the original string with the same
    // phrase set instead of the lowercased copy.
    let mut cased = text.to_string();
    for phrase in FILLER_PHRASES {
        cased = replace_case_insensitive(&cased, phrase);
    }
    cased = WHITESPACE_RE.replace_all(&cased, " ").to_string();
    cased = BLANK_LINES_RE.replace_all(&cased, "\n\n").to_string();
    collapse_repeated_phrases(cased.trim())
}

fn replace_case_insensitive(text: &str, needle: &str) -> String {
    let lower_text = text.to_lowercase();
    let lower_needle = needle.to_lowercase();
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(pos) = lower_text[cursor..].find(&lower_needle) {
        let abs = cursor + pos;
        result.push_str(&text[cursor..abs]);
        cursor = abs + needle.len();
    }
    result.push_str(&text[cursor..]);
    result
}

/// Collapses a phrase that immediately repeats itself, e.g.
/// "please please help" -> "please help".
fn collapse_repeated_phrases(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out: Vec<&str> = Vec::with_capacity(words.len());
    for word in words {
        if out.last().map(|last| last.eq_ignore_ascii_case(word)).unwrap_or(false) {
            continue;
        }
        out.push(word);
    }
    out.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn strips_filler_phrases() {
        let compressor = PromptCompressor::new();
        let result = compressor.compress("Please note that this is important.");
        assert!(!result.text.to_lowercase().contains("please note that"));
    }

    #[test]
    fn preserves_fenced_code_byte_for_byte() {
        let compressor = PromptCompressor::new();
        let input = "please note that here:\n```\nplease note that x = 1;\n```\ndone";
        let result = compressor.compress(input);
        assert!(result.text.contains("```\nplease note that x = 1;\n```"));
    }

    #[test]
    fn collapses_immediately_repeated_words() {
        let compressor = PromptCompressor::new();
        let result = compressor.compress("please please help help me");
        assert_eq!(result.text, "please help me");
    }

    #[test]
    fn compressed_token_count_never_exceeds_original() {
        let compressor = PromptCompressor::new();
        let result = compressor.compress("In order to help you, I would like to assist.");
        assert!(result.compressed_tokens <= result.original_tokens);
    }
}
