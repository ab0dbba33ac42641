use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub const DEFAULT_MIN_TOKEN_LEN: usize = 2;

pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "to", "of", "in", "for", "with", "on", "at", "by", "is", "are",
    "was", "were", "be", "been", "as", "that", "this", "it", "i", "you", "he", "she", "they", "we",
    "my", "our", "your", "their",
];

const KEPT_PUNCTUATION: &[char] = &['+', '#', '.', '-', '/'];
const TOKEN_BOUNDARIES: &[char] = &['/', ',', '.', ';', ':', '(', ')', '[', ']', '{', '}'];

/// Lowercases and folds everything outside word characters, whitespace and `+ # . - /`
/// to spaces, then collapses whitespace runs.
pub fn normalize_text(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let folded = input
        .to_lowercase()
        .chars()
        .map(|character| {
            if character == '\u{a0}' {
                ' '
            } else if is_word_char(character)
                || character.is_whitespace()
                || KEPT_PUNCTUATION.contains(&character)
            {
                character
            } else {
                ' '
            }
        })
        .collect::<String>();

    normalize_whitespace(&folded)
}

pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub fn tokenize(input: &str, stopwords: Option<&HashSet<String>>) -> Vec<String> {
    tokenize_with_min_len(input, stopwords, DEFAULT_MIN_TOKEN_LEN)
}

/// Splits normalized text on whitespace and punctuation boundaries. When no stopword set is
/// supplied the built-in [`DEFAULT_STOPWORDS`] apply.
pub fn tokenize_with_min_len(
    input: &str,
    stopwords: Option<&HashSet<String>>,
    min_len: usize,
) -> Vec<String> {
    let normalized = normalize_text(input);

    normalized
        .split(|character: char| character.is_whitespace() || TOKEN_BOUNDARIES.contains(&character))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter(|token| token.chars().count() >= min_len)
        .filter(|token| match stopwords {
            Some(stopwords) => !stopwords.contains(*token),
            None => !DEFAULT_STOPWORDS.contains(token),
        })
        .map(ToOwned::to_owned)
        .collect()
}

pub fn join_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(" ")
}

pub fn is_word_char(character: char) -> bool {
    character.is_alphanumeric() || character == '_'
}

/// Reads a newline-delimited stopword list. A missing file yields an empty set.
pub fn load_stopwords(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read stopwords: {}", path.display()))?;

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect())
}
