use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_'-]*").expect("valid regex");
}

/// Canonical form of a search term as used in index keys: NFKC, lowercase, word tokens
/// joined by single spaces. The result never contains `/`.
pub fn normalize_term(raw: &str) -> String {
    let normalized = raw.nfkc().collect::<String>().to_lowercase();
    WORD.find_iter(&normalized).map(|m| m.as_str()).collect::<Vec<_>>().join(" ")
}

/// Splits a provider tag list ("forest, trees,nature") into trimmed, non-empty tags.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}

/// Uppercases the first character.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
