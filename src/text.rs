//! Text normalization shared by every scorer.
//!
//! Pipeline: lowercase → strip URLs → drop apostrophes (contractions collapse,
//! `don't` → `dont`) → every char outside `[a-z0-9]`/whitespace becomes a space →
//! collapse whitespace → trim → split.
//!
//! Output only ever contains `[a-z0-9 ]`.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z][a-z0-9+.\-]*://\S+").expect("url regex"));

/// Normalized text plus its whitespace tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedText {
    pub text: String,
    pub tokens: Vec<String>,
}

impl NormalizedText {
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Title and body joined the way the scorers see them (body defaults to empty).
pub fn compose_post_text(title: &str, body: Option<&str>) -> String {
    match body {
        Some(b) if !b.trim().is_empty() => format!("{title} {b}"),
        _ => title.to_string(),
    }
}

/// Normalize raw text and tokenize it.
pub fn normalize(input: &str) -> NormalizedText {
    let text = normalize_str(input);
    let tokens = text.split_whitespace().map(str::to_string).collect();
    NormalizedText { text, tokens }
}

/// Normalization without tokenizing. Also used for configured lexicon keys,
/// negation tokens and literal phrases so they line up with normalized posts.
pub fn normalize_str(input: &str) -> String {
    let lower = input.to_lowercase();
    let no_urls = RE_URL.replace_all(&lower, " ");

    let mut out = String::with_capacity(no_urls.len());
    let mut last_space = true;
    for ch in no_urls.chars() {
        if matches!(ch, '\'' | '\u{2019}') {
            continue;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            out.push(ch);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}
