//! Lexicon scoring with a bounded negation window.
//!
//! Graded weights come from a word → weight table. A negation token arms a
//! look-ahead of `window` tokens; the first lexicon hit inside it is flipped and
//! amplified (`-w * amplification`), then the flag disarms. If no sentiment word
//! shows up within the window the flag resets, so negation does not bleed into
//! unrelated clauses.
//!
//! Normalization: `raw / sqrt(matched)` when `matched > 0`, otherwise exactly 0.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::text::normalize_str;

static BUILTIN: Lazy<HashMap<String, f64>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, f64>>(raw).expect("valid sentiment lexicon")
});

pub const DEFAULT_NEGATION_TOKENS: [&str; 8] = [
    "not", "no", "never", "don't", "doesn't", "isn't", "can't", "won't",
];
pub const DEFAULT_NEGATION_WINDOW: usize = 3;
pub const DEFAULT_NEGATION_AMPLIFICATION: f64 = 1.5;

/// Word → signed polarity weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lexicon(HashMap<String, f64>);

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Lexicon {
    /// Bundled lexicon (`sentiment_lexicon.json`).
    pub fn builtin() -> Self {
        Self(BUILTIN.clone())
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    /// Lookup of an already-normalized token.
    #[inline]
    pub fn weight(&self, token: &str) -> Option<f64> {
        self.0.get(token).copied()
    }

    /// Re-key every entry through the text normalizer so entries like `don't`
    /// match normalized tokens. Multi-token keys are dropped (phrases cover them);
    /// on collisions the later key wins.
    pub(crate) fn normalized(&self) -> Self {
        let mut out = HashMap::with_capacity(self.0.len());
        let mut keys: Vec<&String> = self.0.keys().collect();
        keys.sort();
        for k in keys {
            let n = normalize_str(k);
            if n.is_empty() || n.contains(' ') {
                continue;
            }
            out.insert(n, self.0[k]);
        }
        Self(out)
    }
}

/// Negation settings as they appear in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegationConfig {
    pub tokens: Vec<String>,
    pub window: usize,
    pub amplification: f64,
}

impl Default for NegationConfig {
    fn default() -> Self {
        Self {
            tokens: DEFAULT_NEGATION_TOKENS.iter().map(|s| s.to_string()).collect(),
            window: DEFAULT_NEGATION_WINDOW,
            amplification: DEFAULT_NEGATION_AMPLIFICATION,
        }
    }
}

/// Negation settings with tokens normalized into a lookup set.
#[derive(Debug, Clone)]
pub struct Negation {
    tokens: HashSet<String>,
    window: usize,
    amplification: f64,
}

impl Negation {
    pub fn new<I, S>(tokens: I, window: usize, amplification: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Negators are matched one token at a time; phrases cover "do not" and the like.
        let tokens = tokens
            .into_iter()
            .filter_map(|t| {
                let n = normalize_str(t.as_ref());
                if n.contains(' ') {
                    tracing::debug!(negator = t.as_ref(), "dropping multi-token negator");
                    return None;
                }
                (!n.is_empty()).then_some(n)
            })
            .collect();
        Self {
            tokens,
            window,
            amplification,
        }
    }

    pub fn from_config(cfg: &NegationConfig) -> Self {
        Self::new(&cfg.tokens, cfg.window, cfg.amplification)
    }

    #[inline]
    pub fn is_negator(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn amplification(&self) -> f64 {
        self.amplification
    }
}

/// Result of lexicon scoring.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LexiconScore {
    /// Signed sum of (possibly negated) weights.
    pub raw: f64,
    /// Number of sentiment-bearing tokens.
    pub matched: usize,
    /// `raw / sqrt(matched)`, or 0 with no hits.
    pub score: f64,
}

/// Score a token sequence against the lexicon.
pub fn score_tokens<T: AsRef<str>>(
    tokens: &[T],
    lexicon: &Lexicon,
    negation: &Negation,
) -> LexiconScore {
    let mut raw = 0.0f64;
    let mut matched = 0usize;
    // Remaining look-ahead slots of an armed negation.
    let mut pending = 0usize;

    for tok in tokens {
        let w = tok.as_ref();
        if w.is_empty() {
            continue;
        }

        if negation.is_negator(w) {
            pending = negation.window;
            continue;
        }

        if let Some(weight) = lexicon.weight(w) {
            matched += 1;
            if pending > 0 {
                raw += -weight * negation.amplification;
                pending = 0;
            } else {
                raw += weight;
            }
            continue;
        }

        pending = pending.saturating_sub(1);
    }

    let score = if matched > 0 {
        raw / (matched as f64).sqrt()
    } else {
        0.0
    };

    LexiconScore {
        raw,
        matched,
        score,
    }
}
