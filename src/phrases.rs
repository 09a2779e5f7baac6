//! Phrase / pattern matcher over normalized text.
//!
//! Patterns are literals (matched on token boundaries) or regexes, each with a
//! polarity weight and a declared class. Two tiers, chosen by configuration:
//! - `additive`: every matching pattern adds its weight to the base score.
//! - `short_circuit`: checked before word scoring; the first hit fixes the score.
//!   Negative patterns are tried first, then positive, then neutral, keeping config
//!   order inside each class, so ambiguous-but-alarming text leans toward caution.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::classify::{classify, ClampRange, Polarity, Thresholds};
use crate::error::ConfigError;
use crate::text::normalize_str;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhraseTier {
    #[default]
    Additive,
    ShortCircuit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatcherKind {
    #[default]
    Literal,
    Regex,
}

/// Pattern as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhrasePatternCfg {
    pub id: String,
    #[serde(default)]
    pub kind: MatcherKind,
    pub pattern: String,
    pub weight: f64,
    pub class: Polarity,
}

impl PhrasePatternCfg {
    pub fn literal(id: &str, pattern: &str, weight: f64, class: Polarity) -> Self {
        Self {
            id: id.to_string(),
            kind: MatcherKind::Literal,
            pattern: pattern.to_string(),
            weight,
            class,
        }
    }

    pub fn regex(id: &str, pattern: &str, weight: f64, class: Polarity) -> Self {
        Self {
            id: id.to_string(),
            kind: MatcherKind::Regex,
            pattern: pattern.to_string(),
            weight,
            class,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseConfig {
    #[serde(default)]
    pub tier: PhraseTier,
    #[serde(default = "default_patterns")]
    pub patterns: Vec<PhrasePatternCfg>,
}

impl Default for PhraseConfig {
    fn default() -> Self {
        Self {
            tier: PhraseTier::default(),
            patterns: default_patterns(),
        }
    }
}

impl PhraseConfig {
    /// No patterns at all.
    pub fn none() -> Self {
        Self {
            tier: PhraseTier::Additive,
            patterns: Vec::new(),
        }
    }
}

/// Bundled pattern list.
pub fn default_patterns() -> Vec<PhrasePatternCfg> {
    vec![
        PhrasePatternCfg::regex(
            "intensified_recommend",
            r"\b(highly|strongly|definitely|absolutely)\b.*\b(recommend|suggest)\b",
            0.8,
            Polarity::Positive,
        ),
        PhrasePatternCfg::regex(
            "negated_recommend",
            r"\b(never|dont|do not|wouldnt|would not)\b.*\b(recommend|suggest)\b",
            -0.8,
            Polarity::Negative,
        ),
        PhrasePatternCfg::regex(
            "comparison_better",
            r"\b(better than|superior to|prefer)\b",
            0.6,
            Polarity::Positive,
        ),
        PhrasePatternCfg::regex(
            "comparison_worse",
            r"\b(worse than|inferior to)\b",
            -0.6,
            Polarity::Negative,
        ),
        PhrasePatternCfg::literal("stay_away", "stay away", -0.9, Polarity::Negative),
        PhrasePatternCfg::literal("waste_of_money", "waste of money", -0.9, Polarity::Negative),
        PhrasePatternCfg::literal("not_worth_it", "not worth it", -0.7, Polarity::Negative),
        PhrasePatternCfg::literal("game_changer", "game changer", 0.7, Polarity::Positive),
    ]
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Normalized literal padded with spaces for token-boundary matching.
    Literal(String),
    Regex(Regex),
}

/// Compiled pattern.
#[derive(Debug, Clone)]
pub struct PhrasePattern {
    pub id: String,
    pub weight: f64,
    pub class: Polarity,
    matcher: Matcher,
}

impl PhrasePattern {
    /// `padded` is the normalized text wrapped in single spaces.
    fn is_match(&self, text: &str, padded: &str) -> bool {
        match &self.matcher {
            Matcher::Literal(lit) => padded.contains(lit.as_str()),
            Matcher::Regex(re) => re.is_match(text),
        }
    }
}

/// Additive-tier result.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PhraseScore {
    pub score: f64,
    pub hits: Vec<String>,
}

/// Compiled, tier-aware pattern list.
#[derive(Debug, Clone)]
pub struct PhraseSet {
    tier: PhraseTier,
    patterns: Vec<PhrasePattern>,
}

impl PhraseSet {
    /// Compile patterns. In the short-circuit tier each pattern's clamped weight must
    /// classify to its declared class, otherwise the fixed score would contradict it.
    pub fn compile(
        cfg: &PhraseConfig,
        clamp: &ClampRange,
        thresholds: &Thresholds,
    ) -> Result<Self, ConfigError> {
        let mut patterns = cfg
            .patterns
            .iter()
            .map(compile_one)
            .collect::<Result<Vec<_>, _>>()?;

        if cfg.tier == PhraseTier::ShortCircuit {
            for p in &patterns {
                let actual = classify(clamp.apply(p.weight), thresholds).polarity();
                if actual != p.class {
                    return Err(ConfigError::PatternClassMismatch {
                        id: p.id.clone(),
                        class: p.class.as_str(),
                        weight: p.weight,
                        actual: actual.as_str(),
                    });
                }
            }
            // stable: config order is kept inside each class
            patterns.sort_by_key(|p| class_rank(p.class));
        }

        Ok(Self {
            tier: cfg.tier,
            patterns,
        })
    }

    pub fn tier(&self) -> PhraseTier {
        self.tier
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Sum of the weights of every matching pattern.
    pub fn additive(&self, text: &str) -> PhraseScore {
        let padded = pad(text);
        let mut out = PhraseScore::default();
        for p in &self.patterns {
            if p.is_match(text, &padded) {
                out.score += p.weight;
                out.hits.push(p.id.clone());
            }
        }
        out
    }

    /// First matching pattern in short-circuit order.
    pub fn first_match(&self, text: &str) -> Option<&PhrasePattern> {
        let padded = pad(text);
        self.patterns.iter().find(|p| p.is_match(text, &padded))
    }
}

fn compile_one(cfg: &PhrasePatternCfg) -> Result<PhrasePattern, ConfigError> {
    if !cfg.weight.is_finite() {
        return Err(ConfigError::NonFinite {
            name: "phrases.patterns.weight",
            value: cfg.weight,
        });
    }
    let matcher = match cfg.kind {
        MatcherKind::Literal => {
            let lit = normalize_str(&cfg.pattern);
            if lit.is_empty() {
                return Err(ConfigError::EmptyPattern { id: cfg.id.clone() });
            }
            Matcher::Literal(pad(&lit))
        }
        MatcherKind::Regex => {
            if cfg.pattern.trim().is_empty() {
                return Err(ConfigError::EmptyPattern { id: cfg.id.clone() });
            }
            let re = Regex::new(&cfg.pattern).map_err(|e| ConfigError::InvalidRegex {
                id: cfg.id.clone(),
                message: e.to_string(),
            })?;
            Matcher::Regex(re)
        }
    };
    Ok(PhrasePattern {
        id: cfg.id.clone(),
        weight: cfg.weight,
        class: cfg.class,
        matcher,
    })
}

fn class_rank(c: Polarity) -> u8 {
    match c {
        Polarity::Negative => 0,
        Polarity::Positive => 1,
        Polarity::Neutral => 2,
    }
}

fn pad(s: &str) -> String {
    format!(" {s} ")
}
