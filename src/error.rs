//! Error taxonomy of the engine.
//!
//! - [`ValidationError`]: one input post is unusable. Recovered locally: the post is
//!   skipped and reported, the batch continues.
//! - [`ConfigError`]: the configuration is internally inconsistent. Fatal, raised only
//!   by [`crate::engine::SentimentEngine::new`].
//!
//! Scoring itself has no error path.

use thiserror::Error;

/// A required field is missing or malformed on a raw post.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("post #{index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },

    #[error("post #{index}: field `{field}` is malformed: {reason}")]
    Malformed {
        index: usize,
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    /// Position of the offending post in the input batch.
    pub fn index(&self) -> usize {
        match self {
            Self::MissingField { index, .. } | Self::Malformed { index, .. } => *index,
        }
    }
}

/// Inconsistent engine configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("`{name}` must be a finite number, got {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("`{name}` must be >= 0, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("`{name}` must be > 0, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("negative threshold {negative} is above positive threshold {positive}")]
    InvertedThresholds { negative: f64, positive: f64 },

    #[error("strong thresholds must be set together (strong_positive and strong_negative)")]
    PartialStrongThresholds,

    #[error("strong threshold `{name}` ({strong}) must lie outside its base threshold ({base})")]
    InvertedStrongThreshold {
        name: &'static str,
        strong: f64,
        base: f64,
    },

    #[error("clamp range [{min}, {max}] is empty")]
    EmptyClampRange { min: f64, max: f64 },

    #[error("threshold `{name}` ({value}) is unreachable within clamp range [{min}, {max}]")]
    ThresholdOutsideClamp {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("negation window must be between 1 and 3 tokens, got {0}")]
    NegationWindow(usize),

    #[error("lexicon weight for `{word}` must be finite, got {weight}")]
    LexiconWeight { word: String, weight: f64 },

    #[error("phrase pattern `{id}` is empty after normalization")]
    EmptyPattern { id: String },

    #[error("phrase pattern `{id}` regex error: {message}")]
    InvalidRegex { id: String, message: String },

    #[error("short-circuit pattern `{id}` is declared {class} but weight {weight} classifies as {actual}")]
    PatternClassMismatch {
        id: String,
        class: &'static str,
        weight: f64,
        actual: &'static str,
    },
}
