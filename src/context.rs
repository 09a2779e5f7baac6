//! Context adjustment: engagement and recency signals folded into the base score.
//!
//! ```text
//! karma   = ln(|raw_score| + 1) * sign(raw_score) * karma_weight
//! comment = ln(comments + 1) * comment_weight  (- controversy_penalty above threshold)
//! ratio   = (upvote_ratio - 0.5) * ratio_weight  (0 when the ratio is absent)
//! decay   = 1 / (1 + age_days * decay_rate)
//! length  = 1 + min(tokens / length_divisor, length_cap)
//! final   = (base + karma + comment + ratio) * decay * length
//! ```
//! Clamping happens afterwards, in the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const SECS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// k1
    pub karma_weight: f64,
    /// k2
    pub comment_weight: f64,
    /// Comment count above which the controversy penalty applies. `None` disables it.
    pub controversy_threshold: Option<u64>,
    pub controversy_penalty: f64,
    pub ratio_weight: f64,
    /// k3, per day.
    pub decay_rate: f64,
    /// L
    pub length_divisor: f64,
    pub length_cap: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            karma_weight: 0.1,
            comment_weight: 0.05,
            controversy_threshold: Some(100),
            controversy_penalty: 0.1,
            ratio_weight: 0.0,
            decay_rate: 0.1,
            length_divisor: 50.0,
            length_cap: 0.5,
        }
    }
}

impl ContextConfig {
    /// Every factor neutral: `final == base`.
    pub fn disabled() -> Self {
        Self {
            karma_weight: 0.0,
            comment_weight: 0.0,
            controversy_threshold: None,
            controversy_penalty: 0.0,
            ratio_weight: 0.0,
            decay_rate: 0.0,
            length_divisor: 50.0,
            length_cap: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, v) in [
            ("context.karma_weight", self.karma_weight),
            ("context.comment_weight", self.comment_weight),
            ("context.controversy_penalty", self.controversy_penalty),
            ("context.ratio_weight", self.ratio_weight),
            ("context.decay_rate", self.decay_rate),
            ("context.length_divisor", self.length_divisor),
            ("context.length_cap", self.length_cap),
        ] {
            if !v.is_finite() {
                return Err(ConfigError::NonFinite { name, value: v });
            }
        }
        // a negative rate would grow old posts away from neutral
        for (name, v) in [
            ("context.decay_rate", self.decay_rate),
            ("context.length_cap", self.length_cap),
            ("context.controversy_penalty", self.controversy_penalty),
        ] {
            if v < 0.0 {
                return Err(ConfigError::Negative { name, value: v });
            }
        }
        if self.length_divisor <= 0.0 {
            return Err(ConfigError::NonPositive {
                name: "context.length_divisor",
                value: self.length_divisor,
            });
        }
        Ok(())
    }
}

/// Non-textual inputs of one post.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextInput {
    pub raw_score: i64,
    pub comment_count: u64,
    pub created_at: DateTime<Utc>,
    pub upvote_ratio: Option<f64>,
    pub token_count: usize,
}

/// Individual factors, kept for explainability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ContextFactors {
    pub karma: f64,
    pub comment: f64,
    pub ratio: f64,
    pub time_decay: f64,
    pub length: f64,
}

impl ContextFactors {
    /// `(base + karma + comment + ratio) * time_decay * length`, unclamped.
    pub fn apply(&self, base: f64) -> f64 {
        (base + self.karma + self.comment + self.ratio) * self.time_decay * self.length
    }
}

pub fn karma_factor(raw_score: i64, k1: f64) -> f64 {
    let mag = (raw_score.unsigned_abs() as f64 + 1.0).ln();
    mag * (raw_score.signum() as f64) * k1
}

pub fn comment_factor(comments: u64, cfg: &ContextConfig) -> f64 {
    let mut f = (comments as f64 + 1.0).ln() * cfg.comment_weight;
    if let Some(limit) = cfg.controversy_threshold {
        if comments > limit {
            f -= cfg.controversy_penalty;
        }
    }
    f
}

pub fn ratio_factor(ratio: Option<f64>, weight: f64) -> f64 {
    match ratio {
        Some(r) => (r - 0.5) * weight,
        None => 0.0,
    }
}

/// Age in fractional days; future timestamps count as age 0.
pub fn age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let secs = (now - created_at).num_milliseconds() as f64 / 1000.0;
    (secs / SECS_PER_DAY).max(0.0)
}

pub fn time_decay(age_days: f64, k3: f64) -> f64 {
    1.0 / (1.0 + age_days.max(0.0) * k3)
}

pub fn length_factor(token_count: usize, cfg: &ContextConfig) -> f64 {
    1.0 + (token_count as f64 / cfg.length_divisor).min(cfg.length_cap)
}

/// Compute every factor for one post relative to `now`.
pub fn factors(input: &ContextInput, cfg: &ContextConfig, now: DateTime<Utc>) -> ContextFactors {
    ContextFactors {
        karma: karma_factor(input.raw_score, cfg.karma_weight),
        comment: comment_factor(input.comment_count, cfg),
        ratio: ratio_factor(input.upvote_ratio, cfg.ratio_weight),
        time_decay: time_decay(age_days(input.created_at, now), cfg.decay_rate),
        length: length_factor(input.token_count, cfg),
    }
}
