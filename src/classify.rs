//! Score clamping and threshold classification.
//!
//! Three-way: `score > positive` → Positive, `score < negative` → Negative, else
//! Neutral. Five-way adds `strong_positive` / `strong_negative` outside the base
//! thresholds. Thresholds may be asymmetric. The mapping is total: NaN is Neutral.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// Discrete sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    StrongNegative,
    Negative,
    Neutral,
    Positive,
    StrongPositive,
}

/// Three-way bucket used by aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::StrongNegative => "strong_negative",
            Label::Negative => "negative",
            Label::Neutral => "neutral",
            Label::Positive => "positive",
            Label::StrongPositive => "strong_positive",
        }
    }

    /// Strong labels fold into their base polarity.
    pub fn polarity(&self) -> Polarity {
        match self {
            Label::StrongPositive | Label::Positive => Polarity::Positive,
            Label::StrongNegative | Label::Negative => Polarity::Negative,
            Label::Neutral => Polarity::Neutral,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Polarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Positive => "positive",
            Polarity::Negative => "negative",
            Polarity::Neutral => "neutral",
        }
    }
}

/// Classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub positive: f64,
    pub negative: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strong_positive: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strong_negative: Option<f64>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::three_way(0.2, -0.2)
    }
}

impl Thresholds {
    pub fn three_way(positive: f64, negative: f64) -> Self {
        Self {
            positive,
            negative,
            strong_positive: None,
            strong_negative: None,
        }
    }

    pub fn five_way(positive: f64, negative: f64, strong_positive: f64, strong_negative: f64) -> Self {
        Self {
            positive,
            negative,
            strong_positive: Some(strong_positive),
            strong_negative: Some(strong_negative),
        }
    }

    pub fn is_five_way(&self) -> bool {
        self.strong_positive.is_some() && self.strong_negative.is_some()
    }

    /// Labels this configuration can produce, weakest-negative first.
    pub fn labels(&self) -> Vec<Label> {
        if self.is_five_way() {
            vec![
                Label::StrongNegative,
                Label::Negative,
                Label::Neutral,
                Label::Positive,
                Label::StrongPositive,
            ]
        } else {
            vec![Label::Negative, Label::Neutral, Label::Positive]
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        finite("thresholds.positive", self.positive)?;
        finite("thresholds.negative", self.negative)?;
        if self.negative > self.positive {
            return Err(ConfigError::InvertedThresholds {
                negative: self.negative,
                positive: self.positive,
            });
        }
        match (self.strong_positive, self.strong_negative) {
            (None, None) => Ok(()),
            (Some(sp), Some(sn)) => {
                finite("thresholds.strong_positive", sp)?;
                finite("thresholds.strong_negative", sn)?;
                if sp < self.positive {
                    return Err(ConfigError::InvertedStrongThreshold {
                        name: "strong_positive",
                        strong: sp,
                        base: self.positive,
                    });
                }
                if sn > self.negative {
                    return Err(ConfigError::InvertedStrongThreshold {
                        name: "strong_negative",
                        strong: sn,
                        base: self.negative,
                    });
                }
                Ok(())
            }
            _ => Err(ConfigError::PartialStrongThresholds),
        }
    }
}

/// Inclusive range the final score is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClampRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ClampRange {
    fn default() -> Self {
        Self {
            min: -1.0,
            max: 1.0,
        }
    }
}

impl ClampRange {
    /// NaN collapses to 0 clamped into range.
    #[inline]
    pub fn apply(&self, x: f64) -> f64 {
        if x.is_nan() {
            0.0f64.clamp(self.min, self.max)
        } else {
            x.clamp(self.min, self.max)
        }
    }

    /// Every threshold must be strictly inside the range, otherwise a label is unreachable.
    pub fn validate(&self, t: &Thresholds) -> Result<(), ConfigError> {
        finite("clamp.min", self.min)?;
        finite("clamp.max", self.max)?;
        if self.min >= self.max {
            return Err(ConfigError::EmptyClampRange {
                min: self.min,
                max: self.max,
            });
        }
        let mut checks = vec![("positive", t.positive), ("negative", t.negative)];
        if let Some(sp) = t.strong_positive {
            checks.push(("strong_positive", sp));
        }
        if let Some(sn) = t.strong_negative {
            checks.push(("strong_negative", sn));
        }
        for (name, value) in checks {
            if value <= self.min || value >= self.max {
                return Err(ConfigError::ThresholdOutsideClamp {
                    name,
                    value,
                    min: self.min,
                    max: self.max,
                });
            }
        }
        Ok(())
    }
}

/// Map a score to its label.
pub fn classify(score: f64, t: &Thresholds) -> Label {
    if score.is_nan() {
        return Label::Neutral;
    }
    if score > t.positive {
        return match t.strong_positive {
            Some(sp) if t.is_five_way() && score > sp => Label::StrongPositive,
            _ => Label::Positive,
        };
    }
    if score < t.negative {
        return match t.strong_negative {
            Some(sn) if t.is_five_way() && score < sn => Label::StrongNegative,
            _ => Label::Negative,
        };
    }
    Label::Neutral
}

fn finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { name, value })
    }
}
