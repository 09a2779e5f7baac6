//! Per-group and overall label statistics.
//!
//! Recomputed from scratch on every call. Groups live in a `BTreeMap`, so the
//! result is identical for any input order. Overall stats are tallied directly over
//! all posts, not combined from group ratios. Ratios are `count / total`, with
//! `0 / 0` defined as 0.0.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::classify::Polarity;
use crate::post::ScoredPost;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub negative: u64,
    pub neutral: u64,
}

impl SentimentCounts {
    pub fn record(&mut self, p: Polarity) {
        match p {
            Polarity::Positive => self.positive += 1,
            Polarity::Negative => self.negative += 1,
            Polarity::Neutral => self.neutral += 1,
        }
    }

    pub fn sum(&self) -> u64 {
        self.positive + self.negative + self.neutral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentRatios {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl SentimentRatios {
    pub fn from_counts(c: &SentimentCounts) -> Self {
        let total = c.sum();
        let r = |n: u64| {
            if total == 0 {
                0.0
            } else {
                n as f64 / total as f64
            }
        };
        Self {
            positive: r(c.positive),
            negative: r(c.negative),
            neutral: r(c.neutral),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub group_name: String,
    pub counts: SentimentCounts,
    pub total: u64,
    pub ratios: SentimentRatios,
}

impl GroupStats {
    pub fn from_counts(group_name: impl Into<String>, counts: SentimentCounts) -> Self {
        Self {
            group_name: group_name.into(),
            total: counts.sum(),
            ratios: SentimentRatios::from_counts(&counts),
            counts,
        }
    }

    /// A group with no posts.
    pub fn empty(group_name: impl Into<String>) -> Self {
        Self::from_counts(group_name, SentimentCounts::default())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverallStats {
    pub counts: SentimentCounts,
    pub total: u64,
    pub ratios: SentimentRatios,
}

impl OverallStats {
    pub fn from_counts(counts: SentimentCounts) -> Self {
        Self {
            total: counts.sum(),
            ratios: SentimentRatios::from_counts(&counts),
            counts,
        }
    }
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Aggregation {
    pub overall: OverallStats,
    pub groups: BTreeMap<String, GroupStats>,
}

/// Group by `source_group` and tally labels (strong labels fold into their base).
pub fn aggregate(posts: &[ScoredPost]) -> Aggregation {
    let mut overall = SentimentCounts::default();
    let mut per_group: BTreeMap<&str, SentimentCounts> = BTreeMap::new();

    for sp in posts {
        let p = sp.label.polarity();
        overall.record(p);
        per_group
            .entry(sp.post.source_group.as_str())
            .or_default()
            .record(p);
    }

    let groups = per_group
        .into_iter()
        .map(|(name, counts)| (name.to_string(), GroupStats::from_counts(name, counts)))
        .collect();

    Aggregation {
        overall: OverallStats::from_counts(overall),
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Label;
    use crate::post::Post;
    use chrono::{TimeZone, Utc};

    fn sp(id: &str, group: &str, label: Label) -> ScoredPost {
        ScoredPost {
            post: Post {
                id: id.into(),
                title: String::new(),
                body: String::new(),
                source_group: group.into(),
                raw_score: 0,
                comment_count: 0,
                created_at: Utc.timestamp_opt(0, 0).unwrap(),
                upvote_ratio: None,
            },
            sentiment_score: 0.0,
            label,
        }
    }

    fn batch() -> Vec<ScoredPost> {
        vec![
            sp("1", "rust", Label::Positive),
            sp("2", "rust", Label::StrongPositive),
            sp("3", "rust", Label::Negative),
            sp("4", "golang", Label::Neutral),
            sp("5", "golang", Label::StrongNegative),
            sp("6", "python", Label::Neutral),
        ]
    }

    #[test]
    fn counts_and_ratios_per_group() {
        let a = aggregate(&batch());
        let rust = &a.groups["rust"];
        assert_eq!(rust.counts.positive, 2);
        assert_eq!(rust.counts.negative, 1);
        assert_eq!(rust.total, 3);
        assert!((rust.ratios.positive - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(a.groups["golang"].counts.negative, 1);
        assert_eq!(a.overall.total, 6);
        assert_eq!(a.overall.counts.neutral, 2);
    }

    #[test]
    fn group_counts_sum_to_overall() {
        let a = aggregate(&batch());
        let mut sum = SentimentCounts::default();
        for g in a.groups.values() {
            assert_eq!(g.counts.sum(), g.total);
            sum.positive += g.counts.positive;
            sum.negative += g.counts.negative;
            sum.neutral += g.counts.neutral;
        }
        assert_eq!(sum, a.overall.counts);
        assert_eq!(a.overall.counts.sum(), a.overall.total);
    }

    #[test]
    fn order_independent_and_idempotent() {
        let b = batch();
        let mut rev = b.clone();
        rev.reverse();
        assert_eq!(aggregate(&b), aggregate(&rev));
        assert_eq!(aggregate(&b), aggregate(&b));
    }

    #[test]
    fn empty_inputs_have_zero_ratios() {
        let a = aggregate(&[]);
        assert_eq!(a.overall.total, 0);
        assert_eq!(a.overall.ratios, SentimentRatios::default());
        assert!(a.groups.is_empty());

        let g = GroupStats::empty("nobody");
        assert_eq!(g.total, 0);
        assert_eq!(g.ratios.positive, 0.0);
        assert!(!g.ratios.neutral.is_nan());
    }

    #[test]
    fn serialized_shape() {
        let a = aggregate(&batch()[..1]);
        let v = serde_json::to_value(&a.groups["rust"]).unwrap();
        assert_eq!(v["group_name"], "rust");
        assert_eq!(v["counts"]["positive"], 1);
        assert_eq!(v["ratios"]["positive"], 1.0);
        assert_eq!(v["total"], 1);
    }
}
