//! # Sentiment Engine
//! Validated configuration compiled once, then shared read-only across threads.
//!
//! Per post: compose + normalize text → short-circuit phrases (if that tier is
//! configured) → lexicon score with negation → additive phrases → context factors
//! → optional jitter → clamp → classify. The label is always derived from the
//! final score, so the two never disagree.
//!
//! Batches: validation failures are reported as skipped records and never abort
//! the batch. Large batches are scored with rayon; output keeps input order.

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, Aggregation, GroupStats, OverallStats};
use crate::classify::{classify, ClampRange, Label, Thresholds};
use crate::config::{EngineConfig, Preset};
use crate::context::{self, ContextConfig, ContextFactors, ContextInput};
use crate::error::ConfigError;
use crate::lexicon::{score_tokens, Lexicon, LexiconScore, Negation};
use crate::phrases::{PhraseScore, PhraseSet, PhraseTier};
use crate::post::{Post, RawPost, ScoredPost, SkippedPost};
use crate::telemetry;
use crate::text::{compose_post_text, normalize};

/// Seeded per-post noise added before the final clamp. Off unless configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterConfig {
    /// Offsets are drawn uniformly from `[-amplitude, amplitude]`.
    pub amplitude: f64,
    #[serde(default)]
    pub seed: u64,
}

impl JitterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.amplitude.is_finite() {
            return Err(ConfigError::NonFinite {
                name: "jitter.amplitude",
                value: self.amplitude,
            });
        }
        if self.amplitude < 0.0 {
            return Err(ConfigError::Negative {
                name: "jitter.amplitude",
                value: self.amplitude,
            });
        }
        Ok(())
    }

    /// Same `(seed, post_id)` always yields the same offset.
    pub fn offset(&self, post_id: &str) -> f64 {
        if self.amplitude <= 0.0 {
            return 0.0;
        }
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(post_id.as_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        let mut rng = StdRng::seed_from_u64(u64::from_le_bytes(bytes));
        rng.random_range(-self.amplitude..=self.amplitude)
    }
}

/// Every intermediate value of one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub lexicon: LexiconScore,
    pub phrases: PhraseScore,
    /// Id of the pattern that fixed the score, in the short-circuit tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_circuit: Option<String>,
    /// Lexicon + additive phrase score, before context.
    pub base: f64,
    /// Absent when a short-circuit pattern decided the score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextFactors>,
    pub jitter: f64,
    pub final_score: f64,
    pub label: Label,
}

/// Output of [`SentimentEngine::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub posts: Vec<ScoredPost>,
    pub overall: OverallStats,
    pub groups: BTreeMap<String, GroupStats>,
    pub skipped: Vec<SkippedPost>,
}

#[derive(Debug, Clone)]
pub struct SentimentEngine {
    lexicon: Lexicon,
    negation: Negation,
    phrases: PhraseSet,
    context: ContextConfig,
    thresholds: Thresholds,
    clamp: ClampRange,
    jitter: Option<JitterConfig>,
    parallel_threshold: usize,
    dev_log: bool,
}

impl SentimentEngine {
    /// Validate and compile a configuration. Any inconsistency is rejected here,
    /// never at scoring time.
    pub fn new(cfg: &EngineConfig) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let phrases = PhraseSet::compile(&cfg.phrases, &cfg.clamp, &cfg.thresholds)?;
        let lexicon = cfg.lexicon.normalized();
        if lexicon.len() < cfg.lexicon.len() {
            debug!(
                configured = cfg.lexicon.len(),
                kept = lexicon.len(),
                "lexicon entries dropped or merged by normalization"
            );
        }
        Ok(Self {
            lexicon,
            negation: Negation::from_config(&cfg.negation),
            phrases,
            context: cfg.context,
            thresholds: cfg.thresholds,
            clamp: cfg.clamp,
            jitter: cfg.jitter,
            parallel_threshold: cfg.parallel_threshold,
            dev_log: telemetry::dev_logging_enabled(),
        })
    }

    pub fn from_preset(preset: Preset) -> Result<Self, ConfigError> {
        Self::new(&preset.config())
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn clamp_range(&self) -> &ClampRange {
        &self.clamp
    }

    pub fn classify(&self, score: f64) -> Label {
        classify(score, &self.thresholds)
    }

    /// Score one post and keep every intermediate value.
    pub fn explain(&self, post: &Post, now: DateTime<Utc>) -> ScoreBreakdown {
        let text = compose_post_text(&post.title, Some(&post.body));
        let norm = normalize(&text);

        if self.phrases.tier() == PhraseTier::ShortCircuit {
            if let Some(hit) = self.phrases.first_match(&norm.text) {
                let final_score = self.clamp.apply(hit.weight);
                return ScoreBreakdown {
                    lexicon: LexiconScore::default(),
                    phrases: PhraseScore {
                        score: hit.weight,
                        hits: vec![hit.id.clone()],
                    },
                    short_circuit: Some(hit.id.clone()),
                    base: hit.weight,
                    context: None,
                    jitter: 0.0,
                    final_score,
                    label: self.classify(final_score),
                };
            }
        }

        let lexicon = score_tokens(&norm.tokens, &self.lexicon, &self.negation);
        let phrases = match self.phrases.tier() {
            PhraseTier::Additive => self.phrases.additive(&norm.text),
            PhraseTier::ShortCircuit => PhraseScore::default(),
        };
        let base = lexicon.score + phrases.score;

        let input = ContextInput {
            raw_score: post.raw_score,
            comment_count: post.comment_count,
            created_at: post.created_at,
            upvote_ratio: post.upvote_ratio,
            token_count: norm.token_count(),
        };
        let factors = context::factors(&input, &self.context, now);
        let jitter = self.jitter.map(|j| j.offset(&post.id)).unwrap_or(0.0);
        let final_score = self.clamp.apply(factors.apply(base) + jitter);

        ScoreBreakdown {
            lexicon,
            phrases,
            short_circuit: None,
            base,
            context: Some(factors),
            jitter,
            final_score,
            label: self.classify(final_score),
        }
    }

    pub fn score_post(&self, post: &Post, now: DateTime<Utc>) -> ScoredPost {
        let b = self.explain(post, now);
        debug!(post = %post.id, score = b.final_score, label = %b.label, "post scored");
        if self.dev_log {
            let text = compose_post_text(&post.title, Some(&post.body));
            telemetry::dev_log_score(
                &post.id,
                &text,
                &b.phrases.hits,
                b.lexicon.matched,
                b.final_score,
                b.label.as_str(),
            );
        }
        ScoredPost {
            post: post.clone(),
            sentiment_score: b.final_score,
            label: b.label,
        }
    }

    /// Score a batch, in parallel once it reaches `parallel_threshold` posts.
    pub fn score_posts(&self, posts: &[Post], now: DateTime<Utc>) -> Vec<ScoredPost> {
        if posts.len() >= self.parallel_threshold {
            self.score_posts_parallel(posts, now)
        } else {
            posts.iter().map(|p| self.score_post(p, now)).collect()
        }
    }

    /// Always parallel; same output as the sequential path.
    pub fn score_posts_parallel(&self, posts: &[Post], now: DateTime<Utc>) -> Vec<ScoredPost> {
        posts.par_iter().map(|p| self.score_post(p, now)).collect()
    }

    /// Validate, score and aggregate a raw batch.
    pub fn analyze(&self, raw: &[RawPost], now: DateTime<Utc>) -> BatchReport {
        telemetry::ensure_metrics_described();
        let t0 = Instant::now();

        let mut posts = Vec::with_capacity(raw.len());
        let mut skipped = Vec::new();
        for (i, r) in raw.iter().enumerate() {
            match r.validate(i) {
                Ok(p) => posts.push(p),
                Err(e) => {
                    warn!(index = i, error = %e, "skipping invalid post");
                    skipped.push(SkippedPost::new(r, &e));
                }
            }
        }

        let scored = self.score_posts(&posts, now);
        let Aggregation { overall, groups } = aggregate(&scored);

        counter!(telemetry::POSTS_SCORED_TOTAL).increment(scored.len() as u64);
        counter!(telemetry::POSTS_SKIPPED_TOTAL).increment(skipped.len() as u64);
        let ms = t0.elapsed().as_secs_f64() * 1000.0;
        histogram!(telemetry::BATCH_MS).record(ms);

        info!(
            scored = scored.len(),
            skipped = skipped.len(),
            groups = groups.len(),
            ms,
            "batch analyzed"
        );

        BatchReport {
            posts: scored,
            overall,
            groups,
            skipped,
        }
    }
}
