// src/lib.rs
// Public library surface for the CLI and integration tests.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod lexicon;
pub mod phrases;
pub mod pipeline;
pub mod post;
pub mod telemetry;
pub mod text;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{aggregate, GroupStats, OverallStats, SentimentCounts, SentimentRatios};
pub use crate::classify::{classify, ClampRange, Label, Polarity, Thresholds};
pub use crate::config::{load_config_default, load_config_from, EngineConfig, Preset};
pub use crate::engine::{BatchReport, JitterConfig, ScoreBreakdown, SentimentEngine};
pub use crate::error::{ConfigError, ValidationError};
pub use crate::pipeline::{JsonFileSource, PostSource};
pub use crate::post::{Post, RawPost, ScoredPost, SkippedPost};
