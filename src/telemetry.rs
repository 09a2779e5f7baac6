// src/telemetry.rs
//! Metric names, one-time registration and the anonymized dev logger.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use tracing::info;

pub const POSTS_SCORED_TOTAL: &str = "sentiment_posts_scored_total";
pub const POSTS_SKIPPED_TOTAL: &str = "sentiment_posts_skipped_total";
pub const SOURCE_ERRORS_TOTAL: &str = "sentiment_source_errors_total";
pub const BATCH_MS: &str = "sentiment_batch_ms";
pub const PIPELINE_LAST_RUN_TS: &str = "sentiment_pipeline_last_run_ts";

pub const ENV_DEV_LOG: &str = "SENTIMENT_DEV_LOG";
pub const ENV_APP_ENV: &str = "APP_ENV";

/// One-time metrics registration (so series show up on the exporter).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(POSTS_SCORED_TOTAL, "Posts scored and labeled.");
        describe_counter!(
            POSTS_SKIPPED_TOTAL,
            "Post records rejected by validation."
        );
        describe_counter!(SOURCE_ERRORS_TOTAL, "Post source fetch/parse errors.");
        describe_histogram!(BATCH_MS, "Batch analysis time in milliseconds.");
        describe_gauge!(
            PIPELINE_LAST_RUN_TS,
            "Unix ts when the scoring pipeline last ran."
        );
    });
}

/// Dev logging is opt-in (`SENTIMENT_DEV_LOG=1`) and only honoured in debug builds
/// or when `APP_ENV` names a local environment.
pub fn dev_logging_enabled() -> bool {
    let on = std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var(ENV_APP_ENV)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Stable 12-char hex tag for a piece of text (leading 6 bytes of its SHA-256).
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    Sha256::digest(text.as_bytes())[..6]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Never logs raw text, only a hash of it plus the scoring outcome.
pub(crate) fn dev_log_score(
    post_id: &str,
    text: &str,
    hits: &[String],
    lexicon_matches: usize,
    score: f64,
    label: &str,
) {
    let id = anon_hash(text);
    let phrases = head_strings(hits, 5);
    info!(
        target: "sentiment",
        post = post_id, %id, %score, label, lexicon_matches,
        ?phrases
    );
}

/// At most `max` leading items, stringified.
pub(crate) fn head_strings<T: ToString>(items: &[T], max: usize) -> Vec<String> {
    items[..items.len().min(max)]
        .iter()
        .map(ToString::to_string)
        .collect()
}
