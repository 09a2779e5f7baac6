// src/main.rs
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reddit_sentiment::pipeline::{self, JsonFileSource};
use reddit_sentiment::{load_config_default, SentimentEngine};

/// Logs go to stderr so stdout stays pure JSON.
/// `RUST_LOG` overrides the filter; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reddit_sentiment=info,sentiment=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: reddit-sentiment-analyzer <posts.json>"))?;

    let cfg = load_config_default()?;
    let engine = SentimentEngine::new(&cfg).context("invalid engine configuration")?;

    // Single input: an unreadable or unparsable file fails the run.
    let source = JsonFileSource::new(path);
    let report = pipeline::run_source(&source, &engine, Utc::now()).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
