// src/pipeline.rs
//! Fetch → analyze. Sources hand over raw post records; the engine does the rest.
//! A failing source is logged and counted, the remaining sources still run.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde_json::Value;
use std::path::PathBuf;

use crate::engine::{BatchReport, SentimentEngine};
use crate::post::{RawPost, Scalar};
use crate::telemetry;

#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_posts(&self) -> Result<Vec<RawPost>>;
    fn name(&self) -> &'static str;
}

/// Posts read from a JSON file (see [`parse_posts_json`] for accepted shapes).
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl PostSource for JsonFileSource {
    async fn fetch_posts(&self) -> Result<Vec<RawPost>> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading posts from {}", self.path.display()))?;
        parse_posts_json(&data).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}

/// Accepts a bare array of posts, `{"posts": [...]}`, or a Reddit listing
/// (`{"data": {"children": [{"data": {...}}]}}`). A record serde cannot decode
/// keeps its id and becomes a malformed skip at validation.
pub fn parse_posts_json(s: &str) -> Result<Vec<RawPost>> {
    let root: Value = serde_json::from_str(s)?;
    let items = match root {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            if let Some(Value::Array(items)) = obj.remove("posts") {
                items
            } else if let Some(children) = obj
                .get_mut("data")
                .and_then(|d| d.get_mut("children"))
                .and_then(Value::as_array_mut)
            {
                children
                    .iter_mut()
                    .map(|c| {
                        let inner = c.get_mut("data").map(Value::take);
                        inner.unwrap_or_else(|| c.take())
                    })
                    .collect()
            } else {
                anyhow::bail!("expected an array of posts, a `posts` array or a listing");
            }
        }
        _ => anyhow::bail!("expected an array of posts, a `posts` array or a listing"),
    };

    Ok(items
        .into_iter()
        .enumerate()
        .map(|(i, mut v)| {
            settle_aliases(&mut v);
            let id = v.get("id").cloned();
            serde_json::from_value::<RawPost>(v).unwrap_or_else(|e| {
                tracing::debug!(index = i, error = %e, "undecodable post record");
                let id = id.and_then(|id| serde_json::from_value::<Scalar>(id).ok());
                RawPost::undecodable(id, e.to_string())
            })
        })
        .collect())
}

/// Field name paired with the alias [`RawPost`] also accepts.
const ALIASED_FIELDS: [(&str, &str); 3] = [
    ("created_at", "created_utc"),
    ("subreddit", "source_group"),
    ("selftext", "body"),
];

/// Serde rejects a record carrying both a field and its alias, so keep one:
/// the field itself, unless it is null and the alias is not.
fn settle_aliases(v: &mut Value) {
    let Value::Object(obj) = v else {
        return;
    };
    for (field, alias) in ALIASED_FIELDS {
        if !(obj.contains_key(field) && obj.contains_key(alias)) {
            continue;
        }
        let field_null = obj.get(field).is_some_and(Value::is_null);
        let alias_null = obj.get(alias).is_some_and(Value::is_null);
        let dropped = if field_null && !alias_null { field } else { alias };
        obj.remove(dropped);
        tracing::debug!(field, alias, dropped, "record carries field and alias");
    }
}

/// Run the pipeline once over every source.
pub async fn run_once(
    sources: &[Box<dyn PostSource>],
    engine: &SentimentEngine,
    now: DateTime<Utc>,
) -> BatchReport {
    telemetry::ensure_metrics_described();

    let mut raw = Vec::new();
    for s in sources {
        match s.fetch_posts().await {
            Ok(mut v) => {
                tracing::debug!(source = s.name(), posts = v.len(), "source fetched");
                raw.append(&mut v);
            }
            Err(e) => {
                tracing::warn!(error = ?e, source = s.name(), "source error");
                counter!(telemetry::SOURCE_ERRORS_TOTAL).increment(1);
            }
        }
    }

    let report = engine.analyze(&raw, now);
    gauge!(telemetry::PIPELINE_LAST_RUN_TS).set(now.timestamp() as f64);
    report
}

/// Run a single source. Unlike [`run_once`], a failing fetch is returned as an
/// error instead of producing an empty report.
pub async fn run_source(
    source: &dyn PostSource,
    engine: &SentimentEngine,
    now: DateTime<Utc>,
) -> Result<BatchReport> {
    telemetry::ensure_metrics_described();

    let raw = match source.fetch_posts().await {
        Ok(v) => v,
        Err(e) => {
            counter!(telemetry::SOURCE_ERRORS_TOTAL).increment(1);
            return Err(e.context(format!("source `{}` failed", source.name())));
        }
    };

    let report = engine.analyze(&raw, now);
    gauge!(telemetry::PIPELINE_LAST_RUN_TS).set(now.timestamp() as f64);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_three_shapes() {
        let arr = r#"[{"id":"a","title":"t","subreddit":"r"}]"#;
        assert_eq!(parse_posts_json(arr).unwrap().len(), 1);

        let wrapped = r#"{"posts":[{"id":"a"},{"id":"b"}]}"#;
        assert_eq!(parse_posts_json(wrapped).unwrap().len(), 2);

        let listing = r#"{"kind":"Listing","data":{"children":[
            {"kind":"t3","data":{"id":"x1","title":"Hello","subreddit":"rust"}}
        ]}}"#;
        let posts = parse_posts_json(listing).unwrap();
        assert_eq!(posts[0].id_hint().as_deref(), Some("x1"));
    }

    #[test]
    fn non_object_elements_become_malformed_records() {
        let posts = parse_posts_json(r#"[42, {"id":"a"}]"#).unwrap();
        assert_eq!(posts.len(), 2);
        assert!(posts[0].decode_error.is_some());
        assert!(matches!(
            posts[0].validate(0),
            Err(crate::error::ValidationError::Malformed { field: "record", .. })
        ));
        assert!(posts[1].decode_error.is_none());
    }

    #[test]
    fn field_and_alias_together_keep_the_field() {
        let posts = parse_posts_json(
            r#"[{"id":"p1","title":"Nice","score":5,"num_comments":1,
                 "created_utc":1600000000,"created_at":"2023-11-14T22:13:20Z",
                 "subreddit":"rust","source_group":"ignored",
                 "selftext":"kept","body":"dropped"}]"#,
        )
        .unwrap();
        let p = posts[0].validate(0).unwrap();
        assert_eq!(p.id, "p1");
        assert_eq!(p.created_at.timestamp(), 1_700_000_000);
        assert_eq!(p.source_group, "rust");
        assert_eq!(p.body, "kept");
    }

    #[test]
    fn null_field_yields_to_its_alias() {
        let posts = parse_posts_json(
            r#"[{"id":"p2","title":"t","score":0,"num_comments":0,
                 "created_at":null,"created_utc":1700000000,"subreddit":"go"}]"#,
        )
        .unwrap();
        let p = posts[0].validate(0).unwrap();
        assert_eq!(p.created_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn rejects_unknown_top_level() {
        assert!(parse_posts_json(r#""nope""#).is_err());
        assert!(parse_posts_json(r#"{"items":[]}"#).is_err());
        assert!(parse_posts_json("not json").is_err());
    }
}
