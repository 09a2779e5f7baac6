//! Input boundary: raw post records from the fetcher, validated into [`Post`].
//!
//! Raw fields are deserialized leniently ([`Scalar`]) so a single odd record never
//! fails the whole batch at the serde level; validation decides per post.
//! `created_at` accepts epoch seconds (int, float or numeric string) and
//! RFC 3339 / ISO-8601 strings (naive ones are taken as UTC).

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Label;
use crate::error::ValidationError;

/// Loosely typed JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde_json::Value),
}

impl Scalar {
    fn kind(&self) -> &'static str {
        match self {
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Text(_) => "string",
            Scalar::Other(_) => "non-scalar value",
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            // 2^63 is exact as f64; anything at or past it would saturate
            Scalar::Float(f)
                if f.is_finite()
                    && f.fract() == 0.0
                    && *f >= i64::MIN as f64
                    && *f < i64::MAX as f64 =>
            {
                Some(*f as i64)
            }
            Scalar::Text(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        let v = match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Float(f) => Some(*f),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        v.filter(|f| f.is_finite())
    }
}

/// Post record as supplied by the fetcher (Reddit listing field names).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    #[serde(default)]
    pub id: Option<Scalar>,
    #[serde(default)]
    pub title: Option<Scalar>,
    #[serde(default, alias = "body")]
    pub selftext: Option<Scalar>,
    #[serde(default)]
    pub score: Option<Scalar>,
    #[serde(default)]
    pub num_comments: Option<Scalar>,
    #[serde(default, alias = "created_utc")]
    pub created_at: Option<Scalar>,
    #[serde(default, alias = "source_group")]
    pub subreddit: Option<Scalar>,
    #[serde(default)]
    pub upvote_ratio: Option<Scalar>,
    /// Set when the record as a whole could not be decoded.
    #[serde(skip)]
    pub decode_error: Option<String>,
}

impl RawPost {
    /// Record with the identifying fields set; numeric fields still missing.
    pub fn new(id: &str, title: &str, subreddit: &str) -> Self {
        Self {
            id: Some(Scalar::Text(id.to_string())),
            title: Some(Scalar::Text(title.to_string())),
            subreddit: Some(Scalar::Text(subreddit.to_string())),
            ..Self::default()
        }
    }

    pub fn with_selftext(mut self, body: &str) -> Self {
        self.selftext = Some(Scalar::Text(body.to_string()));
        self
    }

    pub fn with_score(mut self, score: i64) -> Self {
        self.score = Some(Scalar::Int(score));
        self
    }

    pub fn with_comments(mut self, n: i64) -> Self {
        self.num_comments = Some(Scalar::Int(n));
        self
    }

    pub fn with_created_utc(mut self, epoch_secs: i64) -> Self {
        self.created_at = Some(Scalar::Int(epoch_secs));
        self
    }

    pub fn with_created_at(mut self, ts: &str) -> Self {
        self.created_at = Some(Scalar::Text(ts.to_string()));
        self
    }

    pub fn with_upvote_ratio(mut self, r: f64) -> Self {
        self.upvote_ratio = Some(Scalar::Float(r));
        self
    }

    /// Placeholder for a record serde rejected; validation reports it as malformed.
    pub fn undecodable(id: Option<Scalar>, reason: impl Into<String>) -> Self {
        Self {
            id,
            decode_error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Best-effort id for skip reports.
    pub fn id_hint(&self) -> Option<String> {
        match self.id.as_ref()? {
            Scalar::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Scalar::Int(v) => Some(v.to_string()),
            _ => None,
        }
    }

    /// Validate into a [`Post`]. `index` is the record's position in the batch.
    pub fn validate(&self, index: usize) -> Result<Post, ValidationError> {
        let missing = |field: &'static str| ValidationError::MissingField { index, field };
        let malformed = |field: &'static str, reason: String| ValidationError::Malformed {
            index,
            field,
            reason,
        };

        if let Some(reason) = &self.decode_error {
            return Err(malformed("record", reason.clone()));
        }

        let id = match self.id.as_ref().ok_or_else(|| missing("id"))? {
            Scalar::Text(s) if !s.trim().is_empty() => s.trim().to_string(),
            Scalar::Text(_) => return Err(malformed("id", "empty string".into())),
            Scalar::Int(v) => v.to_string(),
            other => return Err(malformed("id", format!("unexpected {}", other.kind()))),
        };

        let title = match self.title.as_ref().ok_or_else(|| missing("title"))? {
            Scalar::Text(s) => s.clone(),
            other => return Err(malformed("title", format!("unexpected {}", other.kind()))),
        };

        let body = match self.selftext.as_ref() {
            None => String::new(),
            Some(Scalar::Text(s)) => s.clone(),
            Some(other) => {
                tracing::debug!(index, kind = other.kind(), "ignoring non-string selftext");
                String::new()
            }
        };

        let source_group = match self.subreddit.as_ref().ok_or_else(|| missing("subreddit"))? {
            Scalar::Text(s) if !s.trim().is_empty() => s.trim().to_string(),
            Scalar::Text(_) => return Err(malformed("subreddit", "empty string".into())),
            other => return Err(malformed("subreddit", format!("unexpected {}", other.kind()))),
        };

        let score = self.score.as_ref().ok_or_else(|| missing("score"))?;
        let raw_score = score
            .as_i64()
            .ok_or_else(|| malformed("score", format!("not an integer ({})", score.kind())))?;

        let comments = self.num_comments.as_ref().ok_or_else(|| missing("num_comments"))?;
        let comment_count = match comments.as_i64() {
            Some(n) if n >= 0 => n as u64,
            Some(n) => return Err(malformed("num_comments", format!("negative count {n}"))),
            None => {
                return Err(malformed(
                    "num_comments",
                    format!("not an integer ({})", comments.kind()),
                ))
            }
        };

        let created = self.created_at.as_ref().ok_or_else(|| missing("created_at"))?;
        let created_at = parse_timestamp(created)
            .ok_or_else(|| malformed("created_at", format!("unparsable timestamp {created:?}")))?;

        let upvote_ratio = match self.upvote_ratio.as_ref() {
            None => None,
            Some(r) => match r.as_f64() {
                Some(v) if (0.0..=1.0).contains(&v) => Some(v),
                _ => {
                    tracing::debug!(index, value = ?r, "dropping out-of-range upvote_ratio");
                    None
                }
            },
        };

        Ok(Post {
            id,
            title,
            body,
            source_group,
            raw_score,
            comment_count,
            created_at,
            upvote_ratio,
        })
    }
}

/// Parse epoch seconds or an ISO-8601 / RFC 3339 string.
pub fn parse_timestamp(v: &Scalar) -> Option<DateTime<Utc>> {
    match v {
        Scalar::Int(secs) => DateTime::from_timestamp(*secs, 0),
        Scalar::Float(f) => from_epoch_f64(*f),
        Scalar::Text(s) => parse_timestamp_str(s),
        Scalar::Other(_) => None,
    }
}

pub fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(f) = s.parse::<f64>() {
        return from_epoch_f64(f);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn from_epoch_f64(f: f64) -> Option<DateTime<Utc>> {
    if !f.is_finite() {
        return None;
    }
    let millis = (f * 1000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Validated, immutable post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body: String,
    pub source_group: String,
    pub raw_score: i64,
    pub comment_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub upvote_ratio: Option<f64>,
}

/// Post annotated with its score and label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPost {
    #[serde(flatten)]
    pub post: Post,
    pub sentiment_score: f64,
    pub label: Label,
}

/// A record excluded from the batch by validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedPost {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub reason: String,
}

impl SkippedPost {
    pub fn new(raw: &RawPost, err: &ValidationError) -> Self {
        Self {
            index: err.index(),
            id: raw.id_hint(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn full() -> RawPost {
        RawPost::new("abc", "Great phone", "Android")
            .with_score(42)
            .with_comments(7)
            .with_created_utc(1_700_000_000)
    }

    #[test]
    fn validates_complete_record() {
        let p = full().validate(0).unwrap();
        assert_eq!(p.id, "abc");
        assert_eq!(p.body, "");
        assert_eq!(p.source_group, "Android");
        assert_eq!(p.raw_score, 42);
        assert_eq!(p.comment_count, 7);
        assert_eq!(p.created_at.timestamp(), 1_700_000_000);
        assert_eq!(p.upvote_ratio, None);
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let mut r = full();
        r.score = None;
        assert_eq!(
            r.validate(3),
            Err(ValidationError::MissingField {
                index: 3,
                field: "score"
            })
        );
        let mut r = full();
        r.subreddit = None;
        assert!(matches!(
            r.validate(0),
            Err(ValidationError::MissingField {
                field: "subreddit",
                ..
            })
        ));
    }

    #[test]
    fn malformed_fields_are_reported() {
        let r = full().with_comments(-1);
        assert!(matches!(
            r.validate(0),
            Err(ValidationError::Malformed {
                field: "num_comments",
                ..
            })
        ));
        let r = full().with_created_at("yesterday-ish");
        assert!(matches!(
            r.validate(0),
            Err(ValidationError::Malformed {
                field: "created_at",
                ..
            })
        ));
        let r = RawPost::new("  ", "t", "g")
            .with_score(1)
            .with_comments(0)
            .with_created_utc(0);
        assert!(matches!(
            r.validate(0),
            Err(ValidationError::Malformed { field: "id", .. })
        ));
    }

    #[test]
    fn out_of_range_float_score_is_rejected() {
        let mut r = full();
        r.score = Some(Scalar::Float(1e300));
        assert!(matches!(
            r.validate(0),
            Err(ValidationError::Malformed { field: "score", .. })
        ));
        r.score = Some(Scalar::Float(9_223_372_036_854_775_808.0));
        assert!(r.validate(0).is_err());
        r.score = Some(Scalar::Float(-1_000_000.0));
        assert_eq!(r.validate(0).unwrap().raw_score, -1_000_000);
    }

    #[test]
    fn undecodable_record_keeps_id_and_reason() {
        let r = RawPost::undecodable(Some(Scalar::Text("p9".into())), "duplicate field `created_at`");
        let err = r.validate(4).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::Malformed {
                index: 4,
                field: "record",
                ..
            }
        ));
        let skipped = SkippedPost::new(&r, &err);
        assert_eq!(skipped.id.as_deref(), Some("p9"));
        assert!(skipped.reason.contains("duplicate field"));
    }

    #[test]
    fn bad_upvote_ratio_is_dropped_not_fatal() {
        let p = full().with_upvote_ratio(1.7).validate(0).unwrap();
        assert_eq!(p.upvote_ratio, None);
        let p = full().with_upvote_ratio(0.93).validate(0).unwrap();
        assert_eq!(p.upvote_ratio, Some(0.93));
    }

    #[test]
    fn timestamps_in_every_accepted_shape() {
        let want = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        for v in [
            Scalar::Int(1_700_000_000),
            Scalar::Float(1_700_000_000.0),
            Scalar::Text("1700000000".into()),
            Scalar::Text("2023-11-14T22:13:20Z".into()),
            Scalar::Text("2023-11-14T23:13:20+01:00".into()),
            Scalar::Text("2023-11-14T22:13:20".into()),
            Scalar::Text("2023-11-14 22:13:20".into()),
        ] {
            assert_eq!(parse_timestamp(&v), Some(want), "{v:?}");
        }
        assert_eq!(parse_timestamp(&Scalar::Other(serde_json::json!(true))), None);
        assert_eq!(parse_timestamp(&Scalar::Float(f64::NAN)), None);
    }

    #[test]
    fn deserializes_reddit_listing_shape() {
        let v = serde_json::json!({
            "id": "t3_x",
            "title": "Title",
            "selftext": "body text",
            "score": 12.0,
            "num_comments": "4",
            "created_utc": 1700000000.5,
            "subreddit": "rust",
            "upvote_ratio": 0.8,
            "url": "https://reddit.com/r/rust/x"
        });
        let raw: RawPost = serde_json::from_value(v).unwrap();
        let p = raw.validate(0).unwrap();
        assert_eq!(p.raw_score, 12);
        assert_eq!(p.comment_count, 4);
        assert_eq!(p.body, "body text");
        assert_eq!(p.created_at.timestamp_millis(), 1_700_000_000_500);
    }

    #[test]
    fn scored_post_serializes_flat() {
        let sp = ScoredPost {
            post: full().validate(0).unwrap(),
            sentiment_score: 0.5,
            label: Label::Positive,
        };
        let v = serde_json::to_value(&sp).unwrap();
        let obj = v.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "body",
                "comment_count",
                "created_at",
                "id",
                "label",
                "raw_score",
                "sentiment_score",
                "source_group",
                "title",
                "upvote_ratio"
            ]
        );
        assert_eq!(obj["label"], "positive");
        assert_eq!(obj["sentiment_score"], 0.5);
    }
}
