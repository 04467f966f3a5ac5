//! Result formatting
//!
//! Every recommendation path passes through here before reaching a caller.
//! Raw records may name their fields differently depending on their origin
//! (`NewsID`/`Title`/`Similarity` or `item_id`/`title`/`score`); they are
//! normalized into `RecItem`.

use crate::dataset::Dataset;
use crate::types::{RecItem, ScoredArticle};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;

const DEFAULT_REASON: &str = "Based on your preferences";

/// Loosely-shaped recommendation record
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecord {
    #[serde(default, alias = "NewsID", alias = "news_id", alias = "id")]
    pub item_id: Option<String>,

    #[serde(default, alias = "Title")]
    pub title: Option<String>,

    #[serde(
        default,
        alias = "Similarity",
        alias = "similarity",
        deserialize_with = "lenient_score"
    )]
    pub score: Option<f64>,

    #[serde(default, alias = "Reason")]
    pub reason: Option<String>,
}

impl RawRecord {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.into()),
            ..Self::default()
        }
    }

    /// Raw record for a scored article with its catalog title
    pub fn from_scored(scored: &ScoredArticle, dataset: &Dataset) -> Self {
        Self {
            item_id: Some(scored.article_id.clone()),
            title: dataset.article(&scored.article_id).map(|a| a.title.clone()),
            score: Some(f64::from(scored.score)),
            reason: None,
        }
    }
}

/// Numbers and numeric strings become scores; anything else is absent
fn lenient_score<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Normalize raw records into `RecItem`s.
///
/// Records without an identifier are dropped and duplicate identifiers keep
/// their first occurrence. Missing scores default to 1.0 and missing titles
/// become `Article <id>`. The reason is `"<prefix>: <reason>"`.
pub fn format_recommendations(records: Vec<RawRecord>, prefix: &str) -> Vec<RecItem> {
    normalize(records, |reason| {
        format!("{}: {}", prefix, reason.unwrap_or(DEFAULT_REASON))
    })
}

/// Normalize raw records with one fixed reason
pub fn format_with_reason(records: Vec<RawRecord>, reason: &str) -> Vec<RecItem> {
    normalize(records, |_| reason.to_string())
}

fn normalize(
    records: Vec<RawRecord>,
    render_reason: impl Fn(Option<&str>) -> String,
) -> Vec<RecItem> {
    let mut seen = HashSet::new();

    records
        .into_iter()
        .filter_map(|record| {
            let item_id = record.item_id.filter(|id| !id.trim().is_empty())?;
            if !seen.insert(item_id.clone()) {
                return None;
            }

            let title = record
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("Article {}", item_id));
            let reason = render_reason(record.reason.as_deref().filter(|r| !r.trim().is_empty()));

            Some(RecItem {
                item_id,
                score: record.score.filter(|s| s.is_finite()).unwrap_or(1.0),
                title: Some(title),
                reason: Some(reason),
            })
        })
        .collect()
}

/// Raw records for a scored list, with catalog titles
pub fn raw_records(scored: &[ScoredArticle], dataset: &Dataset) -> Vec<RawRecord> {
    scored
        .iter()
        .map(|s| RawRecord::from_scored(s, dataset))
        .collect()
}
