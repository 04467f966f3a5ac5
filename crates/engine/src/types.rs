//! Core domain types shared by every recommendation path

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// News article from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub category: String,
    pub subcategory: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: Option<String>,
    pub title_entities: Option<String>,
    pub abstract_entities: Option<String>,
}

impl Article {
    /// Title and abstract joined with a single space
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.abstract_text)
    }
}

/// One impression log entry from the behaviors table
#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorRecord {
    pub impression_id: String,
    pub user_id: String,
    pub timestamp: Option<NaiveDateTime>,
    /// Previously clicked article ids, oldest first
    pub history: Vec<String>,
    /// (article id, clicked) pairs shown in this impression
    pub impressions: Vec<(String, u8)>,
}

impl BehaviorRecord {
    pub fn has_signal(&self) -> bool {
        !self.history.is_empty() || !self.impressions.is_empty()
    }
}

/// (user, article, rating) derived from behavior records
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionTriple {
    pub user_id: String,
    pub article_id: String,
    pub rating: f32,
}

/// Article id paired with the score its producing algorithm assigned
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredArticle {
    pub article_id: String,
    pub score: f32,
}

impl ScoredArticle {
    pub fn new(article_id: impl Into<String>, score: f32) -> Self {
        Self {
            article_id: article_id.into(),
            score,
        }
    }
}

/// Canonical recommendation record returned to every caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecItem {
    pub item_id: String,
    pub score: f64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Full article detail handed to document renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub item_id: String,
    pub title: String,
    pub category: String,
    pub subcategory: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
}

impl From<&Article> for ArticleDetail {
    fn from(article: &Article) -> Self {
        Self {
            item_id: article.id.clone(),
            title: article.title.clone(),
            category: article.category.clone(),
            subcategory: article.subcategory.clone(),
            abstract_text: article.abstract_text.clone(),
            url: article.url.clone().unwrap_or_default(),
        }
    }
}

/// Recommendation algorithm selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Collaborative,
    Content,
    #[default]
    Hybrid,
    Bert,
}

impl Algorithm {
    /// Parse a selector; anything unrecognised means hybrid
    pub fn parse(selector: &str) -> Self {
        match selector.trim().to_ascii_lowercase().as_str() {
            "collaborative" => Algorithm::Collaborative,
            "content" => Algorithm::Content,
            "bert" => Algorithm::Bert,
            _ => Algorithm::Hybrid,
        }
    }

    /// Reason prefix attached by the result formatter
    pub fn reason_prefix(&self) -> &'static str {
        match self {
            Algorithm::Collaborative => "Collaborative Filtering",
            Algorithm::Content => "Content-Based",
            Algorithm::Hybrid => "Hybrid Recommendation",
            Algorithm::Bert => "BERT4Rec",
        }
    }
}

/// Blend weights for the hybrid path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendWeights {
    pub collaborative: f32,
    pub content: f32,
}

impl BlendWeights {
    pub fn new(collaborative: f32, content: f32) -> Self {
        Self {
            collaborative,
            content,
        }
    }

    /// 0 = pure collaborative, 1 = pure content
    pub fn from_alpha(alpha: f32) -> Self {
        Self {
            collaborative: 1.0 - alpha,
            content: alpha,
        }
    }
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self::new(0.6, 0.4)
    }
}
