//! Dataset loading and the shared news repository
//!
//! The news catalog and the behavior log are two independent TSV sources with
//! fixed column layouts. Article ids referenced by behaviors are not required
//! to exist in the catalog.

use crate::config::DatasetConfig;
use crate::error::{RecommendError, Result};
use crate::types::{Article, BehaviorRecord};
use chrono::NaiveDateTime;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const BEHAVIOR_TIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

/// In-memory news catalog and behavior log
#[derive(Debug, Default)]
pub struct Dataset {
    articles: Vec<Article>,
    article_index: HashMap<String, usize>,
    behaviors: Vec<BehaviorRecord>,
    /// user id -> indices into `behaviors`, in log order
    user_records: HashMap<String, Vec<usize>>,
}

impl Dataset {
    pub fn new(articles: Vec<Article>, behaviors: Vec<BehaviorRecord>) -> Self {
        // First occurrence wins when the catalog repeats an id
        let mut article_index = HashMap::with_capacity(articles.len());
        let mut unique = Vec::with_capacity(articles.len());
        for article in articles {
            if article_index.contains_key(&article.id) {
                continue;
            }
            article_index.insert(article.id.clone(), unique.len());
            unique.push(article);
        }
        let articles = unique;

        let mut user_records: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, record) in behaviors.iter().enumerate() {
            user_records
                .entry(record.user_id.clone())
                .or_default()
                .push(idx);
        }

        Self {
            articles,
            article_index,
            behaviors,
            user_records,
        }
    }

    /// Load both tables from TSV files
    pub fn load(config: &DatasetConfig) -> Result<Self> {
        let start = std::time::Instant::now();

        let articles = read_news(open(&config.news_path)?)
            .map_err(|e| load_error(&config.news_path, e))?;
        let behaviors = read_behaviors(open(&config.behaviors_path)?, config.max_behavior_rows)
            .map_err(|e| load_error(&config.behaviors_path, e))?;

        let dataset = Self::new(articles, behaviors);

        info!(
            articles = dataset.articles.len(),
            behaviors = dataset.behaviors.len(),
            users = dataset.user_records.len(),
            "Loaded news dataset in {}ms",
            start.elapsed().as_millis()
        );

        Ok(dataset)
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn behaviors(&self) -> &[BehaviorRecord] {
        &self.behaviors
    }

    pub fn article(&self, id: &str) -> Option<&Article> {
        self.article_index.get(id).map(|&idx| &self.articles[idx])
    }

    /// Catalog position of an article id
    pub fn article_position(&self, id: &str) -> Option<usize> {
        self.article_index.get(id).copied()
    }

    /// Behavior records belonging to one user, in log order
    pub fn user_behaviors<'a>(&'a self, user_id: &str) -> impl Iterator<Item = &'a BehaviorRecord> {
        self.user_records
            .get(user_id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.behaviors[idx])
    }

    /// Concatenated click history across all of a user's records
    pub fn user_history(&self, user_id: &str) -> Vec<&str> {
        self.user_behaviors(user_id)
            .flat_map(|record| record.history.iter().map(String::as_str))
            .collect()
    }

    /// Whether the user has any recoverable interaction signal.
    ///
    /// This is the single cold-start predicate consulted by every
    /// personalized path.
    pub fn has_interaction_signal(&self, user_id: &str) -> bool {
        self.user_behaviors(user_id).any(BehaviorRecord::has_signal)
    }

    /// First `limit` distinct users in log order
    pub fn users(&self, limit: usize) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.behaviors
            .iter()
            .filter(|record| seen.insert(record.user_id.as_str()))
            .take(limit)
            .map(|record| record.user_id.clone())
            .collect()
    }

    /// Sorted distinct non-empty categories
    pub fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .articles
            .iter()
            .filter(|a| !a.category.is_empty())
            .map(|a| a.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        categories
    }
}

/// Explicitly constructed owner of the process-wide dataset.
///
/// The tables are read once, on first use, behind a one-time initialization
/// lock; concurrent first callers block until the load completes. There is
/// no invalidation and no reload.
pub struct NewsRepository {
    config: DatasetConfig,
    dataset: OnceCell<Arc<Dataset>>,
}

impl NewsRepository {
    pub fn new(config: DatasetConfig) -> Self {
        Self {
            config,
            dataset: OnceCell::new(),
        }
    }

    /// Repository around an already materialized dataset
    pub fn from_dataset(dataset: Dataset) -> Self {
        Self {
            config: DatasetConfig::default(),
            dataset: OnceCell::with_value(Arc::new(dataset)),
        }
    }

    pub fn dataset(&self) -> Result<Arc<Dataset>> {
        self.dataset
            .get_or_try_init(|| Dataset::load(&self.config).map(Arc::new))
            .map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.dataset.get().is_some()
    }
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).map_err(|e| load_error(path, e))
}

fn load_error(path: &Path, err: impl std::fmt::Display) -> RecommendError {
    RecommendError::DatasetLoad {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

fn tsv_reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(source)
}

fn field(record: &csv::StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or("").trim().to_string()
}

fn optional_field(record: &csv::StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse the news catalog: NewsID, Category, SubCategory, Title, Abstract,
/// URL, TitleEntities, AbstractEntities
pub fn read_news<R: Read>(source: R) -> std::result::Result<Vec<Article>, csv::Error> {
    let mut articles = Vec::new();

    for row in tsv_reader(source).records() {
        let row = row?;
        let id = field(&row, 0);
        if id.is_empty() {
            continue;
        }

        articles.push(Article {
            id,
            category: field(&row, 1),
            subcategory: field(&row, 2),
            title: field(&row, 3),
            abstract_text: field(&row, 4),
            url: optional_field(&row, 5),
            title_entities: optional_field(&row, 6),
            abstract_entities: optional_field(&row, 7),
        });
    }

    Ok(articles)
}

/// Parse the behavior log: ImpressionID, UserID, Time, History, Impressions
pub fn read_behaviors<R: Read>(
    source: R,
    max_rows: Option<usize>,
) -> std::result::Result<Vec<BehaviorRecord>, csv::Error> {
    let mut behaviors = Vec::new();

    for row in tsv_reader(source)
        .records()
        .take(max_rows.unwrap_or(usize::MAX))
    {
        let row = row?;
        let user_id = field(&row, 1);
        if user_id.is_empty() {
            continue;
        }

        let time = field(&row, 2);
        let timestamp = NaiveDateTime::parse_from_str(&time, BEHAVIOR_TIME_FORMAT).ok();
        if timestamp.is_none() && !time.is_empty() {
            debug!(time = %time, "Unparseable behavior timestamp");
        }

        behaviors.push(BehaviorRecord {
            impression_id: field(&row, 0),
            user_id,
            timestamp,
            history: parse_history(row.get(3).unwrap_or("")),
            impressions: parse_impressions(row.get(4).unwrap_or("")),
        });
    }

    Ok(behaviors)
}

/// Whitespace-separated article ids
pub fn parse_history(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}

/// `N123-1 N456-0` tokens; malformed tokens are skipped
pub fn parse_impressions(raw: &str) -> Vec<(String, u8)> {
    raw.split_whitespace()
        .filter_map(|token| {
            let mut parts = token.split('-');
            let (id, label) = (parts.next()?, parts.next()?);
            if parts.next().is_some() || id.is_empty() {
                return None;
            }
            let label: u8 = label.parse().ok()?;
            Some((id.to_string(), label))
        })
        .collect()
}
