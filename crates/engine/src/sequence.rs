//! Sequence-model recommendations
//!
//! Predicts likely next topics from a user's recent titles with a masked
//! language model and maps the predicted tokens back to articles by title
//! keyword match. Cold-start users go straight to a fixed set of quality
//! keywords.

use crate::config::SequenceConfig;
use crate::dataset::Dataset;
use crate::error::{RecommendError, Result};
use crate::filters::CategoryFilter;
use crate::inference::MaskedLanguageModel;
use crate::types::ScoredArticle;
use std::collections::HashSet;
use tracing::debug;

/// Diversity keywords used to pad short lists and serve cold-start users
pub const QUALITY_KEYWORDS: [&str; 8] = [
    "health",
    "technology",
    "science",
    "business",
    "sports",
    "politics",
    "entertainment",
    "education",
];

const KEYWORD_SCORE: f32 = 0.85;
const QUALITY_SCORE: f32 = 0.75;
const MATCHES_PER_KEYWORD: usize = 3;
const MATCHES_PER_QUALITY_KEYWORD: usize = 2;

/// Model input for one user, populated from the dataset by the caller
#[derive(Debug, Clone, Default)]
pub struct UserSequence {
    /// Most recent clicked titles, oldest first
    pub titles: Vec<String>,
    /// Every clicked article id
    pub read_ids: HashSet<String>,
}

/// Masked-LM sequence recommender
#[derive(Debug, Clone)]
pub struct SequenceRecommender {
    config: SequenceConfig,
}

impl Default for SequenceRecommender {
    fn default() -> Self {
        Self::new(SequenceConfig::default())
    }
}

impl SequenceRecommender {
    pub fn new(config: SequenceConfig) -> Self {
        Self { config }
    }

    /// Last `history_window` catalog titles from the user's click history
    pub fn user_sequence(&self, dataset: &Dataset, user_id: &str) -> UserSequence {
        if !dataset.has_interaction_signal(user_id) {
            return UserSequence::default();
        }

        let history = dataset.user_history(user_id);
        let titles: Vec<String> = history
            .iter()
            .filter_map(|id| dataset.article(id))
            .map(|article| article.title.clone())
            .collect();
        let skip = titles.len().saturating_sub(self.config.history_window);

        UserSequence {
            titles: titles.into_iter().skip(skip).collect(),
            read_ids: history.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn recommend(
        &self,
        model: &dyn MaskedLanguageModel,
        dataset: &Dataset,
        sequence: &UserSequence,
        k: usize,
        filter: &CategoryFilter,
    ) -> Result<Vec<ScoredArticle>> {
        let mut picked = Picked::new(k, &sequence.read_ids);

        if sequence.titles.is_empty() {
            debug!("No title history, using quality keywords");
            self.pad_with_quality(dataset, filter, &mut picked);
            return Ok(picked.items);
        }

        let keyword_budget = k.saturating_mul(2);
        let predicted = model
            .predict_tokens(&sequence.titles, keyword_budget.saturating_mul(3))
            .map_err(|e| RecommendError::SequenceModel(format!("{:#}", e)))?;
        let keywords = keywords_from_tokens(&predicted, keyword_budget);

        debug!(keywords = ?keywords, "Masked LM keywords");

        let mut matched = Vec::new();
        for keyword in keywords.iter().take(self.config.keyword_limit) {
            matched.extend(self.find_by_keyword(dataset, keyword, MATCHES_PER_KEYWORD, filter));
            if matched.len() >= k {
                break;
            }
        }

        for id in matched {
            picked.push(id, KEYWORD_SCORE);
        }
        self.pad_with_quality(dataset, filter, &mut picked);

        Ok(picked.items)
    }

    fn pad_with_quality(&self, dataset: &Dataset, filter: &CategoryFilter, picked: &mut Picked) {
        for keyword in QUALITY_KEYWORDS {
            if picked.is_full() {
                return;
            }
            for id in self.find_by_keyword(dataset, keyword, MATCHES_PER_QUALITY_KEYWORD, filter) {
                picked.push(id, QUALITY_SCORE);
            }
        }
    }

    /// First `limit` titles in the scanned catalog prefix containing `keyword`
    fn find_by_keyword(
        &self,
        dataset: &Dataset,
        keyword: &str,
        limit: usize,
        filter: &CategoryFilter,
    ) -> Vec<String> {
        let needle = keyword.to_lowercase();
        dataset
            .articles()
            .iter()
            .take(self.config.catalog_scan_limit)
            .filter(|article| filter.matches(article))
            .filter(|article| article.title.to_lowercase().contains(&needle))
            .take(limit)
            .map(|article| article.id.clone())
            .collect()
    }
}

/// Drop special tokens, sub-word fragments and tokens of two characters or fewer
pub fn keywords_from_tokens(tokens: &[String], limit: usize) -> Vec<String> {
    tokens
        .iter()
        .filter(|token| !token.starts_with('[') && !token.starts_with('#'))
        .filter(|token| token.chars().count() > 2)
        .take(limit)
        .cloned()
        .collect()
}

/// Deduplicated result list that skips already-read articles
struct Picked<'a> {
    k: usize,
    read: &'a HashSet<String>,
    seen: HashSet<String>,
    items: Vec<ScoredArticle>,
}

impl<'a> Picked<'a> {
    fn new(k: usize, read: &'a HashSet<String>) -> Self {
        Self {
            k,
            read,
            seen: HashSet::new(),
            items: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.k
    }

    fn push(&mut self, id: String, score: f32) {
        if self.is_full() || self.read.contains(&id) || !self.seen.insert(id.clone()) {
            return;
        }
        self.items.push(ScoredArticle::new(id, score));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Article, BehaviorRecord};

    struct FixedModel(Vec<&'static str>);

    impl MaskedLanguageModel for FixedModel {
        fn predict_tokens(&self, _titles: &[String], top_n: usize) -> anyhow::Result<Vec<String>> {
            Ok(self.0.iter().take(top_n).map(|s| s.to_string()).collect())
        }
    }

    struct FailingModel;

    impl MaskedLanguageModel for FailingModel {
        fn predict_tokens(&self, _titles: &[String], _top_n: usize) -> anyhow::Result<Vec<String>> {
            Err(anyhow::anyhow!("session unavailable"))
        }
    }

    fn article(id: &str, category: &str, title: &str) -> Article {
        Article {
            id: id.to_string(),
            category: category.to_string(),
            subcategory: String::new(),
            title: title.to_string(),
            abstract_text: String::new(),
            url: None,
            title_entities: None,
            abstract_entities: None,
        }
    }

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                article("N1", "weather", "Storm batters coast"),
                article("N2", "weather", "Storm season outlook"),
                article("N3", "health", "New health guidance for winter"),
                article("N4", "tech", "Technology stocks climb"),
                article("N5", "weather", "Another storm on the way"),
                article("N6", "sports", "Sports roundup"),
            ],
            vec![BehaviorRecord {
                impression_id: "1".to_string(),
                user_id: "U1".to_string(),
                timestamp: None,
                history: vec!["N1".to_string()],
                impressions: vec![],
            }],
        )
    }

    fn ids(items: &[ScoredArticle]) -> Vec<&str> {
        items.iter().map(|s| s.article_id.as_str()).collect()
    }

    #[test]
    fn test_keywords_from_tokens() {
        let tokens: Vec<String> = ["[SEP]", "##ing", "the", "of", "storm", "rain"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(keywords_from_tokens(&tokens, 10), vec!["the", "storm", "rain"]);
        assert_eq!(keywords_from_tokens(&tokens, 1), vec!["the"]);
    }

    #[test]
    fn test_user_sequence() {
        let data = dataset();
        let recommender = SequenceRecommender::default();

        let sequence = recommender.user_sequence(&data, "U1");
        assert_eq!(sequence.titles, vec!["Storm batters coast"]);
        assert!(sequence.read_ids.contains("N1"));

        assert!(recommender.user_sequence(&data, "U404").titles.is_empty());
    }

    #[test]
    fn test_keyword_matches_exclude_history() {
        let data = dataset();
        let recommender = SequenceRecommender::default();
        let sequence = recommender.user_sequence(&data, "U1");

        let result = recommender
            .recommend(&FixedModel(vec!["[CLS]", "storm"]), &data, &sequence, 3, &CategoryFilter::none())
            .unwrap();

        assert_eq!(ids(&result), vec!["N2", "N5", "N3"]);
        assert_eq!(result[0].score, KEYWORD_SCORE);
        assert_eq!(result[2].score, QUALITY_SCORE);
    }

    #[test]
    fn test_cold_start_uses_quality_keywords() {
        let data = dataset();
        let recommender = SequenceRecommender::default();
        let sequence = recommender.user_sequence(&data, "U404");

        let result = recommender
            .recommend(&FailingModel, &data, &sequence, 5, &CategoryFilter::none())
            .unwrap();

        assert_eq!(ids(&result), vec!["N3", "N4", "N6"]);
        assert!(result.iter().all(|s| s.score == QUALITY_SCORE));
    }

    #[test]
    fn test_model_failure_is_reported() {
        let data = dataset();
        let recommender = SequenceRecommender::default();
        let sequence = recommender.user_sequence(&data, "U1");

        let result = recommender.recommend(&FailingModel, &data, &sequence, 3, &CategoryFilter::none());
        assert!(matches!(result, Err(RecommendError::SequenceModel(_))));
    }

    #[test]
    fn test_unbounded_k() {
        let data = dataset();
        let recommender = SequenceRecommender::default();
        let sequence = recommender.user_sequence(&data, "U1");

        let result = recommender
            .recommend(&FixedModel(vec!["storm"]), &data, &sequence, usize::MAX, &CategoryFilter::none())
            .unwrap();
        let found = ids(&result);
        assert_eq!(&found[..2], &["N2", "N5"]);
        assert!(!found.contains(&"N1"));
        let unique: HashSet<&str> = found.iter().copied().collect();
        assert_eq!(unique.len(), found.len());

        let cold = recommender.user_sequence(&data, "U404");
        let result = recommender
            .recommend(&FailingModel, &data, &cold, usize::MAX, &CategoryFilter::none())
            .unwrap();
        assert_eq!(ids(&result), vec!["N3", "N4", "N6"]);
    }

    #[test]
    fn test_catalog_scan_limit() {
        let data = dataset();
        let recommender = SequenceRecommender::new(SequenceConfig {
            catalog_scan_limit: 2,
            ..SequenceConfig::default()
        });
        let sequence = recommender.user_sequence(&data, "U1");

        let result = recommender
            .recommend(&FixedModel(vec!["storm"]), &data, &sequence, 5, &CategoryFilter::none())
            .unwrap();
        assert_eq!(ids(&result), vec!["N2"]);
    }
}
