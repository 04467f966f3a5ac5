//! Keyword search over the catalog
//!
//! Case-insensitive substring match of the whole query: a title match is worth
//! 2 points and an abstract match 1 point, summed.

use crate::dataset::Dataset;
use crate::error::{RecommendError, Result};
use crate::filters::CategoryFilter;
use crate::types::ScoredArticle;

const TITLE_WEIGHT: f32 = 2.0;
const ABSTRACT_WEIGHT: f32 = 1.0;

pub const KEYWORD_REASON: &str = "Keyword match";

/// Keyword search
pub struct KeywordSearch;

impl KeywordSearch {
    /// Top-k matches, score descending, catalog order among ties
    pub fn execute(
        dataset: &Dataset,
        query: &str,
        k: usize,
        filter: &CategoryFilter,
    ) -> Result<Vec<ScoredArticle>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(RecommendError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }

        let mut matches: Vec<ScoredArticle> = dataset
            .articles()
            .iter()
            .filter(|article| filter.matches(article))
            .filter_map(|article| {
                let score = Self::score(&needle, &article.title, &article.abstract_text);
                (score > 0.0).then(|| ScoredArticle::new(article.id.clone(), score))
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(k);

        tracing::debug!(query = %needle, matches = matches.len(), "Keyword search");

        Ok(matches)
    }

    /// `needle` must already be lowercased
    pub fn score(needle: &str, title: &str, abstract_text: &str) -> f32 {
        let mut score = 0.0;
        if title.to_lowercase().contains(needle) {
            score += TITLE_WEIGHT;
        }
        if abstract_text.to_lowercase().contains(needle) {
            score += ABSTRACT_WEIGHT;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Article;

    fn article(id: &str, category: &str, title: &str, abstract_text: &str) -> Article {
        Article {
            id: id.to_string(),
            category: category.to_string(),
            subcategory: String::new(),
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            url: None,
            title_entities: None,
            abstract_entities: None,
        }
    }

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                article("N1", "news", "Climate summit opens", "Leaders gather."),
                article("N2", "news", "Markets today", "Climate risks weigh on stocks."),
                article("N3", "weather", "CLIMATE report", "New climate data released."),
                article("N4", "sports", "Cup final", "A tense match."),
            ],
            vec![],
        )
    }

    #[test]
    fn test_scoring() {
        let result = KeywordSearch::execute(&dataset(), "Climate", 10, &CategoryFilter::none()).unwrap();
        let scores: Vec<(&str, f32)> = result
            .iter()
            .map(|s| (s.article_id.as_str(), s.score))
            .collect();
        assert_eq!(scores, vec![("N3", 3.0), ("N1", 2.0), ("N2", 1.0)]);
    }

    #[test]
    fn test_category_and_k() {
        let filter = CategoryFilter::new(Some("news"));
        let result = KeywordSearch::execute(&dataset(), "climate", 1, &filter).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].article_id, "N1");
    }

    #[test]
    fn test_blank_query_rejected() {
        let result = KeywordSearch::execute(&dataset(), "   ", 10, &CategoryFilter::none());
        assert!(matches!(result, Err(RecommendError::InvalidRequest(_))));
    }

    #[test]
    fn test_no_matches() {
        let result = KeywordSearch::execute(&dataset(), "volcano", 10, &CategoryFilter::none()).unwrap();
        assert!(result.is_empty());
    }
}
