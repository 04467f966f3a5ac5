//! Cold Start Handling
//!
//! Provides the category-diversified popularity list used whenever a
//! personalized path has no signal for a user. This is the terminal fallback:
//! it never fails and never delegates further.

use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::filters::CategoryFilter;
use crate::types::{Article, ScoredArticle};
use std::collections::HashMap;

/// Popularity fallback
///
/// Steps:
/// 1. Restrict the catalog to the active category filter
/// 2. Rank categories by article count (ties keep first appearance)
/// 3. Take up to `per_category` articles from each of the top categories, in
///    catalog order, until `k` is reached
#[derive(Debug, Clone)]
pub struct PopularityFallback {
    top_categories: usize,
    per_category: usize,
}

impl Default for PopularityFallback {
    fn default() -> Self {
        Self {
            top_categories: 5,
            per_category: 2,
        }
    }
}

impl PopularityFallback {
    pub fn new(top_categories: usize, per_category: usize) -> Self {
        Self {
            top_categories,
            per_category,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.popular_categories, config.per_category)
    }

    pub fn execute(&self, dataset: &Dataset, k: usize, filter: &CategoryFilter) -> Vec<ScoredArticle> {
        let catalog: Vec<&Article> = dataset
            .articles()
            .iter()
            .filter(|article| filter.matches(article))
            .collect();

        let mut popular = Vec::with_capacity(k.min(catalog.len()));
        for category in Self::top_categories(&catalog, self.top_categories) {
            let picks = catalog
                .iter()
                .filter(|article| article.category == category)
                .take(self.per_category);

            for article in picks {
                if popular.len() >= k {
                    return popular;
                }
                popular.push(ScoredArticle::new(article.id.clone(), 1.0));
            }
        }

        popular
    }

    /// Most frequent non-empty categories, stable on first appearance
    fn top_categories<'a>(catalog: &[&'a Article], limit: usize) -> Vec<&'a str> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for article in catalog.iter().filter(|a| !a.category.is_empty()) {
            let count = counts.entry(article.category.as_str()).or_insert_with(|| {
                order.push(article.category.as_str());
                0
            });
            *count += 1;
        }

        order.sort_by(|a, b| counts[b].cmp(&counts[a]));
        order.truncate(limit);
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, category: &str) -> Article {
        Article {
            id: id.to_string(),
            category: category.to_string(),
            subcategory: format!("{}_sub", category),
            title: format!("Title {}", id),
            abstract_text: String::new(),
            url: None,
            title_entities: None,
            abstract_entities: None,
        }
    }

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                article("N1", "news"),
                article("N2", "sports"),
                article("N3", "news"),
                article("N4", "sports"),
                article("N5", "news"),
                article("N6", "lifestyle"),
                article("N7", "sports"),
                article("N8", "finance"),
            ],
            vec![],
        )
    }

    fn ids(items: &[ScoredArticle]) -> Vec<&str> {
        items.iter().map(|s| s.article_id.as_str()).collect()
    }

    #[test]
    fn test_category_diversity() {
        let result = PopularityFallback::default().execute(&dataset(), 10, &CategoryFilter::none());
        // news (3) and sports (3) tie, news appears first
        assert_eq!(ids(&result), vec!["N1", "N3", "N2", "N4", "N6", "N8"]);
        assert!(result.iter().all(|s| s.score == 1.0));
    }

    #[test]
    fn test_never_exceeds_k() {
        let result = PopularityFallback::default().execute(&dataset(), 3, &CategoryFilter::none());
        assert_eq!(ids(&result), vec!["N1", "N3", "N2"]);

        let result = PopularityFallback::default().execute(&dataset(), 0, &CategoryFilter::none());
        assert!(result.is_empty());
    }

    #[test]
    fn test_top_category_limit() {
        let result = PopularityFallback::new(2, 1).execute(&dataset(), 10, &CategoryFilter::none());
        assert_eq!(ids(&result), vec!["N1", "N2"]);
    }

    #[test]
    fn test_filtered_catalog() {
        let filter = CategoryFilter::new(Some("sports"));
        let result = PopularityFallback::default().execute(&dataset(), 10, &filter);
        assert_eq!(ids(&result), vec!["N2", "N4"]);
    }

    #[test]
    fn test_deterministic() {
        let data = dataset();
        let fallback = PopularityFallback::default();
        assert_eq!(
            fallback.execute(&data, 5, &CategoryFilter::none()),
            fallback.execute(&data, 5, &CategoryFilter::none())
        );
    }

    #[test]
    fn test_empty_catalog() {
        let empty = Dataset::new(vec![], vec![]);
        assert!(PopularityFallback::default()
            .execute(&empty, 10, &CategoryFilter::none())
            .is_empty());
    }

    #[test]
    fn test_unbounded_k() {
        let empty = Dataset::new(vec![], vec![]);
        assert!(PopularityFallback::default()
            .execute(&empty, usize::MAX, &CategoryFilter::none())
            .is_empty());

        let result = PopularityFallback::default().execute(&dataset(), usize::MAX, &CategoryFilter::none());
        assert_eq!(ids(&result), vec!["N1", "N3", "N2", "N4", "N6", "N8"]);
    }

    #[test]
    fn test_uncategorized_articles_skipped() {
        let data = Dataset::new(
            vec![
                article("U1", ""),
                article("U2", ""),
                article("U3", ""),
                article("N1", "news"),
                article("N2", "sports"),
            ],
            vec![],
        );
        let result = PopularityFallback::new(2, 2).execute(&data, 10, &CategoryFilter::none());
        assert_eq!(ids(&result), vec!["N1", "N2"]);
    }
}
