//! Hybrid Recommendation Engine
//!
//! Merges the collaborative and content-based rankings with a linear
//! rank-decay score so the two sources need not share a score scale.

use crate::cold_start::PopularityFallback;
use crate::collaborative::CollaborativeFilter;
use crate::config::EngineConfig;
use crate::content_based::ContentFilter;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filters::CategoryFilter;
use crate::types::{BlendWeights, ScoredArticle};
use std::collections::HashMap;
use tracing::debug;

/// Blend two ranked lists.
///
/// Each list contributes `weight * (len - pos) / len` per item; items in both
/// lists sum their contributions. Ties keep insertion order, collaborative
/// items first.
pub fn blend(
    collaborative: &[ScoredArticle],
    content: &[ScoredArticle],
    weights: BlendWeights,
    n: usize,
) -> Vec<ScoredArticle> {
    let mut combined: Vec<ScoredArticle> = Vec::with_capacity(collaborative.len() + content.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (list, weight) in [
        (collaborative, weights.collaborative),
        (content, weights.content),
    ] {
        let len = list.len() as f32;
        for (pos, item) in list.iter().enumerate() {
            let score = weight * (len - pos as f32) / len;
            match positions.get(&item.article_id) {
                Some(&idx) => combined[idx].score += score,
                None => {
                    positions.insert(item.article_id.clone(), combined.len());
                    combined.push(ScoredArticle::new(item.article_id.clone(), score));
                }
            }
        }
    }

    combined.sort_by(|a, b| b.score.total_cmp(&a.score));
    combined.truncate(n);
    combined
}

/// Hybrid blender over the collaborative and content filters
#[derive(Debug, Clone, Default)]
pub struct HybridBlender {
    collaborative: CollaborativeFilter,
    content: ContentFilter,
    fallback: PopularityFallback,
}

impl HybridBlender {
    pub fn new(
        collaborative: CollaborativeFilter,
        content: ContentFilter,
        fallback: PopularityFallback,
    ) -> Self {
        Self {
            collaborative,
            content,
            fallback,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            CollaborativeFilter::from_config(config),
            ContentFilter::from_config(config),
            PopularityFallback::from_config(config),
        )
    }

    /// Top-n blended articles; users without signal get the popularity list
    pub fn recommend(
        &self,
        dataset: &Dataset,
        user_id: &str,
        n: usize,
        weights: BlendWeights,
        filter: &CategoryFilter,
    ) -> Result<Vec<ScoredArticle>> {
        if !dataset.has_interaction_signal(user_id) {
            debug!(user_id, "No interaction signal, using popularity fallback");
            return Ok(self.fallback.execute(dataset, n, filter));
        }

        let pool = n.saturating_mul(2);
        let collaborative = self.collaborative.recommend(dataset, user_id, pool, filter)?;
        let content = self.content.recommend(dataset, user_id, pool, filter)?;

        debug!(
            user_id,
            collaborative = collaborative.len(),
            content = content.len(),
            "Blending candidate lists"
        );

        Ok(blend(&collaborative, &content, weights, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(ids: &[&str]) -> Vec<ScoredArticle> {
        ids.iter().map(|id| ScoredArticle::new(*id, 0.5)).collect()
    }

    fn ids(items: &[ScoredArticle]) -> Vec<&str> {
        items.iter().map(|s| s.article_id.as_str()).collect()
    }

    #[test]
    fn test_alpha_zero_keeps_collaborative_order() {
        let result = blend(
            &list(&["A", "B", "C"]),
            &list(&["C", "B", "A"]),
            BlendWeights::from_alpha(0.0),
            3,
        );
        assert_eq!(ids(&result), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_shared_item_sums_contributions() {
        let result = blend(
            &list(&["A", "B"]),
            &list(&["B", "C"]),
            BlendWeights::new(0.6, 0.4),
            3,
        );

        // A: 0.6 * 2/2, B: 0.6 * 1/2 + 0.4 * 2/2, C: 0.4 * 1/2
        let score = |id: &str| result.iter().find(|s| s.article_id == id).unwrap().score;
        assert!((score("A") - 0.6).abs() < 1e-6);
        assert!((score("B") - 0.7).abs() < 1e-6);
        assert!((score("C") - 0.2).abs() < 1e-6);
        assert_eq!(ids(&result), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_truncates_to_n() {
        let result = blend(
            &list(&["A", "B", "C"]),
            &list(&["D", "E"]),
            BlendWeights::default(),
            2,
        );
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_empty_lists() {
        assert!(blend(&[], &[], BlendWeights::default(), 5).is_empty());
        let result = blend(&list(&["A"]), &[], BlendWeights::default(), 5);
        assert_eq!(ids(&result), vec!["A"]);
    }

    #[test]
    fn test_cold_start_returns_popularity() {
        use crate::types::Article;

        let articles = (1..=4)
            .map(|i| Article {
                id: format!("N{}", i),
                category: if i % 2 == 0 { "news" } else { "sports" }.to_string(),
                subcategory: String::new(),
                title: format!("Story {}", i),
                abstract_text: String::new(),
                url: None,
                title_entities: None,
                abstract_entities: None,
            })
            .collect();
        let data = Dataset::new(articles, vec![]);

        let result = HybridBlender::default()
            .recommend(&data, "U9", 3, BlendWeights::default(), &CategoryFilter::none())
            .unwrap();
        let expected = PopularityFallback::default().execute(&data, 3, &CategoryFilter::none());
        assert_eq!(result, expected);
    }
}
