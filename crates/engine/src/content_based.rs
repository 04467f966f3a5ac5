//! Content-based filtering implementation
//!
//! Builds a TF-IDF vector for every article from its title and abstract,
//! sums the vectors of a user's clicked articles into a profile and ranks
//! the catalog by cosine similarity to that profile.

use crate::cold_start::PopularityFallback;
use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filters::CategoryFilter;
use crate::tfidf::{cosine_similarity, SparseVector, TfidfVectorizer};
use crate::types::ScoredArticle;
use tracing::debug;

/// Content-based recommendation engine
#[derive(Debug, Clone)]
pub struct ContentFilter {
    vocabulary_size: usize,
    fallback: PopularityFallback,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new(5000, PopularityFallback::default())
    }
}

impl ContentFilter {
    pub fn new(vocabulary_size: usize, fallback: PopularityFallback) -> Self {
        Self {
            vocabulary_size,
            fallback,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.vocabulary_size, PopularityFallback::from_config(config))
    }

    /// Vectorize the whole catalog, rows aligned with `dataset.articles()`
    pub fn article_vectors(&self, dataset: &Dataset) -> (TfidfVectorizer, Vec<SparseVector>) {
        let documents: Vec<String> = dataset.articles().iter().map(|a| a.text()).collect();
        let mut vectorizer = TfidfVectorizer::new(self.vocabulary_size);
        let rows = vectorizer.fit_transform(&documents);
        (vectorizer, rows)
    }

    /// Sum of the vectors of every clicked article found in the catalog
    pub fn user_profile(
        &self,
        dataset: &Dataset,
        user_id: &str,
        vectorizer: &TfidfVectorizer,
        rows: &[SparseVector],
    ) -> Vec<f32> {
        let mut profile = vec![0.0f32; vectorizer.vocabulary_len()];
        for article_id in dataset.user_history(user_id) {
            if let Some(idx) = dataset.article_position(article_id) {
                rows[idx].add_to(&mut profile);
            }
        }
        profile
    }

    /// Top-k articles by cosine similarity to the user profile
    pub fn recommend(
        &self,
        dataset: &Dataset,
        user_id: &str,
        k: usize,
        filter: &CategoryFilter,
    ) -> Result<Vec<ScoredArticle>> {
        if !dataset.has_interaction_signal(user_id) {
            debug!(user_id, "No interaction signal, using popularity fallback");
            return Ok(self.fallback.execute(dataset, k, filter));
        }

        let (vectorizer, rows) = self.article_vectors(dataset);
        let profile = self.user_profile(dataset, user_id, &vectorizer, &rows);

        if profile.iter().all(|&w| w == 0.0) {
            debug!(user_id, "Empty content profile, using popularity fallback");
            return Ok(self.fallback.execute(dataset, k, filter));
        }

        let articles = dataset.articles();
        let mut scored: Vec<(usize, f32)> = rows
            .iter()
            .enumerate()
            .filter(|(idx, _)| filter.matches(&articles[*idx]))
            .map(|(idx, row)| (idx, cosine_similarity(row, &profile)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(idx, similarity)| ScoredArticle::new(articles[idx].id.clone(), similarity))
            .collect())
    }
}
