//! Collaborative Filtering
//!
//! Factorizes the user-article rating matrix derived from the behavior log and
//! ranks every article by the user's reconstructed score row. The matrix is
//! rebuilt from scratch on each call.

use crate::cold_start::PopularityFallback;
use crate::config::EngineConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filters::CategoryFilter;
use crate::interactions::extract_interactions;
use crate::matrix_factorization::{MatrixFactorization, SvdConfig};
use crate::types::ScoredArticle;
use tracing::debug;

/// Collaborative filtering engine
#[derive(Debug, Clone)]
pub struct CollaborativeFilter {
    svd_config: SvdConfig,
    fallback: PopularityFallback,
}

impl Default for CollaborativeFilter {
    fn default() -> Self {
        Self::new(SvdConfig::default(), PopularityFallback::default())
    }
}

impl CollaborativeFilter {
    pub fn new(svd_config: SvdConfig, fallback: PopularityFallback) -> Self {
        Self {
            svd_config,
            fallback,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            SvdConfig {
                max_latent_factors: config.max_latent_factors,
                oversamples: config.svd_oversamples,
                power_iterations: config.svd_power_iterations,
                seed: config.svd_seed,
            },
            PopularityFallback::from_config(config),
        )
    }

    /// Fit a factorization over the whole behavior log
    pub fn train(&self, dataset: &Dataset) -> Result<MatrixFactorization> {
        let interactions = extract_interactions(dataset.behaviors());

        let mut model = MatrixFactorization::new(self.svd_config.clone());
        let matrix = model.build_matrix(&interactions);
        model.fit(&matrix)?;

        Ok(model)
    }

    /// Top-k articles by reconstructed score.
    ///
    /// Users without interaction signal get the popularity fallback. Too few
    /// users or articles to factorize is reported as `DegenerateInput`.
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

        let model = self.train(dataset)?;
        let scores = model.score_user(user_id)?;

        // Stable sort keeps first-seen order among equal scores
        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let recommendations: Vec<ScoredArticle> = ranked
            .into_iter()
            .map(|idx| (model.item_ids[idx].as_str(), scores[idx]))
            .filter(|(id, _)| {
                // Behavior ids missing from the catalog are skipped
                dataset
                    .article(id)
                    .map_or(false, |article| filter.matches(article))
            })
            .take(k)
            .map(|(id, score)| ScoredArticle::new(id, score))
            .collect();

        debug!(
            user_id,
            items = model.item_ids.len(),
            returned = recommendations.len(),
            "Collaborative recommendations"
        );

        Ok(recommendations)
    }
}
