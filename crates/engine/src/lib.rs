//! News Recommendation Engine
//!
//! Personalized news recommendations over a news catalog and an impression
//! log: SVD collaborative filtering, TF-IDF content filtering, a rank-decay
//! hybrid blend, a masked-language-model sequence path and a
//! category-diversified popularity fallback, served over HTTP.

pub mod cold_start;
pub mod collaborative;
pub mod config;
pub mod content_based;
pub mod dataset;
pub mod error;
pub mod export;
pub mod filters;
pub mod formatter;
pub mod inference;
pub mod interactions;
pub mod matrix_factorization;
pub mod recommendation;
pub mod search;
pub mod sequence;
pub mod server;
pub mod service;
pub mod tfidf;
pub mod types;

// Re-export key types
pub use cold_start::PopularityFallback;
pub use collaborative::CollaborativeFilter;
pub use config::ServiceConfig;
pub use content_based::ContentFilter;
pub use dataset::{Dataset, NewsRepository};
pub use error::{RecommendError, Result};
pub use filters::CategoryFilter;
pub use formatter::{format_recommendations, RawRecord};
pub use inference::{MaskedLanguageModel, WordPieceVocab};
pub use interactions::extract_interactions;
pub use matrix_factorization::{MatrixFactorization, SvdConfig};
pub use recommendation::{blend, HybridBlender};
pub use search::KeywordSearch;
pub use sequence::SequenceRecommender;
pub use service::{RecommendRequest, RecommendationService};
pub use types::*;

use std::sync::Arc;

/// Build the service from configuration.
///
/// The dataset is loaded lazily on first use; the masked LM, when
/// configured, is loaded here.
pub fn init_service(config: &ServiceConfig) -> Arc<RecommendationService> {
    let repository = Arc::new(NewsRepository::new(config.dataset.clone()));
    let model = inference::load_model(&config.sequence);
    Arc::new(RecommendationService::new(repository, config, model))
}

#[cfg(test)]
mod tests;
