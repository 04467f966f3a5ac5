//! Recommendation service
//!
//! Async façade over the synchronous engine. Each call runs on the blocking
//! pool; data-driven failures are recovered with the trending list so callers
//! only ever see invalid-request and dataset-load errors.

use crate::cold_start::PopularityFallback;
use crate::collaborative::CollaborativeFilter;
use crate::config::{EngineConfig, SequenceConfig, ServiceConfig};
use crate::content_based::ContentFilter;
use crate::dataset::{Dataset, NewsRepository};
use crate::error::{RecommendError, Result};
use crate::export::{render_csv, resolve_details};
use crate::filters::CategoryFilter;
use crate::formatter::{format_recommendations, format_with_reason, raw_records, RawRecord};
use crate::inference::MaskedLanguageModel;
use crate::recommendation::HybridBlender;
use crate::search::{KeywordSearch, KEYWORD_REASON};
use crate::sequence::SequenceRecommender;
use crate::types::{Algorithm, ArticleDetail, BlendWeights, RecItem, ScoredArticle};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub const TRENDING_PREFIX: &str = "Trending";
const TRENDING_REASON: &str = "Popular across categories";

fn default_k() -> usize {
    10
}

fn default_algorithm() -> String {
    "hybrid".to_string()
}

/// Recommendation request
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendRequest {
    pub user_id: String,

    #[serde(default = "default_k")]
    pub k: usize,

    /// `collaborative`, `content`, `hybrid` or `bert`; anything else is hybrid
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    #[serde(default)]
    pub category: Option<String>,

    /// Hybrid blend: 0 = pure collaborative, 1 = pure content
    #[serde(default)]
    pub alpha: Option<f32>,
}

impl RecommendRequest {
    pub fn new(user_id: impl Into<String>, k: usize) -> Self {
        Self {
            user_id: user_id.into(),
            k,
            algorithm: default_algorithm(),
            category: None,
            alpha: None,
        }
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(RecommendError::InvalidRequest(
                "k must be at least 1".to_string(),
            ));
        }
        if let Some(alpha) = self.alpha {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(RecommendError::InvalidRequest(format!(
                    "alpha must be within [0, 1], got {}",
                    alpha
                )));
            }
        }
        Ok(())
    }
}

/// Engine façade shared by every request
#[derive(Clone)]
pub struct RecommendationService {
    repository: Arc<NewsRepository>,
    engine: EngineConfig,
    sequence_config: SequenceConfig,
    model: Option<Arc<dyn MaskedLanguageModel>>,
    collaborative: CollaborativeFilter,
    content: ContentFilter,
    hybrid: HybridBlender,
    fallback: PopularityFallback,
    sequence: SequenceRecommender,
}

impl RecommendationService {
    pub fn new(
        repository: Arc<NewsRepository>,
        config: &ServiceConfig,
        model: Option<Arc<dyn MaskedLanguageModel>>,
    ) -> Self {
        Self {
            repository,
            engine: config.engine.clone(),
            sequence_config: config.sequence.clone(),
            model,
            collaborative: CollaborativeFilter::from_config(&config.engine),
            content: ContentFilter::from_config(&config.engine),
            hybrid: HybridBlender::from_config(&config.engine),
            fallback: PopularityFallback::from_config(&config.engine),
            sequence: SequenceRecommender::new(config.sequence.clone()),
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Shared dataset, loading it on first use
    pub async fn dataset(&self) -> Result<Arc<Dataset>> {
        let repository = self.repository.clone();
        run_blocking(move || repository.dataset()).await
    }

    /// Personalized recommendations
    pub async fn recommend(&self, request: RecommendRequest) -> Result<Vec<RecItem>> {
        request.validate()?;
        let start = Instant::now();

        let algorithm = Algorithm::parse(&request.algorithm);
        let dataset = self.dataset().await?;
        let filter = CategoryFilter::new(request.category.as_deref());
        let weights = request.alpha.map(BlendWeights::from_alpha).unwrap_or_else(|| {
            BlendWeights::new(self.engine.cf_weight, self.engine.cb_weight)
        });

        let outcome = match algorithm {
            Algorithm::Bert => match self.run_sequence(&dataset, &request, &filter).await {
                Ok(items) => Ok((Algorithm::Bert, items)),
                Err(e) => {
                    warn!(user_id = %request.user_id, "Sequence path failed, using hybrid: {}", e);
                    self.run_path(Algorithm::Hybrid, &dataset, &request, weights, &filter)
                        .await
                        .map(|items| (Algorithm::Hybrid, items))
                }
            },
            path => self
                .run_path(path, &dataset, &request, weights, &filter)
                .await
                .map(|items| (path, items)),
        };

        let items = match outcome {
            Ok((path, scored)) => {
                format_recommendations(raw_records(&scored, &dataset), path.reason_prefix())
            }
            Err(e) if e.is_recoverable() => {
                warn!(
                    user_id = %request.user_id,
                    algorithm = ?algorithm,
                    "Recommendation failed, serving trending: {}",
                    e
                );
                let scored = self.fallback.execute(&dataset, request.k, &filter);
                self.format_trending(&scored, &dataset)
            }
            Err(e) => return Err(e),
        };

        info!(
            user_id = %request.user_id,
            algorithm = ?algorithm,
            filtered = filter.is_active(),
            returned = items.len(),
            "Served recommendations in {}ms",
            start.elapsed().as_millis()
        );

        Ok(items)
    }

    async fn run_path(
        &self,
        algorithm: Algorithm,
        dataset: &Arc<Dataset>,
        request: &RecommendRequest,
        weights: BlendWeights,
        filter: &CategoryFilter,
    ) -> Result<Vec<ScoredArticle>> {
        let dataset = dataset.clone();
        let user_id = request.user_id.clone();
        let k = request.k;
        let filter = filter.clone();
        let collaborative = self.collaborative.clone();
        let content = self.content.clone();
        let hybrid = self.hybrid.clone();

        run_blocking(move || match algorithm {
            Algorithm::Collaborative => collaborative.recommend(&dataset, &user_id, k, &filter),
            Algorithm::Content => content.recommend(&dataset, &user_id, k, &filter),
            Algorithm::Hybrid | Algorithm::Bert => {
                hybrid.recommend(&dataset, &user_id, k, weights, &filter)
            }
        })
        .await
    }

    /// Masked-LM path bounded by the configured timeout.
    ///
    /// A timed-out blocking task is detached, not cancelled, and keeps running
    /// until inference returns. Models must report themselves busy instead of
    /// queueing behind it so later calls fall back to the hybrid path.
    async fn run_sequence(
        &self,
        dataset: &Arc<Dataset>,
        request: &RecommendRequest,
        filter: &CategoryFilter,
    ) -> Result<Vec<ScoredArticle>> {
        let model = self.model.clone().ok_or_else(|| {
            RecommendError::SequenceModel("no masked language model loaded".to_string())
        })?;

        let dataset = dataset.clone();
        let user_id = request.user_id.clone();
        let k = request.k;
        let filter = filter.clone();
        let recommender = self.sequence.clone();

        let task = run_blocking(move || {
            let sequence = recommender.user_sequence(&dataset, &user_id);
            recommender.recommend(&*model, &dataset, &sequence, k, &filter)
        });

        match self.sequence_config.timeout() {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(|_| {
                RecommendError::SequenceModel(format!(
                    "inference exceeded {}ms budget",
                    limit.as_millis()
                ))
            })?,
            None => task.await,
        }
    }

    fn format_trending(&self, scored: &[ScoredArticle], dataset: &Dataset) -> Vec<RecItem> {
        let mut records = raw_records(scored, dataset);
        for record in &mut records {
            record.reason = Some(TRENDING_REASON.to_string());
        }
        format_recommendations(records, TRENDING_PREFIX)
    }

    /// Popularity list, unfiltered
    pub async fn trending(&self, k: usize) -> Result<Vec<RecItem>> {
        if k == 0 {
            return Err(RecommendError::InvalidRequest(
                "k must be at least 1".to_string(),
            ));
        }
        let dataset = self.dataset().await?;
        let scored = self.fallback.execute(&dataset, k, &CategoryFilter::none());
        Ok(self.format_trending(&scored, &dataset))
    }

    /// Keyword search over title and abstract
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        category: Option<&str>,
    ) -> Result<Vec<RecItem>> {
        if k == 0 {
            return Err(RecommendError::InvalidRequest(
                "k must be at least 1".to_string(),
            ));
        }
        let dataset = self.dataset().await?;
        let query = query.to_string();
        let filter = CategoryFilter::new(category);

        let search_dataset = dataset.clone();
        let scored =
            run_blocking(move || KeywordSearch::execute(&search_dataset, &query, k, &filter))
                .await?;

        Ok(format_with_reason(raw_records(&scored, &dataset), KEYWORD_REASON))
    }

    /// Article detail for a document renderer
    pub async fn export_details(&self, records: &[RawRecord]) -> Result<Vec<ArticleDetail>> {
        let dataset = self.dataset().await?;
        Ok(resolve_details(&dataset, records))
    }

    /// Article detail rendered as CSV
    pub async fn export_csv(&self, records: &[RawRecord]) -> Result<Vec<u8>> {
        let details = self.export_details(records).await?;
        render_csv(&details)
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        Ok(self.dataset().await?.categories())
    }

    pub async fn users(&self, limit: usize) -> Result<Vec<String>> {
        Ok(self.dataset().await?.users(limit))
    }

    pub async fn article(&self, id: &str) -> Result<Option<ArticleDetail>> {
        Ok(self.dataset().await?.article(id).map(ArticleDetail::from))
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| RecommendError::Internal(format!("Blocking task failed: {}", e)))?
}
