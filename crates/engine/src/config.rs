//! Service configuration
//!
//! Loaded from an optional `config/newsrec` file overlaid by `NEWSREC_*`
//! environment variables (nested keys separated by `__`, e.g.
//! `NEWSREC_SERVER__PORT=9000`).

use crate::error::{RecommendError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Newsrec service configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// CORS configuration
    pub cors: CorsConfig,

    /// Dataset source configuration
    pub dataset: DatasetConfig,

    /// Recommendation engine tuning
    pub engine: EngineConfig,

    /// Masked-LM sequence recommender configuration
    pub sequence: SequenceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host
    pub host: String,

    /// Server port (default: 8000)
    pub port: u16,

    /// Worker threads
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; empty allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:5174".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "http://127.0.0.1:5174".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// News catalog TSV
    pub news_path: PathBuf,

    /// Behavior log TSV
    pub behaviors_path: PathBuf,

    /// Maximum behavior rows to read (None = all)
    pub max_behavior_rows: Option<usize>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            news_path: PathBuf::from("MINDsmall_train/news.tsv"),
            behaviors_path: PathBuf::from("MINDsmall_train/behaviors.tsv"),
            max_behavior_rows: Some(5000),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on the SVD rank (default: 100)
    pub max_latent_factors: usize,

    /// TF-IDF vocabulary cap (default: 5000)
    pub vocabulary_size: usize,

    /// Extra random projections used by the randomized SVD
    pub svd_oversamples: usize,

    /// Power iterations used by the randomized SVD
    pub svd_power_iterations: usize,

    /// Seed for the SVD random projection
    pub svd_seed: u64,

    /// Default hybrid collaborative weight
    pub cf_weight: f32,

    /// Default hybrid content weight
    pub cb_weight: f32,

    /// Categories used by the popularity fallback
    pub popular_categories: usize,

    /// Articles taken per popular category
    pub per_category: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_latent_factors: 100,
            vocabulary_size: 5000,
            svd_oversamples: 10,
            svd_power_iterations: 5,
            svd_seed: 42,
            cf_weight: 0.6,
            cb_weight: 0.4,
            popular_categories: 5,
            per_category: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// ONNX masked language model
    pub model_path: Option<PathBuf>,

    /// WordPiece vocabulary matching the model
    pub vocab_path: Option<PathBuf>,

    /// Encoder input length
    pub max_sequence_length: usize,

    /// Most recent titles fed to the model
    pub history_window: usize,

    /// Predicted keywords used for article lookup
    pub keyword_limit: usize,

    /// Catalog prefix searched for keyword matches
    pub catalog_scan_limit: usize,

    /// Inference timeout in milliseconds (None = unbounded)
    pub timeout_ms: Option<u64>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            vocab_path: None,
            max_sequence_length: 64,
            history_window: 10,
            keyword_limit: 5,
            catalog_scan_limit: 1000,
            timeout_ms: Some(3000),
        }
    }
}

impl SequenceConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl ServiceConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/newsrec").required(false))
            .add_source(
                config::Environment::with_prefix("NEWSREC")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }

        for (key, weight) in [
            ("engine.cf_weight", self.engine.cf_weight),
            ("engine.cb_weight", self.engine.cb_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(&format!(
                    "{} must be a non-negative number, got {}",
                    key, weight
                )));
            }
        }

        if self.engine.vocabulary_size == 0 {
            return Err(invalid("engine.vocabulary_size must be greater than 0"));
        }

        if self.engine.max_latent_factors == 0 {
            return Err(invalid("engine.max_latent_factors must be greater than 0"));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn invalid(message: &str) -> RecommendError {
    RecommendError::InvalidRequest(format!("configuration: {}", message))
}
