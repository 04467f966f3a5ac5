pub mod handlers;

use actix_cors::Cors;
use actix_web::web;
use std::sync::Arc;

use crate::config::{CorsConfig, ServiceConfig};
use crate::service::RecommendationService;

/// Application state shared across all handlers
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub service: Arc<RecommendationService>,
}

/// Configure application routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/trending", web::get().to(handlers::trending))
        .route("/recommend", web::post().to(handlers::recommend))
        .route("/search", web::post().to(handlers::search))
        .route("/categories", web::get().to(handlers::categories))
        .route("/users", web::get().to(handlers::users))
        .route("/articles/{id}", web::get().to(handlers::article))
        .service(
            web::scope("/export")
                .route("/details", web::post().to(handlers::export_details))
                .route("/csv", web::post().to(handlers::export_csv)),
        );
}

/// CORS policy; an empty origin list allows any origin
pub fn cors(config: &CorsConfig) -> Cors {
    let cors = if config.allowed_origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        config
            .allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .supports_credentials()
    };

    cors.allow_any_method().allow_any_header().max_age(3600)
}
