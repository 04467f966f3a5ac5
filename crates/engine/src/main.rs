//! News Recommendation Service
//!
//! Default port: 8000

use actix_web::{middleware::Logger, web, App, HttpServer};
use newsrec_engine::{config::ServiceConfig, init_service, server};
use std::sync::Arc;
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration
    let config = Arc::new(ServiceConfig::load()?);
    let bind_addr = config.bind_address();

    info!("Starting news recommendation service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let service = init_service(&config);

    // Warm the dataset so the first request does not pay the load
    if let Err(e) = service.dataset().await {
        tracing::warn!("Dataset not available at startup: {}", e);
    }

    let app_state = web::Data::new(server::AppState {
        config: config.clone(),
        service,
    });

    info!("Listening on {}", bind_addr);

    let mut http = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(server::configure_routes)
            .wrap(server::cors(&app_state.config.cors))
            .wrap(Logger::default())
    });
    if let Some(workers) = config.server.workers {
        http = http.workers(workers);
    }

    http.bind(&bind_addr)?.run().await?;

    Ok(())
}
