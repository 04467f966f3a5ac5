use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use crate::error::RecommendError;
use crate::export::CSV_FILE_NAME;
use crate::formatter::RawRecord;
use crate::service::RecommendRequest;
use crate::types::{ArticleDetail, RecItem};

type HandlerResult = Result<HttpResponse, RecommendError>;

/// Query parameters for the trending endpoint
#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    #[serde(default = "default_trending_k")]
    pub k: usize,
}

fn default_trending_k() -> usize {
    20
}

/// Query parameters for the user list endpoint
#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    #[serde(default = "default_user_limit")]
    pub limit: usize,
}

fn default_user_limit() -> usize {
    100
}

/// Keyword search body
#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub q: String,

    #[serde(default = "default_trending_k")]
    pub k: usize,

    #[serde(default)]
    pub category: Option<String>,
}

/// Export body: RecItem-like records
#[derive(Debug, Deserialize)]
pub struct ExportBody {
    #[serde(default)]
    pub articles: Vec<RawRecord>,

    #[serde(default = "default_export_user")]
    pub user_id: String,
}

fn default_export_user() -> String {
    "guest".to_string()
}

#[derive(Debug, Serialize)]
pub struct ItemsResponse {
    pub items: Vec<RecItem>,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub user_id: String,
    pub items: Vec<RecItem>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub user_id: String,
    pub articles: Vec<ArticleDetail>,
}

/// GET /health
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "model_loaded": state.service.has_model(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /trending?k=20
pub async fn trending(
    state: web::Data<AppState>,
    params: web::Query<TrendingQuery>,
) -> HandlerResult {
    let items = state.service.trending(params.k).await?;
    Ok(HttpResponse::Ok().json(ItemsResponse { items }))
}

/// POST /recommend
pub async fn recommend(
    state: web::Data<AppState>,
    body: web::Json<RecommendRequest>,
) -> HandlerResult {
    let request = body.into_inner();
    let user_id = request.user_id.clone();

    info!(
        user_id = %user_id,
        algorithm = %request.algorithm,
        k = request.k,
        "Recommendation request"
    );

    let items = state.service.recommend(request).await?;
    Ok(HttpResponse::Ok().json(RecommendResponse { user_id, items }))
}

/// POST /search
pub async fn search(state: web::Data<AppState>, body: web::Json<SearchBody>) -> HandlerResult {
    let items = state
        .service
        .search(&body.q, body.k, body.category.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(ItemsResponse { items }))
}

/// POST /export/details
pub async fn export_details(
    state: web::Data<AppState>,
    body: web::Json<ExportBody>,
) -> HandlerResult {
    let body = body.into_inner();
    let articles = state.service.export_details(&body.articles).await?;
    Ok(HttpResponse::Ok().json(ExportResponse {
        user_id: body.user_id,
        articles,
    }))
}

/// POST /export/csv
pub async fn export_csv(state: web::Data<AppState>, body: web::Json<ExportBody>) -> HandlerResult {
    let csv = state.service.export_csv(&body.articles).await?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(CSV_FILE_NAME.to_string())],
        })
        .body(csv))
}

/// GET /categories
pub async fn categories(state: web::Data<AppState>) -> HandlerResult {
    Ok(HttpResponse::Ok().json(state.service.categories().await?))
}

/// GET /users?limit=100
pub async fn users(state: web::Data<AppState>, params: web::Query<UsersQuery>) -> HandlerResult {
    Ok(HttpResponse::Ok().json(state.service.users(params.limit).await?))
}

/// GET /articles/{id}
pub async fn article(state: web::Data<AppState>, path: web::Path<String>) -> HandlerResult {
    let id = path.into_inner();
    match state.service.article(&id).await? {
        Some(detail) => Ok(HttpResponse::Ok().json(detail)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("Article {} not found", id)
        }))),
    }
}
