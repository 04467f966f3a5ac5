//! HTTP endpoint wiring

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use newsrec_engine::config::DatasetConfig;
use newsrec_engine::server::{configure_routes, AppState};
use newsrec_engine::{NewsRepository, RecommendationService, ServiceConfig};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

fn app_state() -> web::Data<AppState> {
    let fixtures = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let mut config = ServiceConfig::default();
    config.dataset = DatasetConfig {
        news_path: fixtures.join("news.tsv"),
        behaviors_path: fixtures.join("behaviors.tsv"),
        max_behavior_rows: None,
    };

    let repository = Arc::new(NewsRepository::new(config.dataset.clone()));
    let service = RecommendationService::new(repository, &config, None);

    web::Data::new(AppState {
        config: Arc::new(config),
        service: Arc::new(service),
    })
}

macro_rules! app {
    () => {
        test::init_service(
            App::new()
                .app_data(app_state())
                .configure(configure_routes),
        )
        .await
    };
}

#[actix_web::test]
async fn test_health() {
    let app = app!();
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["model_loaded"], false);
}

#[actix_web::test]
async fn test_trending() {
    let app = app!();
    let req = test::TestRequest::get().uri("/trending?k=3").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["item_id"], "N1");
    assert_eq!(items[0]["reason"], "Trending: Popular across categories");
}

#[actix_web::test]
async fn test_recommend() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/recommend")
        .set_json(json!({"user_id": "U1", "k": 3, "algorithm": "content"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["user_id"], "U1");
    let items = body["items"].as_array().unwrap();
    assert!(!items.is_empty() && items.len() <= 3);
    for item in items {
        assert!(item["reason"]
            .as_str()
            .unwrap()
            .starts_with("Content-Based: "));
        assert!(item["score"].is_number());
        assert!(item["title"].is_string());
    }
}

#[actix_web::test]
async fn test_recommend_defaults_and_category() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/recommend")
        .set_json(json!({"user_id": "U2", "category": "sports"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["item_id"].as_str().unwrap())
        .collect();
    assert!(!ids.is_empty());
    assert!(ids.iter().all(|id| ["N1", "N2", "N9"].contains(id)));
}

#[actix_web::test]
async fn test_recommend_rejects_bad_alpha() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/recommend")
        .set_json(json!({"user_id": "U1", "alpha": 2.0}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_search() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/search")
        .set_json(json!({"q": "storm", "k": 2}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["item_id"], "N4");
    assert_eq!(items[0]["score"], 3.0);
    assert_eq!(items[1]["reason"], "Keyword match");
}

#[actix_web::test]
async fn test_search_blank_query() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/search")
        .set_json(json!({"q": "   "}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_article_lookup() {
    let app = app!();

    let req = test::TestRequest::get().uri("/articles/N3").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["title"], "Election results certified");
    assert_eq!(body["abstract"], "Officials confirm the vote count.");

    let req = test::TestRequest::get().uri("/articles/N404").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_categories_and_users() {
    let app = app!();

    let req = test::TestRequest::get().uri("/categories").to_request();
    let categories: Vec<String> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(categories.len(), 5);

    let req = test::TestRequest::get().uri("/users?limit=3").to_request();
    let users: Vec<String> = test::call_and_read_body_json(&app, req).await;
    assert_eq!(users, vec!["U1", "U2", "U3"]);
}

#[actix_web::test]
async fn test_export_details() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/export/details")
        .set_json(json!({
            "user_id": "U1",
            "articles": [{"NewsID": "N5", "Similarity": 0.9}, {"item_id": "N404"}]
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["user_id"], "U1");
    let articles = body["articles"].as_array().unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0]["url"], "https://example.com/N5");
}

#[actix_web::test]
async fn test_export_csv() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/export/csv")
        .set_json(json!({"articles": [{"item_id": "N10"}]}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap(),
        "text/csv"
    );
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("smart_news_report.csv"));

    let body = test::read_body(resp).await;
    let csv = String::from_utf8(body.to_vec()).unwrap();
    assert!(csv.starts_with("item_id,title,category,subcategory,abstract,url"));
    assert!(csv.contains("N10,New health guidance for winter"));
}
