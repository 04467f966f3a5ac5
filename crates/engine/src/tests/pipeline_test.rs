//! Engine output through formatting and export

use super::fixture;
use crate::export::{render_csv, resolve_details};
use crate::filters::CategoryFilter;
use crate::formatter::{format_recommendations, format_with_reason, raw_records};
use crate::inference::MaskedLanguageModel;
use crate::search::{KeywordSearch, KEYWORD_REASON};
use crate::sequence::SequenceRecommender;
use crate::types::Algorithm;

struct EchoModel(&'static str);

impl MaskedLanguageModel for EchoModel {
    fn predict_tokens(&self, _titles: &[String], _top_n: usize) -> anyhow::Result<Vec<String>> {
        Ok(vec!["[SEP]".to_string(), "##s".to_string(), self.0.to_string()])
    }
}

#[test]
fn test_sequence_results_are_formatted_with_catalog_titles() {
    let dataset = fixture();
    let recommender = SequenceRecommender::default();
    let sequence = recommender.user_sequence(&dataset, "U3");
    assert_eq!(sequence.titles, vec!["Markets rally after rate cut"]);

    let scored = recommender
        .recommend(
            &EchoModel("touchdown"),
            &dataset,
            &sequence,
            3,
            &CategoryFilter::none(),
        )
        .unwrap();
    let items = format_recommendations(
        raw_records(&scored, &dataset),
        Algorithm::Bert.reason_prefix(),
    );

    let ids: Vec<&str> = items.iter().map(|i| i.item_id.as_str()).collect();
    assert_eq!(ids, vec!["N1", "N2", "N10"]);
    assert!((items[0].score - 0.85).abs() < 1e-6);
    assert!((items[2].score - 0.75).abs() < 1e-6);
    assert_eq!(
        items[0].title.as_deref(),
        Some("Quarterback throws record touchdown")
    );
    assert_eq!(
        items[0].reason.as_deref(),
        Some("BERT4Rec: Based on your preferences")
    );
}

#[test]
fn test_sequence_never_returns_read_articles() {
    let dataset = fixture();
    let recommender = SequenceRecommender::default();
    let sequence = recommender.user_sequence(&dataset, "U2");

    let scored = recommender
        .recommend(
            &EchoModel("election"),
            &dataset,
            &sequence,
            5,
            &CategoryFilter::none(),
        )
        .unwrap();

    assert!(scored
        .iter()
        .all(|s| s.article_id != "N3" && s.article_id != "N8"));
}

#[test]
fn test_search_then_export() {
    let dataset = fixture();
    let scored =
        KeywordSearch::execute(&dataset, "election", 5, &CategoryFilter::none()).unwrap();
    let items = format_with_reason(raw_records(&scored, &dataset), KEYWORD_REASON);

    let ids: Vec<&str> = items.iter().map(|i| i.item_id.as_str()).collect();
    assert_eq!(ids, vec!["N3", "N8"]);
    assert!(items
        .iter()
        .all(|i| i.reason.as_deref() == Some("Keyword match")));

    let details = resolve_details(&dataset, &raw_records(&scored, &dataset));
    let csv = String::from_utf8(render_csv(&details).unwrap()).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("N8,Election turnout hits record,news,newsworld"));
}

#[tokio::test]
async fn test_service_over_materialized_dataset() {
    use crate::config::ServiceConfig;
    use crate::dataset::NewsRepository;
    use crate::service::{RecommendRequest, RecommendationService};
    use std::sync::Arc;

    let repository = Arc::new(NewsRepository::from_dataset(fixture()));
    assert!(repository.is_loaded());
    let service = RecommendationService::new(repository, &ServiceConfig::default(), None);

    let items = service
        .recommend(RecommendRequest::new("U4", 3).with_algorithm("hybrid"))
        .await
        .unwrap();

    assert!(!items.is_empty() && items.len() <= 3);
    assert!(items.iter().all(|i| i.item_id != "N404"));
}
