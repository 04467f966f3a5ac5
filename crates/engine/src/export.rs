//! Export hand-off
//!
//! Resolves recommendation records to full article detail for a document
//! renderer, and renders the same detail set as CSV.

use crate::dataset::Dataset;
use crate::error::{RecommendError, Result};
use crate::formatter::RawRecord;
use crate::types::ArticleDetail;

pub const CSV_FILE_NAME: &str = "smart_news_report.csv";

/// Catalog detail for each record, in input order.
///
/// Records without an id or whose id is missing from the catalog are skipped.
pub fn resolve_details(dataset: &Dataset, records: &[RawRecord]) -> Vec<ArticleDetail> {
    records
        .iter()
        .filter_map(|record| record.item_id.as_deref())
        .filter_map(|id| dataset.article(id))
        .map(ArticleDetail::from)
        .collect()
}

/// CSV with columns `item_id,title,category,subcategory,abstract,url`
pub fn render_csv(details: &[ArticleDetail]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if details.is_empty() {
        writer
            .write_record(["item_id", "title", "category", "subcategory", "abstract", "url"])
            .map_err(|e| RecommendError::Export(e.to_string()))?;
    }
    for detail in details {
        writer
            .serialize(detail)
            .map_err(|e| RecommendError::Export(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| RecommendError::Export(e.to_string()))
}
