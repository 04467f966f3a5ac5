//! Interaction extraction
//!
//! Turns behavior records into (user, article, rating) triples. History
//! entries are implicit positives (1.0); impression entries carry their
//! click label. Duplicate (user, article) pairs are averaged.

use crate::types::{BehaviorRecord, InteractionTriple};
use std::collections::HashMap;

/// Extract averaged interaction triples, ordered by first appearance
pub fn extract_interactions(behaviors: &[BehaviorRecord]) -> Vec<InteractionTriple> {
    // (user, article) -> (rating sum, count)
    let mut aggregated: HashMap<(&str, &str), (f32, u32)> = HashMap::new();
    let mut order: Vec<(&str, &str)> = Vec::new();

    for behavior in behaviors {
        let user = behavior.user_id.as_str();

        let history = behavior.history.iter().map(|id| (id.as_str(), 1.0f32));
        let impressions = behavior
            .impressions
            .iter()
            .map(|(id, label)| (id.as_str(), *label as f32));

        for (article, rating) in history.chain(impressions) {
            let entry = aggregated.entry((user, article)).or_insert_with(|| {
                order.push((user, article));
                (0.0, 0)
            });
            entry.0 += rating;
            entry.1 += 1;
        }
    }

    order
        .into_iter()
        .map(|key| {
            let (sum, count) = aggregated[&key];
            InteractionTriple {
                user_id: key.0.to_string(),
                article_id: key.1.to_string(),
                rating: sum / count as f32,
            }
        })
        .collect()
}
