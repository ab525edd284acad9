//! Per-reviewee aggregates for profile and landing pages

use crate::record::{ReviewRecord, TagKey};
use serde::Serialize;
use std::collections::HashMap;

/// How many of a reviewee's reviews mention one technology
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechnologyCount {
    /// Display casing of the first review that used it
    pub technology: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevieweeSummary {
    pub reviewee: String,
    pub review_count: usize,
    /// `None` when there are no reviews
    pub average_rating: Option<f64>,
    /// Count descending, then normalized tag ascending
    pub technologies: Vec<TechnologyCount>,
}

impl RevieweeSummary {
    /// Aggregate `reviews`, which must be in commit order
    pub(crate) fn from_reviews(reviewee: &str, reviews: &[ReviewRecord]) -> Self {
        let average_rating = if reviews.is_empty() {
            None
        } else {
            let total: u64 = reviews.iter().map(|r| u64::from(r.rating)).sum();
            Some(total as f64 / reviews.len() as f64)
        };

        let mut counts: HashMap<TagKey, (String, usize)> = HashMap::new();
        for review in reviews {
            for key in review.tag_keys() {
                counts
                    .entry(key.clone())
                    .or_insert_with(|| (display_name(review, &key), 0))
                    .1 += 1;
            }
        }

        let mut ranked: Vec<(TagKey, String, usize)> = counts
            .into_iter()
            .map(|(key, (display, count))| (key, display, count))
            .collect();
        ranked.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

        Self {
            reviewee: reviewee.to_string(),
            review_count: reviews.len(),
            average_rating,
            technologies: ranked
                .into_iter()
                .map(|(_, technology, count)| TechnologyCount { technology, count })
                .collect(),
        }
    }
}

fn display_name(review: &ReviewRecord, key: &TagKey) -> String {
    review
        .technologies
        .iter()
        .find(|t| key.matches(t))
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|| key.to_string())
}
