//! Multi-tag fan-out search
//!
//! A partial result is still a 200: tags that did not resolve are listed in
//! `failed_tags` so the caller can retry just those.

use axum::{
    extract::{Query, State},
    Json,
};
use hackrev_ledger::{ReviewRecord, TagFailure};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::reviews::parse_sort;
use super::split_list;
use crate::error::ApiResult;
use crate::AppState;

/// Query parameters for tag search
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Comma-separated technology tags (union)
    pub tags: Option<String>,
    /// relevance | recent | rating
    pub sort: Option<String>,
    /// Overrides the configured fan-out deadline
    pub timeout_ms: Option<u64>,
}

/// One tag that did not resolve
#[derive(Debug, Serialize)]
pub struct FailedTag {
    /// Normalized tag
    pub tag: String,
    /// lookup | cancelled | timed_out
    pub reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FailedTag {
    fn new(tag: String, failure: &TagFailure) -> Self {
        let (reason, detail) = match failure {
            TagFailure::Lookup(detail) => ("lookup", Some(detail.clone())),
            TagFailure::Cancelled => ("cancelled", None),
            TagFailure::TimedOut => ("timed_out", None),
        };
        Self { tag, reason, detail }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub tags: Vec<String>,
    pub sort: String,
    pub partial: bool,
    pub count: usize,
    pub records: Vec<ReviewRecord>,
    pub failed_tags: Vec<FailedTag>,
}

/// GET /api/search?tags=react,solidity&sort=rating&timeout_ms=500
pub async fn search_by_tags(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let order = parse_sort(query.sort.as_deref())?;
    let tags = split_list(query.tags.as_deref());
    let timeout = query
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(state.search_timeout);

    let outcome = state
        .queries
        .search_by_tags_within(&tags, timeout)
        .await?
        .sorted(order);

    let failed_tags = outcome
        .failed_tags
        .iter()
        .map(|(tag, failure)| FailedTag::new(tag.to_string(), failure))
        .collect();

    Ok(Json(SearchResponse {
        tags,
        sort: order.to_string(),
        partial: outcome.is_partial(),
        count: outcome.records.len(),
        records: outcome.records,
        failed_tags,
    }))
}
