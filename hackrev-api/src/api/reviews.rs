//! Review submission and per-reviewee queries

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use hackrev_ledger::{RecordId, ReviewRecord, ReviewSubmission, RevieweeSummary, SortOrder};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::split_list;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Response for a committed review
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: RecordId,
}

/// Query parameters for a reviewee's review list
#[derive(Debug, Default, Deserialize)]
pub struct ReviewsQuery {
    /// Comma-separated technology filters (case-insensitive substrings)
    pub tech: Option<String>,
    /// relevance | recent | rating
    pub sort: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewListResponse {
    pub reviewee: String,
    pub count: usize,
    pub reviews: Vec<ReviewRecord>,
}

pub(crate) fn parse_sort(sort: Option<&str>) -> ApiResult<SortOrder> {
    sort.map(str::parse::<SortOrder>)
        .transpose()
        .map(Option::unwrap_or_default)
        .map_err(ApiError::BadRequest)
}

/// POST /api/reviews
///
/// Validates and commits one review. Returns 201 with the assigned id.
pub async fn submit_review(
    State(state): State<AppState>,
    payload: Result<Json<ReviewSubmission>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let Json(submission) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let id = state.gateway.submit(submission).await?;
    info!("Review {} submitted via API", id);
    Ok((StatusCode::CREATED, Json(SubmitResponse { id })))
}

/// GET /api/reviews/:id
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ReviewRecord>> {
    let id: u64 = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid review id: {}", id)))?;
    Ok(Json(state.ledger.get_by_id(RecordId::new(id))?))
}

/// GET /api/reviewees/:reviewee/reviews?tech=a,b&sort=rating
///
/// Oldest first unless a sort is given. An unknown reviewee is an empty list.
pub async fn reviews_of(
    State(state): State<AppState>,
    Path(reviewee): Path<String>,
    Query(query): Query<ReviewsQuery>,
) -> ApiResult<Json<ReviewListResponse>> {
    let order = parse_sort(query.sort.as_deref())?;
    let filters = split_list(query.tech.as_deref());

    let reviews = order.sorted(state.queries.reviews_of_matching(&reviewee, &filters));
    Ok(Json(ReviewListResponse {
        count: reviews.len(),
        reviewee,
        reviews,
    }))
}

/// GET /api/reviewees/:reviewee/summary
pub async fn reviewee_summary(
    State(state): State<AppState>,
    Path(reviewee): Path<String>,
) -> Json<RevieweeSummary> {
    Json(state.queries.summary_of(&reviewee))
}
