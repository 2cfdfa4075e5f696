use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppError;
use crate::store::feed::{self, FeedItem, DEFAULT_FEED_LIMIT};
use crate::AppState;

const MAX_FEED_LIMIT: usize = 50;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FeedQuery {
    /// Number of items (default 6, at most 50)
    #[param(required = false)]
    pub limit: Option<usize>,
}

/// Latest published articles and company journeys, mixed by date
#[utoipa::path(
    get,
    path = "/feed",
    params(FeedQuery),
    responses((status = 200, description = "Newest items first", body = [FeedItem])),
    tag = "feed"
)]
pub async fn latest(State(state): State<AppState>, Query(query): Query<FeedQuery>) -> Result<Json<Vec<FeedItem>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_FEED_LIMIT).min(MAX_FEED_LIMIT);
    Ok(Json(feed::latest(&state.store, limit).await?))
}
