use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{newsletter_subscriber, SubscriberStatus};
use crate::error::AppError;
use crate::store::subscribers::{self, Subscription};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChange {
    pub status: SubscriberStatus,
}

/// Join the newsletter
#[utoipa::path(
    post,
    path = "/newsletter/subscribe",
    request_body = Subscription,
    responses(
        (status = 201, description = "Subscribed", body = newsletter_subscriber::Model),
        (status = 400, description = "Missing name or invalid email"),
        (status = 409, description = "Email already subscribed")
    ),
    tag = "newsletter"
)]
#[tracing::instrument(skip(state, input))]
pub async fn subscribe(
    State(state): State<AppState>,
    input: Result<Json<Subscription>, JsonRejection>,
) -> Result<(StatusCode, Json<newsletter_subscriber::Model>), AppError> {
    let Json(input) = input?;
    let subscriber = subscribers::subscribe(&state.store, input).await?;
    Ok((StatusCode::CREATED, Json(subscriber)))
}

#[utoipa::path(
    get,
    path = "/admin/subscribers",
    responses((status = 200, description = "All subscribers, newest first", body = [newsletter_subscriber::Model])),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<newsletter_subscriber::Model>>, AppError> {
    Ok(Json(subscribers::list(&state.store).await?))
}

#[utoipa::path(
    get,
    path = "/admin/subscribers/{id}",
    params(("id" = Uuid, Path, description = "Subscriber id")),
    responses(
        (status = 200, description = "Subscriber", body = newsletter_subscriber::Model),
        (status = 404, description = "Subscriber not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<newsletter_subscriber::Model>, AppError> {
    Ok(Json(subscribers::get(&state.store, id).await?))
}

#[utoipa::path(
    patch,
    path = "/admin/subscribers/{id}",
    params(("id" = Uuid, Path, description = "Subscriber id")),
    request_body = StatusChange,
    responses(
        (status = 200, description = "Status changed", body = newsletter_subscriber::Model),
        (status = 404, description = "Subscriber not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state, change))]
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    change: Result<Json<StatusChange>, JsonRejection>,
) -> Result<Json<newsletter_subscriber::Model>, AppError> {
    let Json(change) = change?;
    Ok(Json(subscribers::update_status(&state.store, id, change.status).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/subscribers/{id}",
    params(("id" = Uuid, Path, description = "Subscriber id")),
    responses(
        (status = 204, description = "Subscriber removed"),
        (status = 404, description = "Subscriber not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    subscribers::delete(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
