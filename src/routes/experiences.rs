use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::entities::experience;
use crate::error::AppError;
use crate::store::experiences::{self, ExperiencePatch, NewExperience};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/experiences",
    responses((status = 200, description = "Work experience in display order", body = [experience::Model])),
    tag = "profile"
)]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<experience::Model>>, AppError> {
    Ok(Json(experiences::list(&state.store).await?))
}

#[utoipa::path(
    get,
    path = "/admin/experiences/{id}",
    params(("id" = Uuid, Path, description = "Experience id")),
    responses(
        (status = 200, description = "Experience", body = experience::Model),
        (status = 404, description = "Experience not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<experience::Model>, AppError> {
    Ok(Json(experiences::get(&state.store, id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/experiences",
    request_body = NewExperience,
    responses((status = 201, description = "Experience created", body = experience::Model)),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    input: Result<Json<NewExperience>, JsonRejection>,
) -> Result<(StatusCode, Json<experience::Model>), AppError> {
    let Json(input) = input?;
    let created = experiences::create(&state.store, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    patch,
    path = "/admin/experiences/{id}",
    params(("id" = Uuid, Path, description = "Experience id")),
    request_body = ExperiencePatch,
    responses(
        (status = 200, description = "Experience updated", body = experience::Model),
        (status = 404, description = "Experience not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    patch: Result<Json<ExperiencePatch>, JsonRejection>,
) -> Result<Json<experience::Model>, AppError> {
    let Json(patch) = patch?;
    Ok(Json(experiences::update(&state.store, id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/experiences/{id}",
    params(("id" = Uuid, Path, description = "Experience id")),
    responses(
        (status = 204, description = "Experience deleted"),
        (status = 404, description = "Experience not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    experiences::delete(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
