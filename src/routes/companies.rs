use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::newsletter::{self, NewsletterResponse};
use crate::store::companies::{self, CompanyPatch, CompanyWithFounders, NewCompany};
use crate::store::{ListQuery, StatusFilter};
use crate::AppState;

/// Published company journeys with their founders
#[utoipa::path(
    get,
    path = "/companies",
    responses((status = 200, description = "Published companies", body = [CompanyWithFounders])),
    tag = "companies"
)]
pub async fn list_published(State(state): State<AppState>) -> Result<Json<Vec<CompanyWithFounders>>, AppError> {
    Ok(Json(companies::list(&state.store, StatusFilter::Published).await?))
}

#[utoipa::path(
    get,
    path = "/companies/{id}",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "The company and its founders", body = CompanyWithFounders),
        (status = 404, description = "No published company with this id")
    ),
    tag = "companies"
)]
pub async fn get_published(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompanyWithFounders>, AppError> {
    Ok(Json(companies::get_published(&state.store, id).await?))
}

#[utoipa::path(
    get,
    path = "/admin/companies",
    params(ListQuery),
    responses((status = 200, description = "Companies, drafts included unless filtered", body = [CompanyWithFounders])),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<CompanyWithFounders>>, AppError> {
    let filter = query.status.unwrap_or_default();
    Ok(Json(companies::list(&state.store, filter).await?))
}

#[utoipa::path(
    get,
    path = "/admin/companies/{id}",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "The company and its founders", body = CompanyWithFounders),
        (status = 404, description = "Company not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<CompanyWithFounders>, AppError> {
    Ok(Json(companies::get(&state.store, id).await?))
}

/// Create a company together with its founders
#[utoipa::path(
    post,
    path = "/admin/companies",
    request_body = NewCompany,
    responses((status = 201, description = "Company created", body = CompanyWithFounders)),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    input: Result<Json<NewCompany>, JsonRejection>,
) -> Result<(StatusCode, Json<CompanyWithFounders>), AppError> {
    let Json(input) = input?;
    let created = companies::create(&state.store, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a company. A `founders` array replaces the founder list: entries with
/// a known `id` are updated, others inserted, and missing founders removed.
#[utoipa::path(
    put,
    path = "/admin/companies/{id}",
    params(("id" = Uuid, Path, description = "Company id")),
    request_body = CompanyPatch,
    responses(
        (status = 200, description = "Company updated", body = CompanyWithFounders),
        (status = 404, description = "Company not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    patch: Result<Json<CompanyPatch>, JsonRejection>,
) -> Result<Json<CompanyWithFounders>, AppError> {
    let Json(patch) = patch?;
    Ok(Json(companies::update(&state.store, id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/companies/{id}",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 204, description = "Company and founders deleted"),
        (status = 404, description = "Company not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    companies::delete(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/admin/companies/{id}/announce",
    params(("id" = Uuid, Path, description = "Company id")),
    responses(
        (status = 200, description = "Newsletter sent; counts per outcome", body = NewsletterResponse),
        (status = 400, description = "Company is a draft or there are no subscribers"),
        (status = 500, description = "Email provider not configured")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state))]
pub async fn announce(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<NewsletterResponse>, AppError> {
    let dispatcher = state.dispatcher()?;
    Ok(Json(newsletter::announce_company(&state.store, &dispatcher, id).await?))
}
