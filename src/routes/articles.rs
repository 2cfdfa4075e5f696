use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::entities::article;
use crate::error::AppError;
use crate::newsletter::{self, NewsletterResponse};
use crate::store::articles::{self, ArticlePatch, NewArticle};
use crate::store::{ListQuery, StatusFilter};
use crate::AppState;

/// Published articles, newest first
#[utoipa::path(
    get,
    path = "/articles",
    responses((status = 200, description = "Published articles", body = [article::Model])),
    tag = "articles"
)]
pub async fn list_published(State(state): State<AppState>) -> Result<Json<Vec<article::Model>>, AppError> {
    Ok(Json(articles::list(&state.store, StatusFilter::Published).await?))
}

#[utoipa::path(
    get,
    path = "/articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "The article", body = article::Model),
        (status = 404, description = "No published article with this id")
    ),
    tag = "articles"
)]
pub async fn get_published(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<article::Model>, AppError> {
    Ok(Json(articles::get_published(&state.store, id).await?))
}

#[utoipa::path(
    get,
    path = "/admin/articles",
    params(ListQuery),
    responses(
        (status = 200, description = "Articles, drafts included unless filtered", body = [article::Model]),
        (status = 401, description = "Missing or wrong admin token")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<article::Model>>, AppError> {
    let filter = query.status.unwrap_or_default();
    Ok(Json(articles::list(&state.store, filter).await?))
}

#[utoipa::path(
    get,
    path = "/admin/articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "The article", body = article::Model),
        (status = 404, description = "Article not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<article::Model>, AppError> {
    Ok(Json(articles::get(&state.store, id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/articles",
    request_body = NewArticle,
    responses((status = 201, description = "Article created", body = article::Model)),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state, input))]
pub async fn create(
    State(state): State<AppState>,
    input: Result<Json<NewArticle>, JsonRejection>,
) -> Result<(StatusCode, Json<article::Model>), AppError> {
    let Json(input) = input?;
    let created = articles::create(&state.store, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    patch,
    path = "/admin/articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    request_body = ArticlePatch,
    responses(
        (status = 200, description = "Article updated", body = article::Model),
        (status = 404, description = "Article not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state, patch))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    patch: Result<Json<ArticlePatch>, JsonRejection>,
) -> Result<Json<article::Model>, AppError> {
    let Json(patch) = patch?;
    Ok(Json(articles::update(&state.store, id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/admin/articles/{id}",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 204, description = "Article deleted"),
        (status = 404, description = "Article not found")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    articles::delete(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Email a published article to every active subscriber
#[utoipa::path(
    post,
    path = "/admin/articles/{id}/announce",
    params(("id" = Uuid, Path, description = "Article id")),
    responses(
        (status = 200, description = "Newsletter sent; counts per outcome", body = NewsletterResponse),
        (status = 400, description = "Article is a draft or there are no subscribers"),
        (status = 500, description = "Email provider not configured")
    ),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state))]
pub async fn announce(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<NewsletterResponse>, AppError> {
    let dispatcher = state.dispatcher()?;
    Ok(Json(newsletter::announce_article(&state.store, &dispatcher, id).await?))
}
