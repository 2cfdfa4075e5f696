use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{StatusFilter, Store};
use crate::entities::{article, Article, PublishStatus};
use crate::error::AppError;

pub const CACHE_PREFIX: &str = "articles:";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewArticle {
    pub title: String,
    pub excerpt: String,
    /// Rich-text HTML body
    #[serde(default)]
    pub content: Option<String>,
    pub category: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub status: PublishStatus,
}

/// Partial update: only the fields present are written.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ArticlePatch {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<PublishStatus>,
}

/// Articles newest first, optionally restricted to published ones.
pub async fn list(store: &Store, filter: StatusFilter) -> Result<Vec<article::Model>, AppError> {
    let key = format!("{CACHE_PREFIX}list:{}", filter.as_str());
    store
        .cached(&key, move || async move {
            let mut query = Article::find();
            if filter == StatusFilter::Published {
                query = query.filter(article::Column::Status.eq(PublishStatus::Published));
            }
            let rows = query
                .order_by_desc(article::Column::CreatedAt)
                .all(&store.db)
                .await?;
            Ok::<_, AppError>(rows)
        })
        .await
}

pub async fn get(store: &Store, id: Uuid) -> Result<article::Model, AppError> {
    let key = format!("{CACHE_PREFIX}{id}");
    store
        .cached(&key, move || async move {
            Article::find_by_id(id)
                .one(&store.db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Article {}", id)))
        })
        .await
}

/// Like [`get`], but drafts are reported as missing.
pub async fn get_published(store: &Store, id: Uuid) -> Result<article::Model, AppError> {
    let article = get(store, id).await?;
    if article.status != PublishStatus::Published {
        return Err(AppError::NotFound(format!("Article {}", id)));
    }
    Ok(article)
}

#[tracing::instrument(skip(store, input), fields(title = %input.title))]
pub async fn create(store: &Store, input: NewArticle) -> Result<article::Model, AppError> {
    let now = Utc::now();
    let created = article::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(input.title),
        excerpt: Set(input.excerpt),
        content: Set(input.content),
        category: Set(input.category),
        image_url: Set(input.image_url),
        status: Set(input.status),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&store.db)
    .await?;

    store.cache.invalidate(CACHE_PREFIX).await;
    tracing::info!(id = %created.id, "article created");
    Ok(created)
}

#[tracing::instrument(skip(store, patch))]
pub async fn update(store: &Store, id: Uuid, patch: ArticlePatch) -> Result<article::Model, AppError> {
    let existing = Article::find_by_id(id)
        .one(&store.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Article {}", id)))?;

    let mut active: article::ActiveModel = existing.into();
    if let Some(title) = patch.title {
        active.title = Set(title);
    }
    if let Some(excerpt) = patch.excerpt {
        active.excerpt = Set(excerpt);
    }
    if let Some(content) = patch.content {
        active.content = Set(Some(content));
    }
    if let Some(category) = patch.category {
        active.category = Set(category);
    }
    if let Some(image_url) = patch.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(status) = patch.status {
        active.status = Set(status);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&store.db).await?;
    store.cache.invalidate(CACHE_PREFIX).await;
    Ok(updated)
}

#[tracing::instrument(skip(store))]
pub async fn delete(store: &Store, id: Uuid) -> Result<(), AppError> {
    let result = Article::delete_by_id(id).exec(&store.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Article {}", id)));
    }
    store.cache.invalidate(CACHE_PREFIX).await;
    Ok(())
}
