use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryOrder, QuerySelect, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Store;
use crate::entities::{experience, Experience};
use crate::error::AppError;

pub const CACHE_PREFIX: &str = "experiences:";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewExperience {
    pub company: String,
    pub position: String,
    pub duration: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Defaults to the end of the list.
    #[serde(default)]
    pub order_index: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ExperiencePatch {
    pub company: Option<String>,
    pub position: Option<String>,
    pub duration: Option<String>,
    pub logo_url: Option<String>,
    pub order_index: Option<i32>,
}

/// Ordered by `order_index`, ties broken by creation time.
pub async fn list(store: &Store) -> Result<Vec<experience::Model>, AppError> {
    let key = format!("{CACHE_PREFIX}list");
    store
        .cached(&key, move || async move {
            let rows = Experience::find()
                .order_by_asc(experience::Column::OrderIndex)
                .order_by_asc(experience::Column::CreatedAt)
                .all(&store.db)
                .await?;
            Ok::<_, AppError>(rows)
        })
        .await
}

pub async fn get(store: &Store, id: Uuid) -> Result<experience::Model, AppError> {
    Experience::find_by_id(id)
        .one(&store.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Experience {}", id)))
}

async fn next_order_index(store: &Store) -> Result<i32, AppError> {
    let max: Option<Option<i32>> = Experience::find()
        .select_only()
        .column_as(experience::Column::OrderIndex.max(), "max_order")
        .into_tuple()
        .one(&store.db)
        .await?;
    Ok(max.flatten().map_or(0, |m| m + 1))
}

#[tracing::instrument(skip(store, input), fields(company = %input.company))]
pub async fn create(store: &Store, input: NewExperience) -> Result<experience::Model, AppError> {
    let order_index = match input.order_index {
        Some(index) => index,
        None => next_order_index(store).await?,
    };

    let now = Utc::now();
    let created = experience::ActiveModel {
        id: Set(Uuid::new_v4()),
        company: Set(input.company),
        position: Set(input.position),
        duration: Set(input.duration),
        logo_url: Set(input.logo_url),
        order_index: Set(order_index),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&store.db)
    .await?;

    store.cache.invalidate(CACHE_PREFIX).await;
    Ok(created)
}

#[tracing::instrument(skip(store, patch))]
pub async fn update(store: &Store, id: Uuid, patch: ExperiencePatch) -> Result<experience::Model, AppError> {
    let mut active: experience::ActiveModel = get(store, id).await?.into();
    if let Some(company) = patch.company {
        active.company = Set(company);
    }
    if let Some(position) = patch.position {
        active.position = Set(position);
    }
    if let Some(duration) = patch.duration {
        active.duration = Set(duration);
    }
    if let Some(logo_url) = patch.logo_url {
        active.logo_url = Set(Some(logo_url));
    }
    if let Some(order_index) = patch.order_index {
        active.order_index = Set(order_index);
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(&store.db).await?;
    store.cache.invalidate(CACHE_PREFIX).await;
    Ok(updated)
}

#[tracing::instrument(skip(store))]
pub async fn delete(store: &Store, id: Uuid) -> Result<(), AppError> {
    let result = Experience::delete_by_id(id).exec(&store.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Experience {}", id)));
    }
    store.cache.invalidate(CACHE_PREFIX).await;
    Ok(())
}
