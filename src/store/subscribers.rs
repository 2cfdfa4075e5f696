use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Store;
use crate::entities::{newsletter_subscriber, NewsletterSubscriber, SubscriberStatus};
use crate::error::AppError;

pub const CACHE_PREFIX: &str = "subscribers:";

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct Subscription {
    pub name: String,
    pub email: String,
}

impl Subscription {
    /// Trimmed name and lower-cased email, or a 400 explaining what is wrong.
    pub fn normalized(&self) -> Result<(String, String), AppError> {
        let name = self.name.trim();
        let email = self.email.trim().to_lowercase();
        if name.is_empty() {
            return Err(AppError::InvalidRequest("Name is required".to_string()));
        }
        if !is_plausible_email(&email) {
            return Err(AppError::InvalidRequest("A valid email address is required".to_string()));
        }
        Ok((name.to_string(), email))
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace),
        None => false,
    }
}

/// Every subscriber, newest first.
pub async fn list(store: &Store) -> Result<Vec<newsletter_subscriber::Model>, AppError> {
    let key = format!("{CACHE_PREFIX}list:all");
    store
        .cached(&key, move || async move {
            let rows = NewsletterSubscriber::find()
                .order_by_desc(newsletter_subscriber::Column::CreatedAt)
                .all(&store.db)
                .await?;
            Ok::<_, AppError>(rows)
        })
        .await
}

/// Recipients of the next newsletter. Always read from the database.
pub async fn list_active(store: &Store) -> Result<Vec<newsletter_subscriber::Model>, AppError> {
    Ok(NewsletterSubscriber::find()
        .filter(newsletter_subscriber::Column::Status.eq(SubscriberStatus::Active))
        .order_by_asc(newsletter_subscriber::Column::CreatedAt)
        .all(&store.db)
        .await?)
}

pub async fn get(store: &Store, id: Uuid) -> Result<newsletter_subscriber::Model, AppError> {
    NewsletterSubscriber::find_by_id(id)
        .one(&store.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Subscriber {}", id)))
}

/// Creates an active subscriber. An unsubscribed address is reactivated;
/// an address that is already active is a conflict.
#[tracing::instrument(skip(store, input))]
pub async fn subscribe(store: &Store, input: Subscription) -> Result<newsletter_subscriber::Model, AppError> {
    let (name, email) = input.normalized()?;

    let existing = NewsletterSubscriber::find()
        .filter(newsletter_subscriber::Column::Email.eq(email.as_str()))
        .one(&store.db)
        .await?;

    let saved = match existing {
        Some(current) if current.status == SubscriberStatus::Active => {
            return Err(AppError::Conflict(format!("{} is already subscribed", email)));
        }
        Some(current) => {
            let mut active: newsletter_subscriber::ActiveModel = current.into();
            active.name = Set(name);
            active.status = Set(SubscriberStatus::Active);
            active.updated_at = Set(Utc::now());
            active.update(&store.db).await?
        }
        None => {
            let now = Utc::now();
            newsletter_subscriber::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(name),
                email: Set(email),
                status: Set(SubscriberStatus::Active),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&store.db)
            .await?
        }
    };

    store.cache.invalidate(CACHE_PREFIX).await;
    tracing::info!(id = %saved.id, "subscriber active");
    Ok(saved)
}

#[tracing::instrument(skip(store))]
pub async fn update_status(
    store: &Store,
    id: Uuid,
    status: SubscriberStatus,
) -> Result<newsletter_subscriber::Model, AppError> {
    let mut active: newsletter_subscriber::ActiveModel = get(store, id).await?.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&store.db).await?;
    store.cache.invalidate(CACHE_PREFIX).await;
    Ok(updated)
}

#[tracing::instrument(skip(store))]
pub async fn delete(store: &Store, id: Uuid) -> Result<(), AppError> {
    let result = NewsletterSubscriber::delete_by_id(id).exec(&store.db).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Subscriber {}", id)));
    }
    store.cache.invalidate(CACHE_PREFIX).await;
    Ok(())
}
