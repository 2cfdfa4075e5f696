//! Data access for every content table.
//!
//! Each entity module exposes `list`, `get`, `create`, `update` and `delete`
//! over a [`Store`]. Reads go through the [`QueryCache`]; every mutation
//! invalidates the entity's cache prefix. Database errors are passed up as
//! [`AppError`] without retry.

pub mod articles;
pub mod companies;
pub mod experiences;
pub mod feed;
pub mod profile;
pub mod subscribers;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::cache::QueryCache;
use crate::error::AppError;
use sea_orm::DatabaseConnection;

pub use crate::entities::ContentKind;

#[derive(Clone)]
pub struct Store {
    pub db: DatabaseConnection,
    pub cache: Arc<dyn QueryCache>,
}

impl Store {
    pub fn new(db: DatabaseConnection, cache: Arc<dyn QueryCache>) -> Self {
        Self { db, cache }
    }

    /// Serve `key` from the cache, or run `load` and remember its result
    /// unless a mutation invalidated the cache while it ran.
    pub(crate) async fn cached<T, F, Fut>(&self, key: &str, load: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if let Some(hit) = self.cache.get(key).await {
            match serde_json::from_str(&hit) {
                Ok(value) => return Ok(value),
                Err(e) => tracing::warn!(key, "dropping undecodable cache entry: {}", e),
            }
        }

        let generation = self.cache.generation().await;
        let value = load().await?;
        match serde_json::to_string(&value) {
            Ok(encoded) => self.cache.set(key, encoded, generation).await,
            Err(e) => tracing::warn!(key, "not caching value: {}", e),
        }
        Ok(value)
    }
}

/// Which rows a list read returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Published,
}

impl StatusFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Published => "published",
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Optional: `all` (default) or `published`
    #[serde(default)]
    #[param(required = false)]
    pub status: Option<StatusFilter>,
}
