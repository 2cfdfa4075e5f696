//! Companies and their founders.
//!
//! A company is always saved together with its founder set inside one
//! transaction. Founders are reconciled by diff: matching ids are updated,
//! new entries inserted, and founders missing from the submitted set deleted.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, LoaderTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{StatusFilter, Store};
use crate::entities::{company, founder, Company, Founder, PublishStatus};
use crate::error::AppError;

pub const CACHE_PREFIX: &str = "companies:";

/// A company row with its founders in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompanyWithFounders {
    #[serde(flatten)]
    pub company: company::Model,
    pub founders: Vec<founder::Model>,
}

/// One entry of the founders sub-form. `id` is set when editing an existing founder.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct FounderInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub twitter_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewCompany {
    pub name: String,
    pub sector: String,
    pub description: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub status: PublishStatus,
    #[serde(default)]
    pub founders: Vec<FounderInput>,
}

/// Partial update. When `founders` is present it replaces the founder set
/// (by diff); when absent the founders are left untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CompanyPatch {
    pub name: Option<String>,
    pub sector: Option<String>,
    pub description: Option<String>,
    pub logo_url: Option<String>,
    pub content: Option<String>,
    pub status: Option<PublishStatus>,
    pub founders: Option<Vec<FounderInput>>,
}

/// Planned changes to bring a company's founders in line with a submitted form.
#[derive(Debug, Default)]
pub struct FounderDiff {
    pub insert: Vec<(i32, FounderInput)>,
    pub update: Vec<(founder::Model, i32, FounderInput)>,
    pub remove: Vec<Uuid>,
}

/// Blank names are dropped; an id matches at most one existing founder.
pub fn diff_founders(existing: Vec<founder::Model>, incoming: Vec<FounderInput>) -> FounderDiff {
    let mut remaining: HashMap<Uuid, founder::Model> = existing.into_iter().map(|f| (f.id, f)).collect();
    let mut diff = FounderDiff::default();

    let kept = incoming.into_iter().filter(|f| !f.name.trim().is_empty());
    for (position, input) in kept.enumerate() {
        let position = position as i32;
        match input.id.and_then(|id| remaining.remove(&id)) {
            Some(current) => diff.update.push((current, position, input)),
            None => diff.insert.push((position, input)),
        }
    }

    diff.remove = remaining.into_keys().collect();
    diff.remove.sort();
    diff
}

async fn load_founders<C: ConnectionTrait>(conn: &C, company_id: Uuid) -> Result<Vec<founder::Model>, AppError> {
    Ok(Founder::find()
        .filter(founder::Column::CompanyId.eq(company_id))
        .order_by_asc(founder::Column::Position)
        .order_by_asc(founder::Column::CreatedAt)
        .all(conn)
        .await?)
}

async fn reconcile_founders<C: ConnectionTrait>(
    conn: &C,
    company_id: Uuid,
    incoming: Vec<FounderInput>,
) -> Result<Vec<founder::Model>, AppError> {
    let existing = load_founders(conn, company_id).await?;
    let diff = diff_founders(existing, incoming);
    tracing::debug!(
        %company_id,
        insert = diff.insert.len(),
        update = diff.update.len(),
        remove = diff.remove.len(),
        "reconciling founders"
    );

    if !diff.remove.is_empty() {
        Founder::delete_many()
            .filter(founder::Column::Id.is_in(diff.remove))
            .exec(conn)
            .await?;
    }

    for (current, position, input) in diff.update {
        let mut active: founder::ActiveModel = current.into();
        active.name = Set(input.name.trim().to_string());
        active.title = Set(input.title);
        active.image_url = Set(input.image_url);
        active.linkedin_url = Set(input.linkedin_url);
        active.twitter_url = Set(input.twitter_url);
        active.position = Set(position);
        active.update(conn).await?;
    }

    let now = Utc::now();
    for (position, input) in diff.insert {
        founder::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            name: Set(input.name.trim().to_string()),
            title: Set(input.title),
            image_url: Set(input.image_url),
            linkedin_url: Set(input.linkedin_url),
            twitter_url: Set(input.twitter_url),
            position: Set(position),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
    }

    load_founders(conn, company_id).await
}

/// Companies newest first, each with its founders.
pub async fn list(store: &Store, filter: StatusFilter) -> Result<Vec<CompanyWithFounders>, AppError> {
    let key = format!("{CACHE_PREFIX}list:{}", filter.as_str());
    store
        .cached(&key, move || async move {
            let mut query = Company::find();
            if filter == StatusFilter::Published {
                query = query.filter(company::Column::Status.eq(PublishStatus::Published));
            }
            let companies = query
                .order_by_desc(company::Column::CreatedAt)
                .all(&store.db)
                .await?;
            let founders = companies.load_many(Founder, &store.db).await?;

            let rows = companies
                .into_iter()
                .zip(founders)
                .map(|(company, mut founders)| {
                    founders.sort_by_key(|f| (f.position, f.created_at));
                    CompanyWithFounders { company, founders }
                })
                .collect::<Vec<_>>();
            Ok::<_, AppError>(rows)
        })
        .await
}

pub async fn get(store: &Store, id: Uuid) -> Result<CompanyWithFounders, AppError> {
    let key = format!("{CACHE_PREFIX}{id}");
    store
        .cached(&key, move || async move {
            let company = Company::find_by_id(id)
                .one(&store.db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Company {}", id)))?;
            let founders = load_founders(&store.db, id).await?;
            Ok::<_, AppError>(CompanyWithFounders { company, founders })
        })
        .await
}

/// Like [`get`], but drafts are reported as missing.
pub async fn get_published(store: &Store, id: Uuid) -> Result<CompanyWithFounders, AppError> {
    let found = get(store, id).await?;
    if found.company.status != PublishStatus::Published {
        return Err(AppError::NotFound(format!("Company {}", id)));
    }
    Ok(found)
}

#[tracing::instrument(skip(store, input), fields(name = %input.name, founders = input.founders.len()))]
pub async fn create(store: &Store, input: NewCompany) -> Result<CompanyWithFounders, AppError> {
    let now = Utc::now();
    let txn = store.db.begin().await?;

    let company = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(input.name),
        sector: Set(input.sector),
        description: Set(input.description),
        logo_url: Set(input.logo_url),
        content: Set(input.content),
        status: Set(input.status),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    let founders = reconcile_founders(&txn, company.id, input.founders).await?;

    txn.commit().await?;
    store.cache.invalidate(CACHE_PREFIX).await;
    tracing::info!(id = %company.id, "company created");
    Ok(CompanyWithFounders { company, founders })
}

#[tracing::instrument(skip(store, patch))]
pub async fn update(store: &Store, id: Uuid, patch: CompanyPatch) -> Result<CompanyWithFounders, AppError> {
    let txn = store.db.begin().await?;

    let existing = Company::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Company {}", id)))?;

    let mut active: company::ActiveModel = existing.into();
    if let Some(name) = patch.name {
        active.name = Set(name);
    }
    if let Some(sector) = patch.sector {
        active.sector = Set(sector);
    }
    if let Some(description) = patch.description {
        active.description = Set(description);
    }
    if let Some(logo_url) = patch.logo_url {
        active.logo_url = Set(Some(logo_url));
    }
    if let Some(content) = patch.content {
        active.content = Set(Some(content));
    }
    if let Some(status) = patch.status {
        active.status = Set(status);
    }
    active.updated_at = Set(Utc::now());
    let company = active.update(&txn).await?;

    let founders = match patch.founders {
        Some(incoming) => reconcile_founders(&txn, id, incoming).await?,
        None => load_founders(&txn, id).await?,
    };

    txn.commit().await?;
    store.cache.invalidate(CACHE_PREFIX).await;
    Ok(CompanyWithFounders { company, founders })
}

/// Deletes the company and its founders together.
#[tracing::instrument(skip(store))]
pub async fn delete(store: &Store, id: Uuid) -> Result<(), AppError> {
    let txn = store.db.begin().await?;
    Founder::delete_many()
        .filter(founder::Column::CompanyId.eq(id))
        .exec(&txn)
        .await?;
    let result = Company::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!("Company {}", id)));
    }
    txn.commit().await?;

    store.cache.invalidate(CACHE_PREFIX).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing(name: &str, position: i32) -> founder::Model {
        founder::Model {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            name: name.to_string(),
            title: String::new(),
            image_url: None,
            linkedin_url: None,
            twitter_url: None,
            position,
            created_at: Utc::now(),
        }
    }

    fn input(id: Option<Uuid>, name: &str) -> FounderInput {
        FounderInput {
            id,
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn new_set_without_ids_replaces_everything() {
        let a = existing("A", 0);
        let a_id = a.id;
        let diff = diff_founders(vec![a], vec![input(None, "B")]);

        assert_eq!(diff.remove, vec![a_id]);
        assert!(diff.update.is_empty());
        assert_eq!(diff.insert.len(), 1);
        assert_eq!(diff.insert[0].1.name, "B");
    }

    #[test]
    fn matching_ids_are_updated_in_new_order() {
        let a = existing("A", 0);
        let b = existing("B", 1);
        let (a_id, b_id) = (a.id, b.id);

        let diff = diff_founders(vec![a, b], vec![input(Some(b_id), "B2"), input(Some(a_id), "A")]);

        assert!(diff.remove.is_empty());
        assert!(diff.insert.is_empty());
        let order: Vec<(Uuid, i32)> = diff.update.iter().map(|(m, pos, _)| (m.id, *pos)).collect();
        assert_eq!(order, vec![(b_id, 0), (a_id, 1)]);
    }

    #[test]
    fn blank_names_are_ignored_and_positions_stay_dense() {
        let diff = diff_founders(vec![], vec![input(None, "  "), input(None, "C"), input(None, "")]);
        assert_eq!(diff.insert.len(), 1);
        assert_eq!(diff.insert[0].0, 0);
    }

    #[test]
    fn unknown_or_repeated_ids_become_inserts() {
        let a = existing("A", 0);
        let a_id = a.id;
        let diff = diff_founders(
            vec![a],
            vec![input(Some(a_id), "A"), input(Some(a_id), "A again"), input(Some(Uuid::new_v4()), "X")],
        );
        assert_eq!(diff.update.len(), 1);
        assert_eq!(diff.insert.len(), 2);
        assert!(diff.remove.is_empty());
    }
}
