//! Read models for the home page and the about page.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{articles, companies, experiences, profile, ContentKind, StatusFilter, Store};
use crate::entities::{article, experience, personal_info};
use crate::error::AppError;

pub const DEFAULT_FEED_LIMIT: usize = 6;
pub const BIO_PREVIEW_CHARS: usize = 200;

/// One entry of the mixed "latest" feed.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct FeedItem {
    pub kind: ContentKind,
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<article::Model> for FeedItem {
    fn from(a: article::Model) -> Self {
        Self {
            kind: ContentKind::Article,
            id: a.id,
            title: a.title,
            summary: a.excerpt,
            image_url: a.image_url,
            created_at: a.created_at,
        }
    }
}

impl From<companies::CompanyWithFounders> for FeedItem {
    fn from(c: companies::CompanyWithFounders) -> Self {
        let company = c.company;
        Self {
            kind: ContentKind::Company,
            id: company.id,
            title: company.name,
            summary: company.description,
            image_url: company.logo_url,
            created_at: company.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AboutPage {
    pub personal_info: Option<personal_info::Model>,
    pub bio_preview: Option<String>,
    pub experiences: Vec<experience::Model>,
}

/// Newest first across both inputs, truncated to `limit`.
pub fn merge_by_date(articles: Vec<FeedItem>, companies: Vec<FeedItem>, limit: usize) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = articles.into_iter().chain(companies).collect();
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    items.truncate(limit);
    items
}

/// First `max_chars` characters, with `...` appended when anything was cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub async fn latest(store: &Store, limit: usize) -> Result<Vec<FeedItem>, AppError> {
    let articles = articles::list(store, StatusFilter::Published).await?;
    let companies = companies::list(store, StatusFilter::Published).await?;
    Ok(merge_by_date(
        articles.into_iter().map(FeedItem::from).collect(),
        companies.into_iter().map(FeedItem::from).collect(),
        limit,
    ))
}

pub async fn about(store: &Store) -> Result<AboutPage, AppError> {
    let personal_info = profile::personal_info(store).await?;
    let bio_preview = personal_info.as_ref().map(|p| preview(&p.bio, BIO_PREVIEW_CHARS));
    Ok(AboutPage {
        personal_info,
        bio_preview,
        experiences: experiences::list(store).await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(kind: ContentKind, title: &str, day: u32) -> FeedItem {
        FeedItem {
            kind,
            id: Uuid::new_v4(),
            title: title.to_string(),
            summary: String::new(),
            image_url: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn merges_newest_first_and_truncates() {
        let articles = vec![item(ContentKind::Article, "a3", 3), item(ContentKind::Article, "a1", 1)];
        let companies = vec![item(ContentKind::Company, "c4", 4), item(ContentKind::Company, "c2", 2)];

        let merged = merge_by_date(articles, companies, 3);
        let titles: Vec<&str> = merged.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["c4", "a3", "c2"]);
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let bio = "م".repeat(250);
        let short = preview(&bio, 200);
        assert_eq!(short.chars().count(), 203);
        assert!(short.ends_with("..."));

        assert_eq!(preview("نبذة", 200), "نبذة");
    }
}
