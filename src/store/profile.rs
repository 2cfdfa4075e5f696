//! The two single-row tables: personal info and site settings.
//!
//! Saving is one `INSERT .. ON CONFLICT (singleton) DO UPDATE` statement, so
//! concurrent first saves cannot create a second row. On the insert path
//! missing required fields fall back to placeholder values; on the update
//! path only the supplied columns are overwritten.

use chrono::Utc;
use sea_orm::{sea_query::OnConflict, EntityTrait, Set};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::Store;
use crate::entities::{personal_info, site_settings, PersonalInfo, SiteSettings, SINGLETON_KEY};
use crate::error::AppError;

pub const PERSONAL_INFO_PREFIX: &str = "personal_info:";
pub const SITE_SETTINGS_PREFIX: &str = "site_settings:";

pub const DEFAULT_PERSON_NAME: &str = "اسم افتراضي";
pub const DEFAULT_PERSON_TITLE: &str = "مسمى وظيفي";
pub const DEFAULT_PERSON_BIO: &str = "نبذة شخصية";
pub const DEFAULT_SITE_NAME: &str = "اسم الموقع";

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PersonalInfoInput {
    pub name: Option<String>,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SiteSettingsInput {
    pub site_name: Option<String>,
    pub site_description: Option<String>,
    pub contact_email: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub whatsapp_number: Option<String>,
}

pub async fn personal_info(store: &Store) -> Result<Option<personal_info::Model>, AppError> {
    let key = format!("{PERSONAL_INFO_PREFIX}current");
    store
        .cached(&key, move || async move {
            let row = PersonalInfo::find().one(&store.db).await?;
            Ok::<_, AppError>(row)
        })
        .await
}

#[tracing::instrument(skip(store, input))]
pub async fn save_personal_info(store: &Store, input: PersonalInfoInput) -> Result<personal_info::Model, AppError> {
    use personal_info::Column;

    let mut columns = vec![Column::UpdatedAt];
    if input.name.is_some() {
        columns.push(Column::Name);
    }
    if input.title.is_some() {
        columns.push(Column::Title);
    }
    if input.bio.is_some() {
        columns.push(Column::Bio);
    }
    if input.profile_image_url.is_some() {
        columns.push(Column::ProfileImageUrl);
    }

    let now = Utc::now();
    let row = personal_info::ActiveModel {
        id: Set(Uuid::new_v4()),
        singleton: Set(SINGLETON_KEY),
        name: Set(input.name.unwrap_or_else(|| DEFAULT_PERSON_NAME.to_string())),
        title: Set(input.title.unwrap_or_else(|| DEFAULT_PERSON_TITLE.to_string())),
        bio: Set(input.bio.unwrap_or_else(|| DEFAULT_PERSON_BIO.to_string())),
        profile_image_url: Set(input.profile_image_url),
        created_at: Set(now),
        updated_at: Set(now),
    };

    PersonalInfo::insert(row)
        .on_conflict(OnConflict::column(Column::Singleton).update_columns(columns).to_owned())
        .exec_without_returning(&store.db)
        .await?;
    store.cache.invalidate(PERSONAL_INFO_PREFIX).await;

    PersonalInfo::find()
        .one(&store.db)
        .await?
        .ok_or_else(|| AppError::InternalError("personal info missing after save".to_string()))
}

pub async fn site_settings(store: &Store) -> Result<Option<site_settings::Model>, AppError> {
    let key = format!("{SITE_SETTINGS_PREFIX}current");
    store
        .cached(&key, move || async move {
            let row = SiteSettings::find().one(&store.db).await?;
            Ok::<_, AppError>(row)
        })
        .await
}

#[tracing::instrument(skip(store, input))]
pub async fn save_site_settings(store: &Store, input: SiteSettingsInput) -> Result<site_settings::Model, AppError> {
    use site_settings::Column;

    let supplied = [
        (Column::SiteName, input.site_name.is_some()),
        (Column::SiteDescription, input.site_description.is_some()),
        (Column::ContactEmail, input.contact_email.is_some()),
        (Column::LinkedinUrl, input.linkedin_url.is_some()),
        (Column::TwitterUrl, input.twitter_url.is_some()),
        (Column::FacebookUrl, input.facebook_url.is_some()),
        (Column::InstagramUrl, input.instagram_url.is_some()),
        (Column::WhatsappNumber, input.whatsapp_number.is_some()),
    ];
    let mut columns = vec![Column::UpdatedAt];
    columns.extend(supplied.into_iter().filter(|(_, present)| *present).map(|(column, _)| column));

    let now = Utc::now();
    let row = site_settings::ActiveModel {
        id: Set(Uuid::new_v4()),
        singleton: Set(SINGLETON_KEY),
        site_name: Set(input.site_name.unwrap_or_else(|| DEFAULT_SITE_NAME.to_string())),
        site_description: Set(input.site_description),
        contact_email: Set(input.contact_email),
        linkedin_url: Set(input.linkedin_url),
        twitter_url: Set(input.twitter_url),
        facebook_url: Set(input.facebook_url),
        instagram_url: Set(input.instagram_url),
        whatsapp_number: Set(input.whatsapp_number),
        created_at: Set(now),
        updated_at: Set(now),
    };

    SiteSettings::insert(row)
        .on_conflict(OnConflict::column(Column::Singleton).update_columns(columns).to_owned())
        .exec_without_returning(&store.db)
        .await?;
    store.cache.invalidate(SITE_SETTINGS_PREFIX).await;

    SiteSettings::find()
        .one(&store.db)
        .await?
        .ok_or_else(|| AppError::InternalError("site settings missing after save".to_string()))
}
