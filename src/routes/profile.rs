use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::entities::{personal_info, site_settings};
use crate::error::AppError;
use crate::store::feed::{self, AboutPage};
use crate::store::profile::{self, PersonalInfoInput, SiteSettingsInput};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/personal-info",
    responses((status = 200, description = "Site owner's profile, or null before it is first saved", body = Option<personal_info::Model>)),
    tag = "profile"
)]
pub async fn get_personal_info(State(state): State<AppState>) -> Result<Json<Option<personal_info::Model>>, AppError> {
    Ok(Json(profile::personal_info(&state.store).await?))
}

#[utoipa::path(
    get,
    path = "/site-settings",
    responses((status = 200, description = "Site settings, or null before they are first saved", body = Option<site_settings::Model>)),
    tag = "profile"
)]
pub async fn get_site_settings(State(state): State<AppState>) -> Result<Json<Option<site_settings::Model>>, AppError> {
    Ok(Json(profile::site_settings(&state.store).await?))
}

#[utoipa::path(
    get,
    path = "/about",
    responses((status = 200, description = "Profile with a short bio and the experience list", body = AboutPage)),
    tag = "profile"
)]
pub async fn about(State(state): State<AppState>) -> Result<Json<AboutPage>, AppError> {
    Ok(Json(feed::about(&state.store).await?))
}

/// Create or update the profile. Omitted fields keep their stored value.
#[utoipa::path(
    put,
    path = "/admin/personal-info",
    request_body = PersonalInfoInput,
    responses((status = 200, description = "Saved profile", body = personal_info::Model)),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state, input))]
pub async fn save_personal_info(
    State(state): State<AppState>,
    input: Result<Json<PersonalInfoInput>, JsonRejection>,
) -> Result<Json<personal_info::Model>, AppError> {
    let Json(input) = input?;
    Ok(Json(profile::save_personal_info(&state.store, input).await?))
}

#[utoipa::path(
    put,
    path = "/admin/site-settings",
    request_body = SiteSettingsInput,
    responses((status = 200, description = "Saved settings", body = site_settings::Model)),
    security(("admin_token" = [])),
    tag = "admin"
)]
#[tracing::instrument(skip(state, input))]
pub async fn save_site_settings(
    State(state): State<AppState>,
    input: Result<Json<SiteSettingsInput>, JsonRejection>,
) -> Result<Json<site_settings::Model>, AppError> {
    let Json(input) = input?;
    Ok(Json(profile::save_site_settings(&state.store, input).await?))
}
