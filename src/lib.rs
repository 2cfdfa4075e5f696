pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod newsletter;
pub mod routes;
pub mod storage;
pub mod store;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::cache::{InMemoryCache, QueryCache};
use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::newsletter::{Dispatcher, EmailSender, SendGridSender};
use crate::storage::ObjectStorage;
use crate::store::Store;

const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Everything a request handler needs.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub storage: Arc<dyn ObjectStorage>,
    /// `None` when no email provider is configured.
    pub dispatcher: Option<Arc<Dispatcher>>,
    pub admin_token: Option<String>,
    /// Directory served under `/media` when images are stored locally.
    pub media_dir: Option<PathBuf>,
    pub rate_limit_per_minute: Option<u32>,
}

impl AppState {
    pub fn new(store: Store, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            store,
            storage,
            dispatcher: None,
            admin_token: None,
            media_dir: None,
            rate_limit_per_minute: None,
        }
    }

    /// Wires the store, storage backend and (when an API key is present) the
    /// SendGrid dispatcher from `config`.
    pub fn from_config(config: &Config, db: DatabaseConnection) -> Self {
        let cache: Arc<dyn QueryCache> = Arc::new(InMemoryCache::new(config.cache_ttl));
        let store = Store::new(db.clone(), cache);

        let dispatcher = config.sendgrid_api_key.as_ref().map(|key| {
            let sender: Arc<dyn EmailSender> = Arc::new(SendGridSender::new(key.clone(), config.mail.clone()));
            Arc::new(Dispatcher::from_config(sender, config, db.clone()))
        });

        let media_dir = match &config.storage {
            StorageBackend::Local { dir, .. } => Some(dir.clone()),
            StorageBackend::Supabase { .. } => None,
        };

        if config.admin_token.is_none() {
            tracing::warn!("ADMIN_TOKEN not set; admin routes will refuse every request");
        }

        Self {
            store,
            storage: storage::from_config(&config.storage),
            dispatcher,
            admin_token: config.admin_token.clone(),
            media_dir,
            rate_limit_per_minute: config.rate_limit_per_minute,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }

    pub fn dispatcher(&self) -> Result<Arc<Dispatcher>, AppError> {
        self.dispatcher.clone().ok_or_else(|| {
            tracing::error!("newsletter requested but SENDGRID_API_KEY is not set");
            AppError::Configuration(newsletter::NOT_CONFIGURED.to_string())
        })
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "Service is healthy")
}

struct AdminTokenScheme;

impl Modify for AdminTokenScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "admin_token",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Journeys API",
        version = "0.1.0",
        description = "Articles, company journeys, profile and newsletter for a bilingual personal site"
    ),
    paths(
        health_check,
        routes::articles::list_published,
        routes::articles::get_published,
        routes::articles::list,
        routes::articles::get,
        routes::articles::create,
        routes::articles::update,
        routes::articles::delete,
        routes::articles::announce,
        routes::companies::list_published,
        routes::companies::get_published,
        routes::companies::list,
        routes::companies::get,
        routes::companies::create,
        routes::companies::update,
        routes::companies::delete,
        routes::companies::announce,
        routes::experiences::list,
        routes::experiences::get,
        routes::experiences::create,
        routes::experiences::update,
        routes::experiences::delete,
        routes::profile::get_personal_info,
        routes::profile::get_site_settings,
        routes::profile::about,
        routes::profile::save_personal_info,
        routes::profile::save_site_settings,
        routes::feed::latest,
        routes::subscribers::subscribe,
        routes::subscribers::list,
        routes::subscribers::get,
        routes::subscribers::update_status,
        routes::subscribers::delete,
        routes::uploads::upload,
        routes::newsletter::send
    ),
    components(schemas(
        entities::PublishStatus,
        entities::SubscriberStatus,
        entities::ContentKind,
        store::StatusFilter,
        store::articles::NewArticle,
        store::articles::ArticlePatch,
        store::companies::NewCompany,
        store::companies::CompanyPatch,
        store::companies::FounderInput,
        store::experiences::NewExperience,
        store::experiences::ExperiencePatch,
        store::profile::PersonalInfoInput,
        store::profile::SiteSettingsInput,
        store::subscribers::Subscription,
        routes::subscribers::StatusChange,
        routes::uploads::UploadResponse,
        newsletter::NewsletterPayload,
        newsletter::NewsletterResponse,
        newsletter::Recipient
    )),
    modifiers(&AdminTokenScheme)
)]
pub struct ApiDoc;

fn public_routes() -> Router<AppState> {
    use routes::{articles, companies, experiences, feed, profile};

    Router::new()
        .route("/health", get(health_check))
        .route("/articles", get(articles::list_published))
        .route("/articles/{id}", get(articles::get_published))
        .route("/companies", get(companies::list_published))
        .route("/companies/{id}", get(companies::get_published))
        .route("/experiences", get(experiences::list))
        .route("/personal-info", get(profile::get_personal_info))
        .route("/site-settings", get(profile::get_site_settings))
        .route("/feed", get(feed::latest))
        .route("/about", get(profile::about))
}

fn subscribe_routes() -> Router<AppState> {
    Router::new().route("/newsletter/subscribe", post(routes::subscribers::subscribe))
}

/// Sets its own CORS headers, so it stays outside the app-wide `CorsLayer`.
fn newsletter_routes() -> Router<AppState> {
    use routes::newsletter;

    Router::new().route(
        "/send-newsletter",
        post(newsletter::send)
            .options(newsletter::preflight)
            .fallback(newsletter::method_not_allowed),
    )
}

fn admin_routes(state: AppState) -> Router<AppState> {
    use routes::{articles, companies, experiences, profile, subscribers, uploads};

    Router::new()
        .route("/articles", get(articles::list).post(articles::create))
        .route(
            "/articles/{id}",
            get(articles::get).patch(articles::update).delete(articles::delete),
        )
        .route("/articles/{id}/announce", post(articles::announce))
        .route("/companies", get(companies::list).post(companies::create))
        .route(
            "/companies/{id}",
            get(companies::get).put(companies::update).delete(companies::delete),
        )
        .route("/companies/{id}/announce", post(companies::announce))
        .route("/experiences", get(experiences::list).post(experiences::create))
        .route(
            "/experiences/{id}",
            get(experiences::get)
                .patch(experiences::update)
                .delete(experiences::delete),
        )
        .route("/personal-info", put(profile::save_personal_info))
        .route("/site-settings", put(profile::save_site_settings))
        .route("/subscribers", get(subscribers::list))
        .route(
            "/subscribers/{id}",
            get(subscribers::get)
                .patch(subscribers::update_status)
                .delete(subscribers::delete),
        )
        .route(
            "/uploads/{bucket}",
            post(uploads::upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route_layer(middleware::from_fn_with_state(state, routes::auth::require_admin))
}

/// Create the application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let api_doc = ApiDoc::openapi();
    let docs_router = SwaggerUi::new("/docs").url("/api-doc/openapi.json", api_doc);

    let mut subscribe = subscribe_routes();
    let mut newsletter = newsletter_routes();
    // Opt-in, so local runs and tests are never throttled.
    if let Some(per_minute) = state.rate_limit_per_minute.and_then(NonZeroU32::new) {
        let period = Duration::from_millis(60_000 / u64::from(per_minute.get()));
        match GovernorConfigBuilder::default()
            .key_extractor(SmartIpKeyExtractor)
            .period(period)
            .burst_size(per_minute.get())
            .finish()
        {
            Some(governor_conf) => {
                tracing::info!(per_minute = per_minute.get(), "rate limiting public write routes");
                let governor = GovernorLayer {
                    config: Arc::new(governor_conf),
                };
                subscribe = subscribe.layer(governor.clone());
                newsletter = newsletter.layer(governor);
            }
            None => tracing::warn!(per_minute = per_minute.get(), "invalid rate limit; not applied"),
        }
    }

    let mut api = Router::new()
        .merge(public_routes())
        .merge(subscribe)
        .nest("/admin", admin_routes(state.clone()));
    if let Some(dir) = &state.media_dir {
        api = api.nest_service("/media", ServeDir::new(dir));
    }
    let api = api.merge(docs_router).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    api.merge(newsletter)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
