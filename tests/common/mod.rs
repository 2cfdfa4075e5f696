#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response, Router};
use http_body_util::BodyExt;
use journeys::cache::InMemoryCache;
use journeys::db;
use journeys::newsletter::compose::Email;
use journeys::newsletter::{Dispatcher, EmailSender, SendError};
use journeys::storage::LocalStorage;
use journeys::store::Store;
use journeys::{config::MailSettings, create_app, AppState};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Records every email; addresses in `reject` fail permanently.
#[derive(Default)]
pub struct MockSender {
    pub sent: Mutex<Vec<Email>>,
    pub reject: HashSet<String>,
}

impl MockSender {
    pub fn rejecting(emails: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject: emails.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailSender for MockSender {
    async fn send(&self, email: &Email) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(email.clone());
        if self.reject.contains(&email.to.email) {
            return Err(SendError::Permanent("400 - rejected by provider".to_string()));
        }
        Ok(())
    }
}

pub fn mail_settings() -> MailSettings {
    MailSettings {
        from_address: "news@example.com".to_string(),
        from_name: "نشرة الموقع".to_string(),
        site_url: "https://blog.example.com".to_string(),
    }
}

/// Fresh in-memory database with every migration applied.
pub async fn test_store() -> Store {
    let conn = db::connect("sqlite::memory:").await.unwrap();
    db::migrate(&conn).await.unwrap();
    Store::new(conn, Arc::new(InMemoryCache::new(Duration::from_secs(60))))
}

pub struct TestApp {
    pub state: AppState,
    pub sender: Arc<MockSender>,
    pub media: TempDir,
}

impl TestApp {
    pub fn router(&self) -> Router {
        create_app(self.state.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }
}

pub async fn test_app_with(sender: Option<MockSender>) -> TestApp {
    let store = test_store().await;
    let media = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(
        media.path().to_path_buf(),
        "http://localhost:3000/media".to_string(),
    ));

    let mut state = AppState::new(store.clone(), storage).with_admin_token(ADMIN_TOKEN);
    state.media_dir = Some(media.path().to_path_buf());

    let sender = Arc::new(sender.unwrap_or_default());
    state = state.with_dispatcher(
        Dispatcher::new(sender.clone(), mail_settings())
            .with_max_retry(Duration::from_millis(200))
            .with_delivery_log(store.db.clone()),
    );

    TestApp { state, sender, media }
}

pub async fn test_app() -> TestApp {
    test_app_with(None).await
}

/// An app whose email provider is not configured.
pub async fn test_app_without_email() -> TestApp {
    let mut app = test_app().await;
    app.state.dispatcher = None;
    app
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", ADMIN_TOKEN));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
