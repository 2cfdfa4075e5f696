//! Image uploads. Files land either on local disk (served back under
//! `/media`) or in a Supabase storage bucket; callers only see the public URL.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::StorageBackend;
use crate::error::AppError;

#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Stores `bytes` under a fresh unique name and returns its public URL.
    async fn upload(
        &self,
        bucket: &str,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, AppError>;
}

pub fn from_config(backend: &StorageBackend) -> Arc<dyn ObjectStorage> {
    match backend {
        StorageBackend::Local { dir, public_url } => Arc::new(LocalStorage::new(dir.clone(), public_url.clone())),
        StorageBackend::Supabase { url, service_key } => {
            Arc::new(SupabaseStorage::new(url.clone(), service_key.clone()))
        }
    }
}

pub fn validate_bucket(bucket: &str) -> Result<(), AppError> {
    let valid = !bucket.is_empty()
        && bucket
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidRequest(format!("Invalid bucket name: {}", bucket)))
    }
}

/// Extension for the stored object: taken from the uploaded file name,
/// otherwise guessed from the content type, otherwise `bin`.
fn extension(file_name: &str, content_type: Option<&str>) -> String {
    let from_name = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return ext;
    }
    match content_type {
        Some("image/jpeg") => "jpg",
        Some("image/png") => "png",
        Some("image/gif") => "gif",
        Some("image/webp") => "webp",
        Some("image/svg+xml") => "svg",
        _ => "bin",
    }
    .to_string()
}

fn object_name(file_name: &str, content_type: Option<&str>) -> String {
    format!("{}.{}", Uuid::new_v4(), extension(file_name, content_type))
}

pub struct LocalStorage {
    root: PathBuf,
    public_url: String,
}

impl LocalStorage {
    pub fn new(root: PathBuf, public_url: String) -> Self {
        Self {
            root,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        bucket: &str,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        validate_bucket(bucket)?;
        let name = object_name(file_name, content_type);

        let dir = self.root.join(bucket);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), bytes).await?;

        Ok(format!("{}/{}/{}", self.public_url, bucket, name))
    }
}

pub struct SupabaseStorage {
    client: reqwest::Client,
    url: String,
    service_key: String,
}

impl SupabaseStorage {
    pub fn new(url: String, service_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            service_key,
        }
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    #[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload(
        &self,
        bucket: &str,
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, AppError> {
        validate_bucket(bucket)?;
        let name = object_name(file_name, content_type);

        let response = self
            .client
            .post(format!("{}/storage/v1/object/{}/{}", self.url, bucket, name))
            .bearer_auth(&self.service_key)
            .header(
                reqwest::header::CONTENT_TYPE,
                content_type.unwrap_or("application/octet-stream"),
            )
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, bucket, "storage upload rejected: {}", body);
            return Err(AppError::Upstream(format!("storage upload failed with {}: {}", status, body)));
        }

        Ok(format!("{}/storage/v1/object/public/{}/{}", self.url, bucket, name))
    }
}
