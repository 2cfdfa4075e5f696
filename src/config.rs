use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use tracing::warn;
use url::Url;

use crate::error::AppError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./journeys.sqlite?mode=rwc";
pub const DEFAULT_FROM_ADDRESS: &str = "noreply@example.com";
pub const DEFAULT_FROM_NAME: &str = "نشرة الموقع";
pub const DEFAULT_SITE_URL: &str = "https://your-site.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Local { dir: PathBuf, public_url: String },
    Supabase { url: String, service_key: String },
}

/// Sender identity and link target used in every newsletter email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub from_address: String,
    pub from_name: String,
    pub site_url: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub admin_token: Option<String>,
    /// `None` means the email provider is not configured; dispatch answers 500.
    pub sendgrid_api_key: Option<String>,
    pub mail: MailSettings,
    pub storage: StorageBackend,
    pub newsletter_concurrency: usize,
    pub newsletter_max_retry: Duration,
    pub rate_limit_per_minute: Option<u32>,
    pub cache_ttl: Duration,
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let site_url = var("SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
        Url::parse(&site_url)
            .map_err(|e| AppError::Configuration(format!("SITE_URL is not a valid URL ({}): {}", site_url, e)))?;

        let storage = match var("STORAGE_BACKEND").as_deref() {
            Some("supabase") => StorageBackend::Supabase {
                url: var("SUPABASE_URL")
                    .ok_or_else(|| AppError::Configuration("SUPABASE_URL must be set for supabase storage".to_string()))?,
                service_key: var("SUPABASE_SERVICE_KEY").ok_or_else(|| {
                    AppError::Configuration("SUPABASE_SERVICE_KEY must be set for supabase storage".to_string())
                })?,
            },
            Some("local") | None => StorageBackend::Local {
                dir: PathBuf::from(var("STORAGE_DIR").unwrap_or_else(|| "./media".to_string())),
                public_url: var("PUBLIC_MEDIA_URL").unwrap_or_else(|| "http://127.0.0.1:3000/media".to_string()),
            },
            Some(other) => {
                return Err(AppError::Configuration(format!("Unknown STORAGE_BACKEND: {}", other)));
            }
        };

        let sendgrid_api_key = var("SENDGRID_API_KEY");
        if sendgrid_api_key.is_none() {
            warn!("SENDGRID_API_KEY not set; newsletter dispatch will be rejected");
        }

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string()),
            admin_token: var("ADMIN_TOKEN"),
            sendgrid_api_key,
            mail: MailSettings {
                from_address: var("EMAIL_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
                from_name: var("EMAIL_FROM_NAME").unwrap_or_else(|| DEFAULT_FROM_NAME.to_string()),
                site_url,
            },
            storage,
            newsletter_concurrency: parse_or("NEWSLETTER_CONCURRENCY", var("NEWSLETTER_CONCURRENCY"), 10usize).max(1),
            newsletter_max_retry: Duration::from_secs(parse_or(
                "NEWSLETTER_MAX_RETRY_SECS",
                var("NEWSLETTER_MAX_RETRY_SECS"),
                30u64,
            )),
            rate_limit_per_minute: var("RATE_LIMIT_PER_MINUTE")
                .map(|raw| parse_or("RATE_LIMIT_PER_MINUTE", Some(raw), 30u32))
                .filter(|limit| *limit > 0),
            cache_ttl: Duration::from_secs(parse_or("CACHE_TTL_SECS", var("CACHE_TTL_SECS"), 60u64)),
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match raw {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}; using default {default}");
            default
        }),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            admin_token: None,
            sendgrid_api_key: None,
            mail: MailSettings {
                from_address: DEFAULT_FROM_ADDRESS.to_string(),
                from_name: DEFAULT_FROM_NAME.to_string(),
                site_url: DEFAULT_SITE_URL.to_string(),
            },
            storage: StorageBackend::Local {
                dir: PathBuf::from("./media"),
                public_url: "http://127.0.0.1:3000/media".to_string(),
            },
            newsletter_concurrency: 10,
            newsletter_max_retry: Duration::from_secs(30),
            rate_limit_per_minute: None,
            cache_ttl: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, AppError> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.mail.from_name, DEFAULT_FROM_NAME);
        assert_eq!(config.mail.site_url, DEFAULT_SITE_URL);
        assert!(config.sendgrid_api_key.is_none());
        assert!(config.rate_limit_per_minute.is_none());
        assert_eq!(config.newsletter_concurrency, 10);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = config_from(&[("NEWSLETTER_CONCURRENCY", "many"), ("CACHE_TTL_SECS", "-3")]).unwrap();
        assert_eq!(config.newsletter_concurrency, 10);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = config_from(&[("SENDGRID_API_KEY", "   ")]).unwrap();
        assert!(config.sendgrid_api_key.is_none());
    }

    #[test]
    fn rejects_bad_site_url() {
        let err = config_from(&[("SITE_URL", "not a url")]).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn supabase_storage_requires_credentials() {
        let err = config_from(&[("STORAGE_BACKEND", "supabase")]).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));

        let config = config_from(&[
            ("STORAGE_BACKEND", "supabase"),
            ("SUPABASE_URL", "https://abc.supabase.co"),
            ("SUPABASE_SERVICE_KEY", "secret"),
        ])
        .unwrap();
        assert!(matches!(config.storage, StorageBackend::Supabase { .. }));
    }
}
