use async_trait::async_trait;
use serde_json::json;
use std::fmt;

use super::compose::Email;
use crate::config::MailSettings;

pub const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Why one email could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Worth retrying: network failure, 429 or 5xx.
    Transient(String),
    Permanent(String),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Transient(msg) => write!(f, "transient: {}", msg),
            SendError::Permanent(msg) => write!(f, "permanent: {}", msg),
        }
    }
}

impl std::error::Error for SendError {}

impl SendError {
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let msg = format!("email provider error: {} - {}", status.as_u16(), body);
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            SendError::Transient(msg)
        } else {
            SendError::Permanent(msg)
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync + 'static {
    async fn send(&self, email: &Email) -> Result<(), SendError>;
}

pub struct SendGridSender {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    mail: MailSettings,
}

impl SendGridSender {
    pub fn new(api_key: String, mail: MailSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: SENDGRID_ENDPOINT.to_string(),
            mail,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(&self, email: &Email) -> serde_json::Value {
        json!({
            "personalizations": [{
                "to": [{ "email": email.to.email, "name": email.to.name }],
                "subject": email.subject,
            }],
            "from": { "email": self.mail.from_address, "name": self.mail.from_name },
            "reply_to": { "email": self.mail.from_address },
            "content": [
                { "type": "text/plain", "value": email.text },
                { "type": "text/html", "value": email.html },
            ],
        })
    }
}

#[async_trait]
impl EmailSender for SendGridSender {
    async fn send(&self, email: &Email) -> Result<(), SendError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.payload(email))
            .send()
            .await
            .map_err(|e| SendError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(SendError::from_status(status, &body))
    }
}
