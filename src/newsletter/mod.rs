//! Newsletter emails announcing new articles and company journeys.

pub mod compose;
pub mod dispatch;
pub mod sender;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{ContentKind, PublishStatus};
use crate::error::AppError;
use crate::store::{articles, companies, subscribers, Store};

pub use dispatch::{DeliveryOutcome, DispatchReport, Dispatcher};
pub use sender::{EmailSender, SendError, SendGridSender};

pub const MISSING_FIELDS: &str = "Missing required fields: title, content, or type";
pub const NO_SUBSCRIBERS: &str = "لا يوجد مشتركون في النشرة البريدية";
pub const NOT_CONFIGURED: &str = "Email provider API key not configured";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Recipient {
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Body of `POST /send-newsletter`. Every field is optional at the wire
/// level so missing ones can be reported with a single message.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NewsletterPayload {
    pub title: Option<String>,
    pub content: Option<String>,
    /// `article` or `company`
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub subscribers: Option<Vec<Recipient>>,
}

/// A payload that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsletterRequest {
    pub title: String,
    pub content: String,
    pub kind: ContentKind,
    pub subscribers: Vec<Recipient>,
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|v| !v.trim().is_empty())
}

impl NewsletterPayload {
    pub fn validate(self) -> Result<NewsletterRequest, AppError> {
        let (Some(title), Some(content), Some(kind)) =
            (present(self.title), present(self.content), present(self.kind))
        else {
            return Err(AppError::InvalidRequest(MISSING_FIELDS.to_string()));
        };
        let kind = ContentKind::parse(&kind).ok_or_else(|| {
            AppError::InvalidRequest(format!("Invalid type '{}': expected 'article' or 'company'", kind))
        })?;

        let subscribers = self.subscribers.unwrap_or_default();
        if subscribers.is_empty() {
            return Err(AppError::InvalidRequest(NO_SUBSCRIBERS.to_string()));
        }

        Ok(NewsletterRequest {
            title,
            content,
            kind,
            subscribers,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewsletterResponse {
    pub success: bool,
    pub sent: usize,
    pub failed: usize,
    pub message: String,
}

impl From<&DispatchReport> for NewsletterResponse {
    fn from(report: &DispatchReport) -> Self {
        Self {
            success: true,
            sent: report.sent,
            failed: report.failed,
            message: summary_message(report.sent, report.failed),
        }
    }
}

pub fn summary_message(sent: usize, failed: usize) -> String {
    let mut message = format!("تم إرسال النشرة البريدية بنجاح إلى {} مشترك", sent);
    if failed > 0 {
        message.push_str(&format!(" وفشل في إرسالها إلى {} مشترك", failed));
    }
    message
}

/// Sends `title`/`content` to every active subscriber.
#[tracing::instrument(skip(store, dispatcher, content))]
pub async fn announce(
    store: &Store,
    dispatcher: &Dispatcher,
    title: &str,
    content: &str,
    kind: ContentKind,
) -> Result<NewsletterResponse, AppError> {
    let recipients: Vec<Recipient> = subscribers::list_active(store)
        .await?
        .into_iter()
        .map(|s| Recipient {
            email: s.email,
            name: s.name,
        })
        .collect();
    if recipients.is_empty() {
        return Err(AppError::InvalidRequest(NO_SUBSCRIBERS.to_string()));
    }

    let report = dispatcher.dispatch(kind, title, content, recipients).await;
    Ok(NewsletterResponse::from(&report))
}

/// Announces a published article; the email body comes from its content, or its excerpt.
pub async fn announce_article(store: &Store, dispatcher: &Dispatcher, id: Uuid) -> Result<NewsletterResponse, AppError> {
    let article = articles::get(store, id).await?;
    if article.status != PublishStatus::Published {
        return Err(AppError::InvalidRequest("Only published articles can be announced".to_string()));
    }
    let content = article.content.as_deref().unwrap_or(&article.excerpt);
    announce(store, dispatcher, &article.title, content, ContentKind::Article).await
}

pub async fn announce_company(store: &Store, dispatcher: &Dispatcher, id: Uuid) -> Result<NewsletterResponse, AppError> {
    let found = companies::get(store, id).await?;
    let company = found.company;
    if company.status != PublishStatus::Published {
        return Err(AppError::InvalidRequest("Only published companies can be announced".to_string()));
    }
    let content = company.content.as_deref().unwrap_or(&company.description);
    announce(store, dispatcher, &company.name, content, ContentKind::Company).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str, content: &str, kind: &str, emails: &[&str]) -> NewsletterPayload {
        NewsletterPayload {
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            kind: Some(kind.to_string()),
            subscribers: Some(
                emails
                    .iter()
                    .map(|e| Recipient {
                        email: e.to_string(),
                        name: "n".to_string(),
                    })
                    .collect(),
            ),
        }
    }

    #[test]
    fn summary_mentions_failures_only_when_present() {
        assert_eq!(summary_message(3, 0), "تم إرسال النشرة البريدية بنجاح إلى 3 مشترك");
        assert_eq!(
            summary_message(2, 1),
            "تم إرسال النشرة البريدية بنجاح إلى 2 مشترك وفشل في إرسالها إلى 1 مشترك"
        );
    }

    #[test]
    fn blank_fields_are_missing() {
        let err = payload(" ", "c", "article", &["a@b.c"]).validate().unwrap_err();
        assert_eq!(err.to_string(), MISSING_FIELDS);

        let mut no_kind = payload("t", "c", "article", &["a@b.c"]);
        no_kind.kind = None;
        assert_eq!(no_kind.validate().unwrap_err().to_string(), MISSING_FIELDS);
    }

    #[test]
    fn fields_are_checked_before_subscribers() {
        let err = payload("", "c", "article", &[]).validate().unwrap_err();
        assert_eq!(err.to_string(), MISSING_FIELDS);

        let err = payload("t", "c", "article", &[]).validate().unwrap_err();
        assert_eq!(err.to_string(), NO_SUBSCRIBERS);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = payload("t", "c", "podcast", &["a@b.c"]).validate().unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[test]
    fn valid_payload_parses_kind() {
        let request = payload("t", "c", "company", &["a@b.c"]).validate().unwrap();
        assert_eq!(request.kind, ContentKind::Company);
        assert_eq!(request.subscribers.len(), 1);
    }
}
