//! Fan-out of one newsletter to its recipients.
//!
//! Sends run with bounded concurrency. Each recipient is retried with
//! exponential backoff while the provider reports transient failures, and
//! every outcome is recorded in `newsletter_deliveries` when a database is
//! attached. A failed recipient never fails the batch.

use backoff::future::retry_notify;
use backoff::Error as BackoffError;
use backoff::ExponentialBackoffBuilder;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::compose::Composer;
use super::sender::{EmailSender, SendError};
use super::Recipient;
use crate::config::{Config, MailSettings};
use crate::entities::{newsletter_delivery, ContentKind, DeliveryStatus, NewsletterDelivery};
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub recipient: Recipient,
    pub status: DeliveryStatus,
    pub attempts: u32,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub batch_id: Uuid,
    pub sent: usize,
    pub failed: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

pub struct Dispatcher {
    sender: Arc<dyn EmailSender>,
    mail: MailSettings,
    concurrency: usize,
    max_retry: Duration,
    db: Option<DatabaseConnection>,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn EmailSender>, mail: MailSettings) -> Self {
        Self {
            sender,
            mail,
            concurrency: 10,
            max_retry: Duration::from_secs(30),
            db: None,
        }
    }

    /// Concurrency and retry budget from `config`, deliveries recorded in `db`.
    pub fn from_config(sender: Arc<dyn EmailSender>, config: &Config, db: DatabaseConnection) -> Self {
        Self::new(sender, config.mail.clone())
            .with_concurrency(config.newsletter_concurrency)
            .with_max_retry(config.newsletter_max_retry)
            .with_delivery_log(db)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_retry(mut self, max_retry: Duration) -> Self {
        self.max_retry = max_retry;
        self
    }

    pub fn with_delivery_log(mut self, db: DatabaseConnection) -> Self {
        self.db = Some(db);
        self
    }

    #[tracing::instrument(skip(self, content, recipients), fields(recipients = recipients.len()))]
    pub async fn dispatch(
        &self,
        kind: ContentKind,
        title: &str,
        content: &str,
        recipients: Vec<Recipient>,
    ) -> DispatchReport {
        let batch_id = Uuid::new_v4();
        let composer = Composer::new(kind, title, content, &self.mail);
        tracing::info!(%batch_id, subject = composer.subject(), "sending newsletter");

        let composer = &composer;
        let outcomes: Vec<DeliveryOutcome> = stream::iter(recipients)
            .map(move |recipient| self.deliver(composer, recipient))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let sent = outcomes.iter().filter(|o| o.status == DeliveryStatus::Sent).count();
        let failed = outcomes.len() - sent;
        tracing::info!(%batch_id, sent, failed, "newsletter finished");

        if let Some(db) = &self.db {
            if let Err(e) = record(db, batch_id, kind, title, &outcomes).await {
                tracing::error!(%batch_id, "could not record newsletter deliveries: {}", e);
            }
        }

        DispatchReport {
            batch_id,
            sent,
            failed,
            outcomes,
        }
    }

    async fn deliver(&self, composer: &Composer, recipient: Recipient) -> DeliveryOutcome {
        let email = match composer.render(&recipient) {
            Ok(email) => email,
            Err(e) => {
                tracing::error!(email = %recipient.email, "could not render newsletter: {}", e);
                return DeliveryOutcome {
                    recipient,
                    status: DeliveryStatus::Failed,
                    attempts: 0,
                    error: Some(e.to_string()),
                };
            }
        };

        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(250))
            .with_max_elapsed_time(Some(self.max_retry))
            .build();

        let attempts = AtomicU32::new(0);
        let (sender, email_ref, counter) = (&self.sender, &email, &attempts);
        let result = retry_notify(
            backoff,
            move || async move {
                counter.fetch_add(1, Ordering::Relaxed);
                sender.send(email_ref).await.map_err(|e| match e {
                    SendError::Transient(_) => BackoffError::transient(e),
                    SendError::Permanent(_) => BackoffError::permanent(e),
                })
            },
            |err: SendError, wait: Duration| {
                tracing::warn!(
                    email = %email_ref.to.email,
                    "send failed: {}. Retrying in {:.1}s...",
                    err,
                    wait.as_secs_f64()
                );
            },
        )
        .await;

        let attempts = attempts.load(Ordering::Relaxed);
        match result {
            Ok(()) => {
                tracing::debug!(email = %recipient.email, attempts, "email sent");
                DeliveryOutcome {
                    recipient,
                    status: DeliveryStatus::Sent,
                    attempts,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(email = %recipient.email, attempts, "failed to send newsletter: {}", e);
                DeliveryOutcome {
                    recipient,
                    status: DeliveryStatus::Failed,
                    attempts,
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

async fn record(
    db: &DatabaseConnection,
    batch_id: Uuid,
    kind: ContentKind,
    title: &str,
    outcomes: &[DeliveryOutcome],
) -> Result<(), AppError> {
    if outcomes.is_empty() {
        return Ok(());
    }
    let now = Utc::now();
    let rows = outcomes.iter().map(|o| newsletter_delivery::ActiveModel {
        id: Set(Uuid::new_v4()),
        batch_id: Set(batch_id),
        kind: Set(kind),
        title: Set(title.to_string()),
        email: Set(o.recipient.email.clone()),
        name: Set(o.recipient.name.clone()),
        status: Set(o.status),
        attempts: Set(o.attempts as i32),
        error: Set(o.error.clone()),
        created_at: Set(now),
    });
    NewsletterDelivery::insert_many(rows).exec_without_returning(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newsletter::compose::Email;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Fails the first `transient_failures` calls per recipient, then succeeds.
    /// Recipients whose address starts with `bad` always fail permanently.
    #[derive(Default)]
    struct FlakySender {
        transient_failures: u32,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmailSender for FlakySender {
        async fn send(&self, email: &Email) -> Result<(), SendError> {
            let seen = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(email.to.email.clone());
                calls.iter().filter(|c| **c == email.to.email).count() as u32
            };
            if email.to.email.starts_with("bad") {
                return Err(SendError::Permanent("400 - invalid address".to_string()));
            }
            if seen <= self.transient_failures {
                return Err(SendError::Transient("503".to_string()));
            }
            Ok(())
        }
    }

    fn mail() -> MailSettings {
        MailSettings {
            from_address: "news@example.com".to_string(),
            from_name: "نشرة".to_string(),
            site_url: "https://example.com".to_string(),
        }
    }

    fn recipients(emails: &[&str]) -> Vec<Recipient> {
        emails
            .iter()
            .map(|e| Recipient {
                email: e.to_string(),
                name: "قارئ".to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let sender = Arc::new(FlakySender {
            transient_failures: 1,
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(sender.clone(), mail()).with_max_retry(Duration::from_secs(10));

        let report = dispatcher
            .dispatch(ContentKind::Article, "t", "c", recipients(&["a@x.com"]))
            .await;

        assert_eq!((report.sent, report.failed), (1, 0));
        assert_eq!(report.outcomes[0].attempts, 2);
        assert_eq!(sender.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let sender = Arc::new(FlakySender::default());
        let dispatcher = Dispatcher::new(sender.clone(), mail()).with_concurrency(2);

        let report = dispatcher
            .dispatch(ContentKind::Company, "t", "c", recipients(&["a@x.com", "bad@x.com", "b@x.com"]))
            .await;

        assert_eq!((report.sent, report.failed), (2, 1));
        let bad = report
            .outcomes
            .iter()
            .find(|o| o.recipient.email == "bad@x.com")
            .unwrap();
        assert_eq!(bad.attempts, 1);
        assert!(bad.error.as_deref().unwrap().contains("invalid address"));
        assert_eq!(sender.calls.lock().unwrap().len(), 3);
    }
}
