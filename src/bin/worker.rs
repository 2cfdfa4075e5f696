use anyhow::{bail, Context};
use journeys::cache::NoCache;
use journeys::config::Config;
use journeys::db;
use journeys::newsletter::{self, Dispatcher, NewsletterResponse, SendGridSender};
use journeys::store::Store;
use std::env;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

const USAGE: &str = "usage: journeys-worker [--migrate] [--announce-article <id>] [--announce-company <id>]";

#[derive(Debug, Default, PartialEq)]
struct Flags {
    migrate: bool,
    announce_article: Option<Uuid>,
    announce_company: Option<Uuid>,
}

fn parse_flags(args: &[String]) -> anyhow::Result<Flags> {
    let mut flags = Flags::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--migrate" => flags.migrate = true,
            "--announce-article" | "--announce-company" => {
                let raw = iter.next().with_context(|| format!("{} needs an id", arg))?;
                let id = Uuid::parse_str(raw).with_context(|| format!("invalid id: {}", raw))?;
                if arg == "--announce-article" {
                    flags.announce_article = Some(id);
                } else {
                    flags.announce_company = Some(id);
                }
            }
            other => bail!("unknown argument {}\n{}", other, USAGE),
        }
    }
    Ok(flags)
}

/// Logs the outcome and hands failures back so the process exits non-zero.
fn report(what: &str, result: Result<NewsletterResponse, journeys::error::AppError>) -> anyhow::Result<()> {
    match result {
        Ok(response) => {
            info!(sent = response.sent, failed = response.failed, "{}: {}", what, response.message);
            Ok(())
        }
        Err(e) => {
            error!(%e, "{} failed", what);
            Err(anyhow::Error::new(e).context(format!("{} failed", what)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise tracing (INFO level)
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let _ = dotenvy::dotenv();

    let args: Vec<String> = env::args().skip(1).collect();
    let flags = parse_flags(&args)?;
    if flags == Flags::default() {
        bail!(USAGE);
    }

    let config = Config::from_env()?;
    let conn = db::connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    if flags.migrate {
        db::migrate(&conn).await.context("migration failed")?;
        info!("migrations applied");
    }

    if flags.announce_article.is_none() && flags.announce_company.is_none() {
        return Ok(());
    }

    let api_key = config
        .sendgrid_api_key
        .clone()
        .context(newsletter::NOT_CONFIGURED)?;
    let sender = Arc::new(SendGridSender::new(api_key, config.mail.clone()));
    let dispatcher = Dispatcher::from_config(sender, &config, conn.clone());
    // One-shot process: read straight from the database.
    let store = Store::new(conn, Arc::new(NoCache));

    // Both announcements run; the first failure decides the exit status.
    let mut outcome = Ok(());
    if let Some(id) = flags.announce_article {
        outcome = outcome.and(report(
            "announce article",
            newsletter::announce_article(&store, &dispatcher, id).await,
        ));
    }
    if let Some(id) = flags.announce_company {
        outcome = outcome.and(report(
            "announce company",
            newsletter::announce_company(&store, &dispatcher, id).await,
        ));
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_announce_flags() {
        let id = Uuid::new_v4();
        let flags = parse_flags(&args(&["--migrate", "--announce-company", &id.to_string()])).unwrap();
        assert!(flags.migrate);
        assert_eq!(flags.announce_company, Some(id));
        assert_eq!(flags.announce_article, None);
    }

    #[test]
    fn rejects_missing_or_bad_ids() {
        assert!(parse_flags(&args(&["--announce-article"])).is_err());
        assert!(parse_flags(&args(&["--announce-article", "nope"])).is_err());
        assert!(parse_flags(&args(&["--frobnicate"])).is_err());
    }

    #[test]
    fn failed_announcement_is_an_error() {
        let err = report(
            "announce article",
            Err(journeys::error::AppError::NotFound("Article 1".to_string())),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "announce article failed");
        assert!(format!("{:#}", err).contains("Article 1"));
    }

    #[test]
    fn successful_announcement_is_ok() {
        let response = NewsletterResponse {
            success: true,
            sent: 2,
            failed: 0,
            message: newsletter::summary_message(2, 0),
        };
        assert!(report("announce company", Ok(response)).is_ok());
    }
}
