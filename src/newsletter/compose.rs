use askama::Template;
use once_cell::sync::Lazy;
use regex::Regex;

use super::Recipient;
use crate::config::MailSettings;
use crate::entities::ContentKind;
use crate::error::AppError;

pub const EXCERPT_CHARS: usize = 300;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static regex"));

/// A fully rendered email for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: Recipient,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Template)]
#[template(path = "newsletter.html")]
struct HtmlBody<'a> {
    subject: &'a str,
    label: &'a str,
    intro: &'a str,
    name: &'a str,
    title: &'a str,
    excerpt: &'a str,
    site_url: &'a str,
}

#[derive(Template)]
#[template(path = "newsletter.txt")]
struct TextBody<'a> {
    intro: &'a str,
    name: &'a str,
    title: &'a str,
    excerpt: &'a str,
    site_url: &'a str,
}

pub fn label(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Article => "مقال جديد",
        ContentKind::Company => "رحلة شركة جديدة",
    }
}

fn intro(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Article => "تم نشر مقال جديد بعنوان:",
        ContentKind::Company => "تم نشر رحلة شركة جديدة بعنوان:",
    }
}

pub fn subject(kind: ContentKind, title: &str) -> String {
    format!("{}: {}", label(kind), title)
}

/// Tags stripped, then cut to the first [`EXCERPT_CHARS`] characters.
pub fn excerpt(content: &str) -> String {
    HTML_TAG.replace_all(content, "").chars().take(EXCERPT_CHARS).collect()
}

/// Shared parts of one newsletter, rendered per recipient by [`Composer::render`].
#[derive(Debug, Clone)]
pub struct Composer {
    kind: ContentKind,
    title: String,
    subject: String,
    excerpt: String,
    site_url: String,
}

impl Composer {
    pub fn new(kind: ContentKind, title: &str, content: &str, mail: &MailSettings) -> Self {
        Self {
            kind,
            title: title.to_string(),
            subject: subject(kind, title),
            excerpt: excerpt(content),
            site_url: mail.site_url.clone(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn render(&self, to: &Recipient) -> Result<Email, AppError> {
        let html = HtmlBody {
            subject: &self.subject,
            label: label(self.kind),
            intro: intro(self.kind),
            name: &to.name,
            title: &self.title,
            excerpt: &self.excerpt,
            site_url: &self.site_url,
        }
        .render()
        .map_err(|e| AppError::InternalError(format!("rendering html email: {}", e)))?;

        let text = TextBody {
            intro: intro(self.kind),
            name: &to.name,
            title: &self.title,
            excerpt: &self.excerpt,
            site_url: &self.site_url,
        }
        .render()
        .map_err(|e| AppError::InternalError(format!("rendering text email: {}", e)))?;

        Ok(Email {
            to: to.clone(),
            subject: self.subject.clone(),
            text,
            html,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail() -> MailSettings {
        MailSettings {
            from_address: "news@example.com".to_string(),
            from_name: "نشرة".to_string(),
            site_url: "https://blog.example.com".to_string(),
        }
    }

    fn recipient(name: &str) -> Recipient {
        Recipient {
            email: "reader@example.com".to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn subject_uses_kind_label() {
        assert_eq!(subject(ContentKind::Article, "عنوان"), "مقال جديد: عنوان");
        assert_eq!(subject(ContentKind::Company, "شركة"), "رحلة شركة جديدة: شركة");
    }

    #[test]
    fn excerpt_strips_tags_and_limits_characters() {
        assert_eq!(excerpt("<p>Hello <b>world</b></p>"), "Hello world");

        let long = format!("<div>{}</div>", "ب".repeat(400));
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), EXCERPT_CHARS);
        assert!(!cut.contains('<'));
    }

    #[test]
    fn renders_both_bodies_with_greeting_and_link() {
        let composer = Composer::new(ContentKind::Article, "مقال", "<p>نص المقال</p>", &mail());
        let email = composer.render(&recipient("سارة")).unwrap();

        assert_eq!(email.subject, "مقال جديد: مقال");
        assert!(email.text.contains("مرحباً سارة"));
        assert!(email.text.contains("نص المقال..."));
        assert!(email.text.contains("https://blog.example.com"));
        assert!(email.html.contains("dir=\"rtl\""));
        assert!(email.html.contains("href=\"https://blog.example.com\""));
    }

    #[test]
    fn text_body_sets_title_apart_from_intro() {
        let composer = Composer::new(ContentKind::Company, "رحلة", "نص", &mail());
        let email = composer.render(&recipient("علي")).unwrap();
        assert!(email.text.starts_with("مرحباً علي،\n\nتم نشر رحلة شركة جديدة بعنوان:\n\nرحلة\n\nنص..."));
    }

    #[test]
    fn html_body_escapes_recipient_name() {
        let composer = Composer::new(ContentKind::Company, "t", "c", &mail());
        let email = composer.render(&recipient("<script>x</script>")).unwrap();
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(email.text.contains("<script>x</script>"));
    }
}
