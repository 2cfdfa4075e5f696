pub mod article;
pub mod company;
pub mod enums;
pub mod experience;
pub mod founder;
pub mod newsletter_delivery;
pub mod newsletter_subscriber;
pub mod personal_info;
pub mod site_settings;

pub use enums::*;

pub use article::Entity as Article;
pub use company::Entity as Company;
pub use experience::Entity as Experience;
pub use founder::Entity as Founder;
pub use newsletter_delivery::Entity as NewsletterDelivery;
pub use newsletter_subscriber::Entity as NewsletterSubscriber;
pub use personal_info::Entity as PersonalInfo;
pub use site_settings::Entity as SiteSettings;

/// Fixed value of the unique `singleton` column on single-row tables.
pub const SINGLETON_KEY: i32 = 1;

fn singleton_key() -> i32 {
    SINGLETON_KEY
}
