pub mod articles;
pub mod auth;
pub mod companies;
pub mod experiences;
pub mod feed;
pub mod newsletter;
pub mod profile;
pub mod subscribers;
pub mod uploads;
