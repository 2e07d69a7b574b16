mod analytics;
mod chat;
mod document;
mod user;

pub use analytics::AnalyticsDbService;
pub use chat::ChatDbService;
pub use document::DocumentDbService;
pub use user::UserDbService;
