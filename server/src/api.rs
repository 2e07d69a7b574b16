mod admin;
mod auth;
mod chat;
mod document;
mod health;

pub use admin::get_routes as admin_routes;
pub use auth::get_routes as auth_routes;
pub use chat::get_routes as chat_routes;
pub use document::get_routes as document_routes;
pub use document::get_undocumented_routes as document_upload_routes;
pub use health::get_routes as health_routes;
