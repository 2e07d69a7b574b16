mod analytics;
mod chat;
mod document;
mod user;

pub use analytics::*;
pub use chat::*;
pub use document::*;
pub use user::*;

use super::schema;
