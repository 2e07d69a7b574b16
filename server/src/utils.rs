mod chat_context;
mod json_logging;
mod normalize_question;

pub use chat_context::*;
pub use json_logging::*;
pub use normalize_question::*;
