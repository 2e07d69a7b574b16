use rocket::{
    data::{Limits, ToByteUnit},
    figment::{
        providers::{Env, Format, Serialized, Toml},
        Figment,
    },
    Build, Rocket,
};
use serde::{Deserialize, Serialize};

use crate::ingest::MAX_UPLOAD_BYTES;

/// Main server config (settings are merged with Rocket's default config)
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Postgres Database URL
    pub database_url: String,
    /// Maximum number of pooled database connections (default: 8)
    pub database_pool: Option<usize>,
    /// Redis URL for the session store
    pub redis_url: String,
    /// Number of Redis connections for the session store (default: 2)
    pub redis_pool: Option<usize>,
    /// Directory for uploaded training documents (default: `uploads`)
    pub upload_dir: Option<String>,
    /// Path to the static frontend files. If unset, only the API is served.
    pub static_path: Option<String>,
    /// E-mail of the primary administrator. Registering with this address grants the
    /// admin role, and its role can't be changed by other admins.
    pub admin_email: Option<String>,
    /// API key for the chat completion provider (also read from `GROQ_API_KEY`)
    pub groq_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible chat completion API (default: Groq)
    pub llm_base_url: Option<String>,
    /// Model used for answers (default: `llama-3.1-70b-versatile`)
    pub llm_model: Option<String>,
    /// Which provider to use for answers (default: `openai`)
    #[serde(default)]
    pub llm_provider: LlmProviderKind,
    /// Timeout in seconds for a chat completion request (default: 60)
    pub llm_timeout_secs: Option<u64>,
    /// Whether to include the provider error in the fallback answer shown to users
    #[serde(default)]
    pub llm_error_details: bool,
}

/// The chat completion backend configured for the server
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// Any OpenAI-compatible API (Groq, OpenAI, etc.)
    #[default]
    OpenAI,
    /// Canned offline answers, for local development
    Lorem,
}

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

impl AppConfig {
    pub fn upload_dir(&self) -> &str {
        self.upload_dir.as_deref().unwrap_or(DEFAULT_UPLOAD_DIR)
    }

    /// Whether the given e-mail belongs to the primary administrator
    pub fn is_primary_admin(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin_email| admin_email.trim().eq_ignore_ascii_case(email))
    }
}

/// Get the server configuration variables from Rocket
pub fn get_app_config(rocket: &Rocket<Build>) -> &AppConfig {
    rocket
        .state::<AppConfig>()
        .expect("Server configuration not loaded")
}

/// Builds and returns a Figment configuration provider that merges settings from:
/// 1. Default Rocket config, with upload limits for multipart forms
/// 2. Rocket.toml file
/// 3. Environment variables prefixed with `TRAINING_CHAT_`. In debug/dev mode, will load
/// variables from local `.env` file
/// 4. The `GROQ_API_KEY` environment variable
pub fn get_config_provider() -> Figment {
    #[cfg(debug_assertions)]
    if let Err(e) = dotenvy::dotenv() {
        println!("Failed to read .env file: {}", e);
    }

    let limits = Limits::default()
        .limit("file", MAX_UPLOAD_BYTES.bytes())
        .limit("data-form", MAX_UPLOAD_BYTES.bytes());

    Figment::from(rocket::Config::default())
        .merge(Serialized::default("limits", limits))
        .merge(Toml::file("Rocket.toml").nested())
        .merge(Env::prefixed("TRAINING_CHAT_").global())
        .merge(Env::raw().only(&["GROQ_API_KEY"]).global())
}
