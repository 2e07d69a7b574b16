pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod extract;
pub mod ingest;
pub mod provider;
pub mod storage;
pub mod utils;
pub mod web;

use rocket::{fairing::AdHoc, figment::Figment, Build, Rocket};
use rocket_okapi::{mount_endpoints_and_merged_docs, settings::OpenApiSettings};

use crate::{
    auth::setup_session,
    config::{get_config_provider, AppConfig},
    db::setup_db,
    errors::get_catchers,
    provider::setup_llm,
    storage::setup_storage,
    web::{api_docs_routes, setup_static_files, NoCacheApi},
};

/// Build the server from the default configuration sources
pub fn build_rocket() -> Rocket<Build> {
    build_rocket_with(get_config_provider())
}

/// Build the server with its state, fairings and routes from the given configuration.
/// Fairings run in order at ignition: the config must be loaded before the database,
/// session store, upload storage and LLM provider are set up.
pub fn build_rocket_with(figment: Figment) -> Rocket<Build> {
    let mut server = rocket::custom(figment)
        .attach(AdHoc::config::<AppConfig>())
        .attach(setup_db())
        .attach(setup_session())
        .attach(setup_storage())
        .attach(setup_llm())
        .attach(setup_static_files())
        .attach(NoCacheApi)
        .register("/", get_catchers())
        .mount("/api/docs", api_docs_routes())
        .mount("/api/document", api::document_upload_routes());

    let settings = OpenApiSettings::default();
    mount_endpoints_and_merged_docs! {
        server, "/api", settings,
        "/" => api::health_routes(&settings),
        "/auth" => api::auth_routes(&settings),
        "/chat" => api::chat_routes(&settings),
        "/document" => api::document_routes(&settings),
        "/admin" => api::admin_routes(&settings),
    };

    server
}
