use rocket::{get, serde::json::Json, Route, State};
use rocket_okapi::{
    okapi::openapi3::OpenApi, openapi, openapi_get_routes_spec, settings::OpenApiSettings,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::provider::ResponseGenerator;

pub fn get_routes(settings: &OpenApiSettings) -> (Vec<Route>, OpenApi) {
    openapi_get_routes_spec![settings: health]
}

#[derive(Debug, JsonSchema, Serialize)]
struct HealthStatus {
    status: &'static str,
    /// Whether answers come from a chat completion provider
    llm_configured: bool,
}

/// Liveness check. Doesn't touch the database.
#[openapi(tag = "Health")]
#[get("/health")]
fn health(generator: &State<ResponseGenerator>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        llm_configured: generator.is_configured(),
    })
}
