use rocket::{
    catch, catchers,
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Catcher, Request,
};
use rocket_okapi::response::OpenApiResponderInner;
use schemars::JsonSchema;

use crate::{auth::PasswordError, ingest::IngestError};

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] diesel::result::Error),
    #[error("Authentication error: {0}")]
    Authentication(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Database pool error: {0}")]
    Pool(#[from] diesel_async::pooled_connection::deadpool::PoolError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, JsonSchema, serde::Serialize)]
pub struct Message {
    message: String,
}
impl Message {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Responder)]
enum ApiErrorResponse {
    #[response(status = 400, content_type = "json")]
    BadRequest(Json<Message>),
    #[response(status = 401, content_type = "json")]
    Unauthorized(Json<Message>),
    #[response(status = 403, content_type = "json")]
    Forbidden(Json<Message>),
    #[response(status = 404, content_type = "json")]
    NotFound(Json<Message>),
    #[response(status = 409, content_type = "json")]
    Conflict(Json<Message>),
    #[response(status = 413, content_type = "json")]
    PayloadTooLarge(Json<Message>),
    #[response(status = 500, content_type = "json")]
    Server(Json<Message>),
}

impl ApiErrorResponse {
    fn server_error() -> Self {
        ApiErrorResponse::Server(Json(Message::new("Server error!")))
    }
}

impl From<ApiError> for ApiErrorResponse {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Authentication(msg) => ApiErrorResponse::Unauthorized(Json(Message::new(&msg))),
            ApiError::Forbidden(msg) => ApiErrorResponse::Forbidden(Json(Message::new(&msg))),
            ApiError::BadRequest(msg) => ApiErrorResponse::BadRequest(Json(Message::new(&msg))),
            ApiError::NotFound(msg) => ApiErrorResponse::NotFound(Json(Message::new(&msg))),
            ApiError::Conflict(msg) => ApiErrorResponse::Conflict(Json(Message::new(&msg))),
            ApiError::Db(diesel::result::Error::NotFound) => {
                ApiErrorResponse::NotFound(Json(Message::new("Not found!")))
            }
            ApiError::Ingest(error) => match error {
                IngestError::TooLarge => {
                    ApiErrorResponse::PayloadTooLarge(Json(Message::new(&error.to_string())))
                }
                IngestError::NoFile | IngestError::UnsupportedType => {
                    ApiErrorResponse::BadRequest(Json(Message::new(&error.to_string())))
                }
                IngestError::Io(_) => ApiErrorResponse::server_error(),
            },
            ApiError::Db(_) | ApiError::Pool(_) | ApiError::Password(_) | ApiError::Io(_) => {
                ApiErrorResponse::server_error()
            }
        }
    }
}

/// API error response handling
impl<'r, 'o: 'r> response::Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        match &self {
            ApiError::Db(diesel::result::Error::NotFound) => rocket::info!("API error: {:?}", self),
            ApiError::Db(_)
            | ApiError::Pool(_)
            | ApiError::Password(_)
            | ApiError::Io(_)
            | ApiError::Ingest(IngestError::Io(_)) => rocket::error!("API error: {:?}", self),
            _ => rocket::info!("API error: {:?}", self),
        }
        ApiErrorResponse::from(self).respond_to(req)
    }
}

/// Status codes of error responses with their default messages
const ERROR_MESSAGES: [(u16, &str); 8] = [
    (400, "Bad request"),
    (401, "Unauthorized!"),
    (403, "Admin access required."),
    (404, "Not found!"),
    (409, "Conflict"),
    (413, "File is too large. Maximum size is 16 MB."),
    (422, "Incorrectly formatted"),
    (500, "Server error!"),
];

fn default_message(status: Status) -> &'static str {
    ERROR_MESSAGES
        .iter()
        .find(|(code, _)| *code == status.code)
        .map(|(_, message)| *message)
        .or(status.reason())
        .unwrap_or("Error")
}

/// Default JSON catchers for request errors.
pub fn get_catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

/// Respond to framework-level errors with a JSON message. Malformed bodies (422) are
/// reported as bad requests.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request) -> (Status, Json<Message>) {
    let message = Json(Message::new(default_message(status)));
    match status.code {
        422 => (Status::BadRequest, message),
        _ => (status, message),
    }
}

/// OpenAPI specification for API error responses
impl OpenApiResponderInner for ApiError {
    fn responses(
        gen: &mut rocket_okapi::r#gen::OpenApiGenerator,
    ) -> rocket_okapi::Result<rocket_okapi::okapi::openapi3::Responses> {
        use rocket_okapi::okapi::openapi3::{MediaType, RefOr, Response, Responses};

        let content: schemars::Map<_, _> = [(
            "application/json".to_owned(),
            MediaType {
                schema: Some(gen.json_schema::<Message>()),
                ..Default::default()
            },
        )]
        .into_iter()
        .collect();
        let responses = ERROR_MESSAGES
            .iter()
            .filter(|(code, _)| *code != 422)
            .map(|(code, message)| {
                let response = Response {
                    description: message.to_string(),
                    content: content.clone(),
                    ..Default::default()
                };
                (code.to_string(), RefOr::Object(response))
            })
            .collect();

        Ok(Responses {
            responses,
            ..Default::default()
        })
    }
}
