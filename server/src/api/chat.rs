use diesel_async::scoped_futures::ScopedFutureExt;
use rocket::{get, post, serde::json::Json, Route, State};
use rocket_okapi::{
    okapi::openapi3::OpenApi, openapi, openapi_get_routes_spec, settings::OpenApiSettings,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::EmployeeUser,
    db::{
        models::{NewTrainingChatMessage, NewTrainingQuestionStat, TrainingChatMessage},
        services::{AnalyticsDbService, ChatDbService, DocumentDbService},
        DbConnection, DbPool,
    },
    errors::ApiError,
    provider::ResponseGenerator,
    utils::{build_chat_messages, normalize_question, HISTORY_WINDOW},
};

/// Number of messages returned by the history endpoint
const HISTORY_PAGE_SIZE: i64 = 50;

pub fn get_routes(settings: &OpenApiSettings) -> (Vec<Route>, OpenApi) {
    openapi_get_routes_spec![settings: send_chat, get_history]
}

#[derive(Debug, JsonSchema, Deserialize)]
pub struct SendChatInput {
    /// The question from the user
    message: Option<String>,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct SendChatResponse {
    /// The generated answer
    response: String,
    /// ID of the stored chat message
    message_id: Uuid,
}

/// Ask a question. The answer is grounded in the uploaded training documents and the
/// user's recent conversation.
///
/// No database connection is checked out while the answer is generated.
#[openapi(tag = "Chat")]
#[post("/", data = "<input>")]
async fn send_chat(
    user: EmployeeUser,
    pool: &State<DbPool>,
    generator: &State<ResponseGenerator>,
    input: Json<SendChatInput>,
) -> Result<Json<SendChatResponse>, ApiError> {
    let question = input.message.as_deref().map(str::trim).unwrap_or_default();
    if question.is_empty() {
        return Err(ApiError::BadRequest("Message is required".into()));
    }

    let messages = {
        let mut db = DbConnection::get(pool).await?;
        let documents = DocumentDbService::new(&mut db).find_all().await?;
        let history = ChatDbService::new(&mut db)
            .find_recent(&user.id, HISTORY_WINDOW as i64)
            .await?;
        build_chat_messages(&documents, &history, question)
    };
    let answer = generator.generate(&messages).await;

    let normalized = normalize_question(question);
    let (user_id, answer_text, normalized) = (user.id, answer.as_str(), normalized.as_str());
    let mut db = DbConnection::get(pool).await?;
    let saved = db
        .in_transaction(|conn| {
            async move {
                let saved = ChatDbService::new(conn)
                    .save_message(NewTrainingChatMessage {
                        user_id: &user_id,
                        message: question,
                        response: Some(answer_text),
                    })
                    .await?;
                AnalyticsDbService::new(conn)
                    .record_question(NewTrainingQuestionStat {
                        question_text: question,
                        normalized_question: normalized,
                    })
                    .await?;
                Ok::<_, ApiError>(saved)
            }
            .scope_boxed()
        })
        .await?;

    Ok(Json(SendChatResponse {
        response: answer,
        message_id: saved.id,
    }))
}

/// The user's latest messages, oldest first
#[openapi(tag = "Chat")]
#[get("/history")]
async fn get_history(
    user: EmployeeUser,
    mut db: DbConnection,
) -> Result<Json<Vec<TrainingChatMessage>>, ApiError> {
    let messages = ChatDbService::new(&mut db)
        .get_history(&user.id, HISTORY_PAGE_SIZE)
        .await?;

    Ok(Json(messages))
}
