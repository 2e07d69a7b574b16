use diesel_async::scoped_futures::ScopedFutureExt;
use rocket::{get, post, serde::json::Json, Route, State};
use rocket_okapi::{
    okapi::openapi3::OpenApi, openapi, openapi_get_routes_spec, settings::OpenApiSettings,
};
use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::AdminUser,
    config::AppConfig,
    db::{
        models::{
            RecentQuestion, TrainingQuestionStat, TrainingUser, TrainingUserStats,
            UpdateTrainingUser,
        },
        services::{AnalyticsDbService, ChatDbService, DocumentDbService, UserDbService},
        DbConnection,
    },
    errors::ApiError,
};

const TOP_QUESTIONS_LIMIT: i64 = 10;
const RECENT_QUESTIONS_LIMIT: i64 = 20;

pub fn get_routes(settings: &OpenApiSettings) -> (Vec<Route>, OpenApi) {
    openapi_get_routes_spec![settings: dashboard, list_users, toggle_admin]
}

#[derive(Debug, JsonSchema, Serialize)]
struct DashboardStats {
    total_questions: i64,
    /// Users who have asked at least one question
    active_users: i64,
    total_documents: i64,
    top_questions: Vec<TrainingQuestionStat>,
    recent_questions: Vec<RecentQuestion>,
}

/// Usage analytics for administrators
#[openapi(tag = "Admin")]
#[get("/dashboard")]
async fn dashboard(_admin: AdminUser, mut db: DbConnection) -> Result<Json<DashboardStats>, ApiError> {
    let mut chat_service = ChatDbService::new(&mut db);
    let total_questions = chat_service.count_all().await?;
    let active_users = chat_service.count_active_users().await?;
    let recent_questions = chat_service
        .find_recent_questions(RECENT_QUESTIONS_LIMIT)
        .await?;
    let total_documents = DocumentDbService::new(&mut db).count().await?;
    let top_questions = AnalyticsDbService::new(&mut db)
        .find_top_questions(TOP_QUESTIONS_LIMIT)
        .await?;

    Ok(Json(DashboardStats {
        total_questions,
        active_users,
        total_documents,
        top_questions,
        recent_questions,
    }))
}

/// All users with their question counts, newest first
#[openapi(tag = "Admin")]
#[get("/users")]
async fn list_users(
    _admin: AdminUser,
    mut db: DbConnection,
) -> Result<Json<Vec<TrainingUserStats>>, ApiError> {
    let users = UserDbService::new(&mut db).list_with_question_counts().await?;

    Ok(Json(users))
}

/// Switch a user between the employee and admin roles
#[openapi(tag = "Admin")]
#[post("/users/<user_id>/toggle-admin")]
async fn toggle_admin(
    admin: AdminUser,
    mut db: DbConnection,
    app_config: &State<AppConfig>,
    user_id: Uuid,
) -> Result<Json<TrainingUser>, ApiError> {
    if user_id == admin.id {
        return Err(ApiError::BadRequest(
            "You cannot change your own admin status.".into(),
        ));
    }

    let updated = db
        .in_transaction(|conn| {
            async move {
                let mut db_service = UserDbService::new(conn);
                let user = db_service
                    .find_by_id(&user_id)
                    .await?
                    .ok_or_else(|| ApiError::NotFound("User not found.".into()))?;
                if app_config.is_primary_admin(&user.email) {
                    return Err(ApiError::BadRequest(
                        "Cannot change admin status of the primary admin account.".into(),
                    ));
                }
                let update = UpdateTrainingUser {
                    role: Some(user.role.toggled()),
                    ..Default::default()
                };
                Ok(db_service.update(&user.id, update).await?)
            }
            .scope_boxed()
        })
        .await?;
    rocket::info!(
        "Admin {} changed role of {} to {:?}",
        admin.id,
        updated.id,
        updated.role
    );

    Ok(Json(updated))
}
