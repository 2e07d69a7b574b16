use chrono::{DateTime, Utc};
use rocket::{get, patch, post, response::status, serde::json::Json, Route, State};
use rocket_flex_session::Session;
use rocket_okapi::{
    okapi::openapi3::OpenApi, openapi, openapi_get_routes_spec, settings::OpenApiSettings,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{
        hash_password, verify_password, AuthenticatedUserId, EmployeeUser, TrainingAuthSession,
        MIN_PASSWORD_LENGTH,
    },
    config::AppConfig,
    db::{
        models::{NewTrainingUser, TrainingUser, TrainingUserRole, UpdateTrainingUser},
        services::{ChatDbService, UserDbService},
        DbConnection,
    },
    errors::ApiError,
};

/// Auth routes
pub fn get_routes(settings: &OpenApiSettings) -> (Vec<Route>, OpenApi) {
    openapi_get_routes_spec![settings: register, login, logout, profile, update_user]
}

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, JsonSchema, Deserialize)]
struct RegisterInput {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl RegisterInput {
    fn validate(&self, email: &str) -> Result<(), ApiError> {
        if email.is_empty() || self.password.is_empty() {
            return Err(ApiError::BadRequest(
                "Email and password are required.".into(),
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ApiError::BadRequest(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters long."
            )));
        }
        if self.password != self.confirm_password {
            return Err(ApiError::BadRequest("Passwords do not match.".into()));
        }
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Register a new account. The configured primary admin e-mail registers as an admin.
#[openapi(tag = "Auth")]
#[post("/register", data = "<input>")]
async fn register(
    mut db: DbConnection,
    app_config: &State<AppConfig>,
    input: Json<RegisterInput>,
) -> Result<status::Created<Json<TrainingUser>>, ApiError> {
    let email = normalize_email(&input.email);
    input.validate(&email)?;

    let mut db_service = UserDbService::new(&mut db);
    if db_service.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(
            "Email already registered. Please log in.".into(),
        ));
    }

    let password_hash = hash_password(&input.password)?;
    let role = match app_config.is_primary_admin(&email) {
        true => TrainingUserRole::Admin,
        false => TrainingUserRole::Employee,
    };
    let user = db_service
        .create(NewTrainingUser {
            email: &email,
            password_hash: &password_hash,
            first_name: non_empty(&input.first_name),
            last_name: non_empty(&input.last_name),
            role,
        })
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::Conflict("Email already registered. Please log in.".into()),
            e => e.into(),
        })?;
    rocket::info!("Registered user {} with role {:?}", user.id, user.role);

    Ok(status::Created::new("/api/auth/profile").body(Json(user)))
}

#[derive(Debug, JsonSchema, Deserialize)]
struct LoginInput {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Log in with e-mail and password
#[openapi(tag = "Auth")]
#[post("/login", data = "<input>")]
async fn login(
    mut db: DbConnection,
    mut session: Session<'_, TrainingAuthSession>,
    input: Json<LoginInput>,
) -> Result<Json<TrainingUser>, ApiError> {
    let email = normalize_email(&input.email);
    if email.is_empty() || input.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required.".into(),
        ));
    }

    let user = UserDbService::new(&mut db).find_by_email(&email).await?;
    match user {
        Some(user) if verify_password(&input.password, &user.password_hash) => {
            session.set(TrainingAuthSession::new(user.id));
            Ok(Json(user))
        }
        _ => Err(ApiError::Authentication(INVALID_CREDENTIALS.into())),
    }
}

/// Log out
#[openapi(tag = "Auth")]
#[post("/logout")]
async fn logout(
    _user_id: AuthenticatedUserId,
    mut session: Session<'_, TrainingAuthSession>,
) -> Result<String, ApiError> {
    session.delete();

    Ok("You have been logged out.".to_owned())
}

#[derive(Debug, JsonSchema, Serialize)]
struct UserProfile {
    #[serde(flatten)]
    user: TrainingUser,
    /// Number of questions the user has asked
    question_count: i64,
    /// When the current session was started
    logged_in_at: Option<DateTime<Utc>>,
}

/// Get the current user, their question count and the start of their session
#[openapi(tag = "Auth")]
#[get("/profile")]
async fn profile(
    user: EmployeeUser,
    session: Session<'_, TrainingAuthSession>,
    mut db: DbConnection,
) -> Result<Json<UserProfile>, ApiError> {
    let question_count = ChatDbService::new(&mut db).count_by_user(&user.id).await?;
    let logged_in_at = session.tap(|data| data.and_then(TrainingAuthSession::logged_in_at));

    Ok(Json(UserProfile {
        user: user.into_inner(),
        question_count,
        logged_in_at,
    }))
}

#[derive(Debug, JsonSchema, Deserialize)]
struct UpdateUserInput {
    first_name: Option<String>,
    last_name: Option<String>,
}

/// Update the current user's name
#[openapi(tag = "Auth")]
#[patch("/user", data = "<input>")]
async fn update_user(
    user: EmployeeUser,
    mut db: DbConnection,
    input: Json<UpdateUserInput>,
) -> Result<Json<TrainingUser>, ApiError> {
    let update = UpdateTrainingUser {
        first_name: input.first_name.as_deref().map(str::trim),
        last_name: input.last_name.as_deref().map(str::trim),
        ..Default::default()
    };
    if update.first_name.is_none() && update.last_name.is_none() {
        return Ok(Json(user.into_inner()));
    }
    let user = UserDbService::new(&mut db).update(&user.id, update).await?;

    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(email: &str, password: &str, confirm: &str) -> RegisterInput {
        RegisterInput {
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
    }

    #[test]
    fn registration_validation() {
        let ok = input("a@b.c", "password1", "password1");
        assert!(ok.validate("a@b.c").is_ok());

        let missing = input("", "password1", "password1");
        assert!(matches!(missing.validate(""), Err(ApiError::BadRequest(_))));

        let short = input("a@b.c", "short", "short");
        assert!(
            matches!(short.validate("a@b.c"), Err(ApiError::BadRequest(msg)) if msg.contains("at least 8"))
        );

        let mismatch = input("a@b.c", "password1", "password2");
        assert!(
            matches!(mismatch.validate("a@b.c"), Err(ApiError::BadRequest(msg)) if msg == "Passwords do not match.")
        );
    }

    #[test]
    fn blank_names_are_dropped() {
        assert_eq!(non_empty(&Some("  ".into())), None);
        assert_eq!(non_empty(&Some(" Ann ".into())), Some("Ann"));
        assert_eq!(non_empty(&None), None);
    }
}
