use chrono::{DateTime, Utc};
use diesel::{
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
    Selectable,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a user in the application
#[derive(diesel_derive_enum::DbEnum)]
#[db_enum(existing_type_path = "crate::db::schema::sql_types::UserRole")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, JsonSchema, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingUserRole {
    Employee,
    Admin,
}

impl TrainingUserRole {
    /// Whether a user with this role may access routes requiring `required`
    pub fn satisfies(self, required: TrainingUserRole) -> bool {
        match required {
            TrainingUserRole::Employee => true,
            TrainingUserRole::Admin => self == TrainingUserRole::Admin,
        }
    }

    /// The role an admin toggle switches to
    pub fn toggled(self) -> Self {
        match self {
            TrainingUserRole::Employee => TrainingUserRole::Admin,
            TrainingUserRole::Admin => TrainingUserRole::Employee,
        }
    }
}

#[derive(Debug, Identifiable, Queryable, Selectable, JsonSchema, Serialize)]
#[diesel(table_name = super::schema::users)]
pub struct TrainingUser {
    pub id: Uuid,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub role: TrainingUserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::users)]
pub struct NewTrainingUser<'r> {
    pub email: &'r str,
    pub password_hash: &'r str,
    pub first_name: Option<&'r str>,
    pub last_name: Option<&'r str>,
    pub role: TrainingUserRole,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = super::schema::users)]
pub struct UpdateTrainingUser<'r> {
    pub first_name: Option<&'r str>,
    pub last_name: Option<&'r str>,
    pub role: Option<TrainingUserRole>,
}

/// A user with the number of questions they've asked
#[derive(Debug, Queryable, JsonSchema, Serialize)]
pub struct TrainingUserStats {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: TrainingUserRole,
    pub created_at: DateTime<Utc>,
    pub question_count: i64,
}
