use chrono::{DateTime, Utc};
use diesel::{
    prelude::{Associations, Identifiable, Insertable, Queryable},
    Selectable,
};
use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

use crate::db::models::TrainingUser;

/// A question from a user and the generated answer
#[derive(Debug, Identifiable, Associations, Queryable, Selectable, JsonSchema, Serialize)]
#[diesel(belongs_to(TrainingUser, foreign_key = user_id))]
#[diesel(table_name = super::schema::chat_messages)]
pub struct TrainingChatMessage {
    pub id: Uuid,
    #[serde(skip)]
    pub user_id: Uuid,
    pub message: String,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::chat_messages)]
pub struct NewTrainingChatMessage<'r> {
    pub user_id: &'r Uuid,
    pub message: &'r str,
    pub response: Option<&'r str>,
}

/// A recent question with the e-mail of the user who asked it
#[derive(Debug, Queryable, JsonSchema, Serialize)]
pub struct RecentQuestion {
    pub id: Uuid,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub user_email: String,
}
