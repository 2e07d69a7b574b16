use chrono::{DateTime, Utc};
use diesel::{
    prelude::{Identifiable, Insertable, Queryable},
    Selectable,
};
use schemars::JsonSchema;
use serde::Serialize;

/// How often a (normalized) question has been asked
#[derive(Debug, Identifiable, Queryable, Selectable, JsonSchema, Serialize)]
#[diesel(table_name = super::schema::question_analytics)]
pub struct TrainingQuestionStat {
    pub id: i32,
    /// Original text of the first occurrence
    pub question_text: String,
    pub normalized_question: String,
    #[diesel(column_name = ask_count)]
    pub count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::question_analytics)]
pub struct NewTrainingQuestionStat<'r> {
    pub question_text: &'r str,
    pub normalized_question: &'r str,
}
