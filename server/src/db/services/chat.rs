use diesel::{
    dsl::{count_distinct, count_star},
    prelude::*,
    result::Error,
};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::{
    models::{NewTrainingChatMessage, RecentQuestion, TrainingChatMessage},
    schema::{chat_messages, users},
    DbConnection,
};

pub struct ChatDbService<'a> {
    pub db: &'a mut DbConnection,
}

impl<'a> ChatDbService<'a> {
    pub fn new(db: &'a mut DbConnection) -> Self {
        ChatDbService { db }
    }

    pub async fn save_message(
        &mut self,
        message: NewTrainingChatMessage<'_>,
    ) -> Result<TrainingChatMessage, Error> {
        diesel::insert_into(chat_messages::table)
            .values(message)
            .returning(TrainingChatMessage::as_returning())
            .get_result(self.db)
            .await
    }

    /// The user's most recent messages, newest first
    pub async fn find_recent(
        &mut self,
        user_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<TrainingChatMessage>, Error> {
        chat_messages::table
            .filter(chat_messages::user_id.eq(user_id))
            .select(TrainingChatMessage::as_select())
            .order_by(chat_messages::created_at.desc())
            .limit(limit)
            .load(self.db)
            .await
    }

    /// The user's most recent messages, in chronological order
    pub async fn get_history(
        &mut self,
        user_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<TrainingChatMessage>, Error> {
        let mut messages = self.find_recent(user_id, limit).await?;
        messages.reverse();

        Ok(messages)
    }

    pub async fn count_by_user(&mut self, user_id: &Uuid) -> Result<i64, Error> {
        chat_messages::table
            .filter(chat_messages::user_id.eq(user_id))
            .select(count_star())
            .get_result(self.db)
            .await
    }

    pub async fn count_all(&mut self) -> Result<i64, Error> {
        chat_messages::table
            .select(count_star())
            .get_result(self.db)
            .await
    }

    /// Number of distinct users who have asked at least one question
    pub async fn count_active_users(&mut self) -> Result<i64, Error> {
        chat_messages::table
            .select(count_distinct(chat_messages::user_id))
            .get_result(self.db)
            .await
    }

    /// Latest questions across all users
    pub async fn find_recent_questions(&mut self, limit: i64) -> Result<Vec<RecentQuestion>, Error> {
        chat_messages::table
            .inner_join(users::table)
            .select((
                chat_messages::id,
                chat_messages::message,
                chat_messages::created_at,
                users::email,
            ))
            .order_by(chat_messages::created_at.desc())
            .limit(limit)
            .load::<RecentQuestion>(self.db)
            .await
    }
}
