use diesel::{dsl::count, prelude::*, result::Error};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::{
    models::{NewTrainingUser, TrainingUser, TrainingUserStats, UpdateTrainingUser},
    schema::{chat_messages, users},
    DbConnection,
};

pub struct UserDbService<'a> {
    pub db: &'a mut DbConnection,
}

impl<'a> UserDbService<'a> {
    pub fn new(db: &'a mut DbConnection) -> Self {
        UserDbService { db }
    }

    pub async fn find_by_id(&mut self, id: &Uuid) -> Result<Option<TrainingUser>, Error> {
        users::table
            .find(id)
            .select(TrainingUser::as_select())
            .first(self.db)
            .await
            .optional()
    }

    pub async fn find_by_email(&mut self, email: &str) -> Result<Option<TrainingUser>, Error> {
        users::table
            .filter(users::email.eq(email))
            .select(TrainingUser::as_select())
            .first(self.db)
            .await
            .optional()
    }

    pub async fn create(&mut self, user: NewTrainingUser<'_>) -> Result<TrainingUser, Error> {
        diesel::insert_into(users::table)
            .values(user)
            .returning(TrainingUser::as_returning())
            .get_result(self.db)
            .await
    }

    pub async fn update(
        &mut self,
        id: &Uuid,
        data: UpdateTrainingUser<'_>,
    ) -> Result<TrainingUser, Error> {
        diesel::update(users::table.find(id))
            .set(data)
            .returning(TrainingUser::as_returning())
            .get_result(self.db)
            .await
    }

    /// All users with the number of questions each has asked, newest users first
    pub async fn list_with_question_counts(&mut self) -> Result<Vec<TrainingUserStats>, Error> {
        users::table
            .left_join(chat_messages::table)
            .group_by(users::id)
            .select((
                users::id,
                users::email,
                users::first_name,
                users::last_name,
                users::role,
                users::created_at,
                count(chat_messages::id.nullable()),
            ))
            .order_by(users::created_at.desc())
            .load::<TrainingUserStats>(self.db)
            .await
    }
}
