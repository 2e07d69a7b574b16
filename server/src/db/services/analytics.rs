use diesel::{prelude::*, result::Error};
use diesel_async::RunQueryDsl;

use crate::db::{
    models::{NewTrainingQuestionStat, TrainingQuestionStat},
    schema::question_analytics,
    DbConnection,
};

pub struct AnalyticsDbService<'a> {
    pub db: &'a mut DbConnection,
}

impl<'a> AnalyticsDbService<'a> {
    pub fn new(db: &'a mut DbConnection) -> Self {
        AnalyticsDbService { db }
    }

    /// Count an occurrence of a question. Inserts a new row seeded with the original text
    /// on the first occurrence of the normalized form, otherwise increments the counter
    /// in the same statement. The original text of the first occurrence is kept.
    pub async fn record_question(
        &mut self,
        question: NewTrainingQuestionStat<'_>,
    ) -> Result<TrainingQuestionStat, Error> {
        diesel::insert_into(question_analytics::table)
            .values(question)
            .on_conflict(question_analytics::normalized_question)
            .do_update()
            .set(question_analytics::ask_count.eq(question_analytics::ask_count + 1))
            .returning(TrainingQuestionStat::as_returning())
            .get_result(self.db)
            .await
    }

    /// The most frequently asked questions
    pub async fn find_top_questions(
        &mut self,
        limit: i64,
    ) -> Result<Vec<TrainingQuestionStat>, Error> {
        question_analytics::table
            .select(TrainingQuestionStat::as_select())
            .order_by((
                question_analytics::ask_count.desc(),
                question_analytics::updated_at.desc(),
            ))
            .limit(limit)
            .load(self.db)
            .await
    }
}
