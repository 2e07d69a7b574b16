use diesel::{dsl::count_star, prelude::*, result::Error};
use diesel_async::RunQueryDsl;

use crate::db::{
    models::{NewTrainingDocument, TrainingDocument},
    schema::documents,
    DbConnection,
};

pub struct DocumentDbService<'a> {
    pub db: &'a mut DbConnection,
}

impl<'a> DocumentDbService<'a> {
    pub fn new(db: &'a mut DbConnection) -> Self {
        DocumentDbService { db }
    }

    /// All documents in upload order, for building the chat context
    pub async fn find_all(&mut self) -> Result<Vec<TrainingDocument>, Error> {
        documents::table
            .select(TrainingDocument::as_select())
            .order_by(documents::id.asc())
            .load(self.db)
            .await
    }

    /// All documents, newest first
    pub async fn find_all_newest_first(&mut self) -> Result<Vec<TrainingDocument>, Error> {
        documents::table
            .select(TrainingDocument::as_select())
            .order_by((documents::created_at.desc(), documents::id.desc()))
            .load(self.db)
            .await
    }

    pub async fn create(
        &mut self,
        document: NewTrainingDocument<'_>,
    ) -> Result<TrainingDocument, Error> {
        diesel::insert_into(documents::table)
            .values(document)
            .returning(TrainingDocument::as_returning())
            .get_result(self.db)
            .await
    }

    /// Delete the document, returning the deleted row
    pub async fn delete(&mut self, id: i32) -> Result<TrainingDocument, Error> {
        diesel::delete(documents::table.find(id))
            .returning(TrainingDocument::as_returning())
            .get_result(self.db)
            .await
    }

    pub async fn count(&mut self) -> Result<i64, Error> {
        documents::table.select(count_star()).get_result(self.db).await
    }
}
