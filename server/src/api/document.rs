use rocket::{
    delete,
    form::{Form, FromForm},
    fs::TempFile,
    get, post,
    response::status,
    routes,
    serde::json::Json,
    Route, State,
};
use rocket_okapi::{
    okapi::openapi3::OpenApi, openapi, openapi_get_routes_spec, settings::OpenApiSettings,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::{
    auth::{AdminUser, EmployeeUser},
    db::{
        models::{NewTrainingDocument, TrainingDocumentSummary},
        services::DocumentDbService,
        DbConnection,
    },
    errors::{ApiError, Message},
    ingest::{ingest_document, IngestError},
    storage::LocalStorage,
};

pub fn get_routes(settings: &OpenApiSettings) -> (Vec<Route>, OpenApi) {
    openapi_get_routes_spec![settings: list_documents, delete_document]
}

/// Undocumented document routes: multipart upload
pub fn get_undocumented_routes() -> Vec<Route> {
    routes![upload_document]
}

/// List the training documents, newest first
#[openapi(tag = "Documents")]
#[get("/")]
async fn list_documents(
    _user: EmployeeUser,
    mut db: DbConnection,
) -> Result<Json<Vec<TrainingDocumentSummary>>, ApiError> {
    let documents = DocumentDbService::new(&mut db)
        .find_all_newest_first()
        .await?
        .into_iter()
        .map(TrainingDocumentSummary::from)
        .collect();

    Ok(Json(documents))
}

#[derive(FromForm)]
struct UploadForm<'r> {
    file: Option<TempFile<'r>>,
}

#[derive(Debug, JsonSchema, Serialize)]
struct UploadResponse {
    message: String,
    document: TrainingDocumentSummary,
}

/// Upload a training document (PDF, TXT or DOCX) as the multipart field `file`
#[post("/", data = "<form>")]
async fn upload_document(
    user: AdminUser,
    mut db: DbConnection,
    storage: &State<LocalStorage>,
    form: Form<UploadForm<'_>>,
) -> Result<status::Created<Json<UploadResponse>>, ApiError> {
    let file = form.file.as_ref().ok_or(IngestError::NoFile)?;
    let raw_name = file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str());
    let reader = Box::pin(file.open().await.map_err(IngestError::Io)?);
    let ingested = ingest_document(storage, raw_name, reader).await?;

    let created = DocumentDbService::new(&mut db)
        .create(NewTrainingDocument {
            filename: &ingested.storage_filename,
            original_filename: &ingested.original_filename,
            file_type: ingested.file_type,
            content: ingested.content.as_deref(),
            file_size: ingested.file_size,
            uploaded_by: &user.id,
        })
        .await;
    let document = match created {
        Ok(document) => document,
        Err(e) => {
            if let Err(remove_err) = storage.delete_file(&ingested.storage_filename).await {
                rocket::warn!(
                    "Failed to remove {} after insert error: {}",
                    ingested.storage_filename,
                    remove_err
                );
            }
            return Err(e.into());
        }
    };
    rocket::info!(
        "Document {} uploaded by {} ({} bytes, text: {})",
        document.id,
        user.id,
        document.file_size,
        document.content.is_some()
    );

    let location = format!("/api/document/{}", document.id);
    Ok(status::Created::new(location).body(Json(UploadResponse {
        message: format!(
            "Document \"{}\" uploaded successfully!",
            document.original_filename
        ),
        document: document.into(),
    })))
}

/// Delete a training document and its stored file
#[openapi(tag = "Documents")]
#[delete("/<id>")]
async fn delete_document(
    _admin: AdminUser,
    mut db: DbConnection,
    storage: &State<LocalStorage>,
    id: i32,
) -> Result<Json<Message>, ApiError> {
    let document = DocumentDbService::new(&mut db)
        .delete(id)
        .await
        .map_err(|e| match e {
            diesel::result::Error::NotFound => ApiError::NotFound("Document not found.".into()),
            e => e.into(),
        })?;

    match storage.delete_file(&document.filename).await {
        Ok(true) => {}
        Ok(false) => rocket::warn!("Stored file {} was already missing", document.filename),
        Err(e) => rocket::warn!("Failed to delete stored file {}: {}", document.filename, e),
    }

    Ok(Json(Message::new(&format!(
        "Document \"{}\" deleted.",
        document.original_filename
    ))))
}
