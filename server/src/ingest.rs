//! Upload validation and storage of training documents.

use tokio::io::AsyncRead;

use crate::{
    db::models::TrainingDocumentType,
    extract::extract_text,
    storage::{LocalStorage, StorageError},
};

/// Maximum size of an uploaded document (16 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;
/// Maximum length in bytes of a stored display name (`documents.original_filename`)
pub const MAX_FILENAME_BYTES: usize = 255;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("No file selected")]
    NoFile,
    #[error("File type not allowed. Please upload PDF, TXT, or DOCX files.")]
    UnsupportedType,
    #[error("File is too large. Maximum size is 16 MB.")]
    TooLarge,
    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for IngestError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::TooLarge(_) => IngestError::TooLarge,
            StorageError::Io(e) => IngestError::Io(e),
        }
    }
}

/// A validated upload, before its bytes are stored
#[derive(Debug, PartialEq, Eq)]
pub struct PreparedUpload {
    /// Sanitized original name, for display
    pub original_filename: String,
    /// Random storage name with the original extension
    pub storage_filename: String,
    pub file_type: TrainingDocumentType,
}

/// A stored upload with its extracted text
#[derive(Debug)]
pub struct IngestedDocument {
    pub original_filename: String,
    pub storage_filename: String,
    pub file_type: TrainingDocumentType,
    pub file_size: i64,
    pub content: Option<String>,
}

/// Validate the client-supplied file name and derive the display and storage names.
pub fn prepare_upload(raw_name: Option<&str>) -> Result<PreparedUpload, IngestError> {
    let raw_name = raw_name.map(str::trim).unwrap_or_default();
    if raw_name.is_empty() {
        return Err(IngestError::NoFile);
    }
    let file_type = raw_name
        .rsplit_once('.')
        .and_then(|(_, ext)| TrainingDocumentType::from_extension(ext))
        .ok_or(IngestError::UnsupportedType)?;

    let extension = file_type.extension();
    let mut original_filename = secure_filename(raw_name);
    let has_extension = original_filename
        .rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case(extension));
    if !has_extension {
        original_filename = format!("document.{extension}");
    }
    if original_filename.len() > MAX_FILENAME_BYTES {
        original_filename = shorten_filename(&original_filename);
    }

    Ok(PreparedUpload {
        original_filename,
        storage_filename: format!("{}.{}", uuid::Uuid::new_v4().simple(), extension),
        file_type,
    })
}

/// Cut the stem of a too-long name so that stem and extension fit in [MAX_FILENAME_BYTES]
fn shorten_filename(name: &str) -> String {
    let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
    let max_stem = MAX_FILENAME_BYTES.saturating_sub(ext.len() + 1);
    let cut = stem
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= max_stem)
        .last()
        .unwrap_or(0);
    format!("{}.{}", &stem[..cut], ext)
}

/// Reduce a client-supplied file name to a safe ASCII name: path separators and
/// whitespace become underscores, other characters outside `[A-Za-z0-9_.-]` are dropped,
/// and leading/trailing dots and underscores are stripped.
pub fn secure_filename(name: &str) -> String {
    let name = name.replace(['/', '\\'], " ");
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_owned()
}

/// Store an uploaded file and extract its text. Extraction failures don't fail the
/// upload: the document is kept without content. A successful extraction that finds
/// no text keeps the (blank) text.
pub async fn ingest_document(
    storage: &LocalStorage,
    raw_name: Option<&str>,
    data: impl AsyncRead + Unpin,
) -> Result<IngestedDocument, IngestError> {
    let upload = prepare_upload(raw_name)?;
    let file_size = storage
        .create_file(&upload.storage_filename, data, MAX_UPLOAD_BYTES)
        .await?;

    let content = match storage.read_file(&upload.storage_filename).await {
        Ok(bytes) => extract_content(bytes, upload.file_type, &upload.original_filename).await,
        Err(e) => {
            rocket::error!("Failed to read back {}: {}", upload.storage_filename, e);
            None
        }
    };

    Ok(IngestedDocument {
        original_filename: upload.original_filename,
        storage_filename: upload.storage_filename,
        file_type: upload.file_type,
        file_size: file_size as i64,
        content,
    })
}

async fn extract_content(
    bytes: Vec<u8>,
    file_type: TrainingDocumentType,
    name: &str,
) -> Option<String> {
    let result = tokio::task::spawn_blocking(move || extract_text(&bytes, file_type)).await;
    match result {
        Ok(Ok(text)) => {
            if text.trim().is_empty() {
                rocket::warn!("No text found in {}", name);
            }
            Some(text)
        }
        Ok(Err(e)) => {
            rocket::error!("Error extracting text from {}: {}", name, e);
            None
        }
        Err(e) => {
            rocket::error!("Extraction task for {} failed: {}", name, e);
            None
        }
    }
}
