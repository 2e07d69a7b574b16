use chrono::{DateTime, Utc};
use diesel::{
    prelude::{Associations, Identifiable, Insertable, Queryable},
    Selectable,
};
use schemars::JsonSchema;
use serde::Serialize;
use uuid::Uuid;

use crate::db::models::TrainingUser;

/// Supported training document formats
#[derive(diesel_derive_enum::DbEnum)]
#[db_enum(existing_type_path = "crate::db::schema::sql_types::DocumentFileType")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, JsonSchema, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingDocumentType {
    Pdf,
    Txt,
    Docx,
}

impl TrainingDocumentType {
    /// Match a (case-insensitive) file extension to a supported document type
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(TrainingDocumentType::Pdf),
            "txt" => Some(TrainingDocumentType::Txt),
            "docx" => Some(TrainingDocumentType::Docx),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TrainingDocumentType::Pdf => "pdf",
            TrainingDocumentType::Txt => "txt",
            TrainingDocumentType::Docx => "docx",
        }
    }
}

#[derive(Debug, Identifiable, Associations, Queryable, Selectable, JsonSchema, Serialize)]
#[diesel(belongs_to(TrainingUser, foreign_key = uploaded_by))]
#[diesel(table_name = super::schema::documents)]
pub struct TrainingDocument {
    pub id: i32,
    /// Generated storage filename
    pub filename: String,
    pub original_filename: String,
    pub file_type: TrainingDocumentType,
    /// Extracted text. Absent if extraction failed, blank if the file has no text.
    pub content: Option<String>,
    pub file_size: i64,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = super::schema::documents)]
pub struct NewTrainingDocument<'r> {
    pub filename: &'r str,
    pub original_filename: &'r str,
    pub file_type: TrainingDocumentType,
    pub content: Option<&'r str>,
    pub file_size: i64,
    pub uploaded_by: &'r Uuid,
}

/// Document listing entry, without the extracted text
#[derive(Debug, JsonSchema, Serialize)]
pub struct TrainingDocumentSummary {
    pub id: i32,
    pub original_filename: String,
    pub file_type: TrainingDocumentType,
    pub file_size: i64,
    /// Whether the file has extracted, non-blank text
    pub has_content: bool,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<TrainingDocument> for TrainingDocumentSummary {
    fn from(document: TrainingDocument) -> Self {
        TrainingDocumentSummary {
            id: document.id,
            has_content: document
                .content
                .as_deref()
                .is_some_and(|text| !text.trim().is_empty()),
            original_filename: document.original_filename,
            file_type: document.file_type,
            file_size: document.file_size,
            uploaded_by: document.uploaded_by,
            created_at: document.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{TrainingDocument, TrainingDocumentSummary, TrainingDocumentType};

    fn document(content: Option<&str>) -> TrainingDocument {
        TrainingDocument {
            id: 7,
            filename: "stored.txt".into(),
            original_filename: "notes.txt".into(),
            file_type: TrainingDocumentType::Txt,
            content: content.map(Into::into),
            file_size: 4,
            uploaded_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn summary_reports_usable_text_only() {
        let summary = TrainingDocumentSummary::from(document(Some("Policy")));
        assert!(summary.has_content);
        let summary = TrainingDocumentSummary::from(document(Some("  \n")));
        assert!(!summary.has_content);
        let summary = TrainingDocumentSummary::from(document(None));
        assert!(!summary.has_content);
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(
            TrainingDocumentType::from_extension("PDF"),
            Some(TrainingDocumentType::Pdf)
        );
        assert_eq!(
            TrainingDocumentType::from_extension("Docx"),
            Some(TrainingDocumentType::Docx)
        );
        assert_eq!(TrainingDocumentType::from_extension("exe"), None);
        assert_eq!(TrainingDocumentType::from_extension(""), None);
    }
}
