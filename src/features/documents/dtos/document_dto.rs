use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::features::documents::models::Document;

/// Upload document request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadDocumentDto {
    /// The PDF file to upload
    #[schema(format = Binary, content_media_type = "application/pdf")]
    pub file: String,
}

/// Public view of a stored document (no storage path)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponseDto {
    /// Unique identifier, never reused
    pub id: i64,
    /// Generated storage name, used as the download filename
    #[schema(example = "1714564800000-42-lab_results.pdf")]
    pub filename: String,
    /// Filename as declared by the uploader
    #[schema(example = "lab results.pdf")]
    pub original_filename: String,
    /// Size of the file in bytes
    pub filesize: i64,
    /// Timestamp when the document was uploaded
    pub created_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponseDto {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            filename: document.filename,
            original_filename: document.original_filename,
            filesize: document.filesize,
            created_at: document.created_at,
        }
    }
}

/// Response for a successful upload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadDocumentResponseDto {
    pub success: bool,
    pub message: String,
    pub document: DocumentResponseDto,
}

/// Response for the document listing, newest first
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentListResponseDto {
    pub success: bool,
    pub documents: Vec<DocumentResponseDto>,
}

pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully";
pub const DELETE_SUCCESS_MESSAGE: &str = "Document deleted successfully";
pub const NO_FILE_MESSAGE: &str = "No file uploaded";
pub const ONLY_PDF_MESSAGE: &str = "Only PDF files are allowed";
pub const DOCUMENT_NOT_FOUND_MESSAGE: &str = "Document not found";
pub const FILE_MISSING_MESSAGE: &str = "File not found on server";

/// Message for payloads above the configured limit
pub fn file_too_large_message(max_file_size: usize) -> String {
    format!(
        "File size too large. Maximum size is {}",
        crate::shared::templates::format_file_size(max_file_size as i64)
    )
}
