use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{debug, error};

use crate::core::error::AppError;
use crate::core::extractor::AppPath;
use crate::features::documents::dtos::{
    file_too_large_message, DocumentListResponseDto, DocumentResponseDto,
    UploadDocumentDto, UploadDocumentResponseDto, DELETE_SUCCESS_MESSAGE, NO_FILE_MESSAGE,
    ONLY_PDF_MESSAGE, UPLOAD_SUCCESS_MESSAGE,
};
use crate::features::documents::services::DocumentService;
use crate::shared::constants::{FALLBACK_FILENAME, PDF_MIME_TYPE, UPLOAD_FIELD_NAME};
use crate::shared::types::ApiResponse;
use crate::shared::validation::is_pdf_content_type;

/// Upload a PDF document
///
/// Accepts multipart/form-data with a single `file` field holding a PDF
/// of at most the configured size.
#[utoipa::path(
    post,
    path = "/documents/upload",
    tag = "documents",
    request_body(
        content = UploadDocumentDto,
        content_type = "multipart/form-data",
        description = "Multipart form with the PDF in the `file` field",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = UploadDocumentResponseDto),
        (status = 400, description = "No file, not a PDF, or file too large", body = ApiResponse),
        (status = 500, description = "Failed to persist the document", body = ApiResponse)
    )
)]
pub async fn upload_document(
    State(service): State<Arc<DocumentService>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadDocumentResponseDto>), AppError> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Rejected upload body: {}", e);
        AppError::BadRequest(NO_FILE_MESSAGE.to_string())
    })?;
    let max_file_size = service.max_file_size();

    let mut upload: Option<(Vec<u8>, String, String)> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        multipart_error(e.status(), max_file_size, e.body_text())
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != UPLOAD_FIELD_NAME || upload.is_some() {
            debug!("Ignoring field: {}", field_name);
            continue;
        }

        let content_type = field.content_type().unwrap_or("").to_string();
        // Checked before a single payload byte is read
        if !is_pdf_content_type(&content_type) {
            debug!("Rejected upload with content type '{}'", content_type);
            return Err(AppError::Validation(ONLY_PDF_MESSAGE.to_string()));
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            multipart_error(e.status(), max_file_size, e.body_text())
        })? {
            if data.len() + chunk.len() > max_file_size {
                return Err(AppError::Validation(file_too_large_message(max_file_size)));
            }
            data.extend_from_slice(&chunk);
        }

        upload = Some((data, file_name, content_type));
    }

    let (data, file_name, content_type) =
        upload.ok_or_else(|| AppError::BadRequest(NO_FILE_MESSAGE.to_string()))?;

    let document = service.upload(data, &file_name, &content_type).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadDocumentResponseDto {
            success: true,
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
            document: document.into(),
        }),
    ))
}

fn multipart_error(status: StatusCode, max_file_size: usize, detail: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Validation(file_too_large_message(max_file_size))
    } else {
        AppError::BadRequest(format!("Failed to read multipart data: {}", detail))
    }
}

/// List all documents, newest first
#[utoipa::path(
    get,
    path = "/documents",
    tag = "documents",
    responses(
        (status = 200, description = "All stored documents", body = DocumentListResponseDto),
        (status = 500, description = "Failed to retrieve documents", body = ApiResponse)
    )
)]
pub async fn list_documents(
    State(service): State<Arc<DocumentService>>,
) -> Result<Json<DocumentListResponseDto>, AppError> {
    let documents = service.list().await?;

    Ok(Json(DocumentListResponseDto {
        success: true,
        documents: documents
            .into_iter()
            .map(DocumentResponseDto::from)
            .collect(),
    }))
}

/// Download a document
///
/// Streams the stored PDF as an attachment named after the generated filename.
#[utoipa::path(
    get,
    path = "/documents/{id}",
    tag = "documents",
    params(
        ("id" = i64, Path, description = "Document id")
    ),
    responses(
        (status = 200, description = "PDF file stream (application/pdf)"),
        (status = 400, description = "Malformed id", body = ApiResponse),
        (status = 404, description = "Document or its file not found", body = ApiResponse)
    )
)]
pub async fn download_document(
    State(service): State<Arc<DocumentService>>,
    AppPath(id): AppPath<i64>,
) -> Result<Response, AppError> {
    let download = service.open_download(id).await?;

    let disposition = HeaderValue::from_str(&content_disposition(&download.filename))
        .map_err(|e| AppError::Internal(format!("Invalid Content-Disposition: {}", e)))?;

    // Headers are committed once streaming starts; later failures can only be logged
    let stream = ReaderStream::new(download.file).inspect_err(move |e| {
        error!("Download of document {} failed mid-stream: {}", id, e);
    });

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(PDF_MIME_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(download.len)),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// `attachment` disposition with both the plain and RFC 5987 encoded name
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(filename)
    )
}

/// Delete a document and its stored file
#[utoipa::path(
    delete,
    path = "/documents/{id}",
    tag = "documents",
    params(
        ("id" = i64, Path, description = "Document id")
    ),
    responses(
        (status = 200, description = "Document deleted successfully", body = ApiResponse),
        (status = 400, description = "Malformed id", body = ApiResponse),
        (status = 404, description = "Document not found", body = ApiResponse),
        (status = 500, description = "Failed to delete document", body = ApiResponse)
    )
)]
pub async fn delete_document(
    State(service): State<Arc<DocumentService>>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<ApiResponse>, AppError> {
    service.delete(id).await?;

    Ok(Json(ApiResponse::success(DELETE_SUCCESS_MESSAGE)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii_name() {
        assert_eq!(
            content_disposition("1714564800000-42-scan.pdf"),
            "attachment; filename=\"1714564800000-42-scan.pdf\"; filename*=UTF-8''1714564800000-42-scan.pdf"
        );
    }

    #[test]
    fn test_content_disposition_escapes_unsafe_characters() {
        let value = content_disposition("a \"b\" é.pdf");
        assert!(value.starts_with("attachment; filename=\"a _b_ _.pdf\";"));
        assert!(value.ends_with("filename*=UTF-8''a%20%22b%22%20%C3%A9.pdf"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }
}
