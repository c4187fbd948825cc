use axum::{extract::State, response::Html};
use minijinja::context;
use serde::Serialize;
use std::sync::Arc;

use crate::core::error::AppError;
use crate::features::documents::models::Document;
use crate::features::documents::DocumentService;
use crate::shared::constants::TOAST_TIMEOUT_MS;
use crate::shared::templates::{render_template, INDEX_TEMPLATE};

/// Row shown on the page
#[derive(Debug, Serialize)]
struct DocumentView {
    id: i64,
    filename: String,
    original_filename: String,
    filesize: i64,
    created_at: String,
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        Self {
            id: document.id,
            filename: document.filename,
            original_filename: document.original_filename,
            filesize: document.filesize,
            created_at: document.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// Document list page with the upload control
pub async fn index_page(
    State(service): State<Arc<DocumentService>>,
) -> Result<Html<String>, AppError> {
    let documents: Vec<DocumentView> = service
        .list()
        .await?
        .into_iter()
        .map(DocumentView::from)
        .collect();

    let html = render_template(
        INDEX_TEMPLATE,
        context! {
            documents => documents,
            max_file_size => service.max_file_size(),
            toast_timeout_ms => TOAST_TIMEOUT_MS,
        },
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Html(html))
}
