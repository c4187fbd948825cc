use chrono::Utc;
use sqlx::SqlitePool;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::fs::File;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::documents::dtos::{
    file_too_large_message, DOCUMENT_NOT_FOUND_MESSAGE, FILE_MISSING_MESSAGE, ONLY_PDF_MESSAGE,
};
use crate::features::documents::models::Document;
use crate::modules::storage::StorageBackend;
use crate::shared::keyed_lock::KeyedLocks;
use crate::shared::validation::{display_filename, generate_storage_name, is_pdf_content_type};

const DOCUMENT_COLUMNS: &str = "id, filename, original_filename, filepath, filesize, created_at";

/// An opened document ready to be streamed back to the caller
pub struct DocumentDownload {
    pub file: File,
    pub filename: String,
    pub len: u64,
}

/// Service for document operations
///
/// Coordinates the storage backend (payload bytes) and the `documents`
/// table (metadata) so that a row exists exactly when its file does.
pub struct DocumentService {
    pool: SqlitePool,
    storage: Arc<dyn StorageBackend>,
    locks: KeyedLocks<i64>,
    max_file_size: usize,
}

impl DocumentService {
    pub fn new(pool: SqlitePool, storage: Arc<dyn StorageBackend>, max_file_size: usize) -> Self {
        Self {
            pool,
            storage,
            locks: KeyedLocks::new(),
            max_file_size,
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Store a PDF and record its metadata
    ///
    /// # Arguments
    /// * `data` - The complete payload
    /// * `original_filename` - Filename declared by the client
    /// * `content_type` - Declared MIME type, must be `application/pdf`
    ///
    /// The payload is written before the row is inserted; if the insert
    /// fails the written file is removed again.
    pub async fn upload(
        &self,
        data: Vec<u8>,
        original_filename: &str,
        content_type: &str,
    ) -> Result<Document> {
        if !is_pdf_content_type(content_type) {
            return Err(AppError::Validation(ONLY_PDF_MESSAGE.to_string()));
        }
        if data.len() > self.max_file_size {
            return Err(AppError::Validation(file_too_large_message(
                self.max_file_size,
            )));
        }

        let created_at = Utc::now();
        let filename = generate_storage_name(original_filename, created_at, random_suffix());
        let original_filename = display_filename(original_filename);
        let filesize = data.len() as i64;

        let filepath = self.storage.write(&filename, &data).await?;
        debug!("Document payload written: {}", filepath);

        let inserted = async {
            let mut tx = self.pool.begin().await?;
            let document = sqlx::query_as::<_, Document>(&format!(
                r#"
                INSERT INTO documents (filename, original_filename, filepath, filesize, created_at)
                VALUES (?, ?, ?, ?, ?)
                RETURNING {}
                "#,
                DOCUMENT_COLUMNS
            ))
            .bind(&filename)
            .bind(&original_filename)
            .bind(&filepath)
            .bind(filesize)
            .bind(created_at)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok::<_, AppError>(document)
        }
        .await;

        match inserted {
            Ok(document) => {
                info!(
                    "Document stored: id={}, filename={}, size={}",
                    document.id, document.filename, document.filesize
                );
                Ok(document)
            }
            Err(e) => {
                warn!("Metadata insert failed, removing {}: {}", filepath, e);
                if let Err(cleanup) = self.storage.delete(&filepath).await {
                    error!("Failed to remove orphaned upload {}: {}", filepath, cleanup);
                }
                Err(e)
            }
        }
    }

    /// All documents, newest first
    pub async fn list(&self) -> Result<Vec<Document>> {
        let documents = sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents ORDER BY created_at DESC, id DESC",
            DOCUMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        debug!("Listed {} documents", documents.len());
        Ok(documents)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Document> {
        sqlx::query_as::<_, Document>(&format!(
            "SELECT {} FROM documents WHERE id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(DOCUMENT_NOT_FOUND_MESSAGE.to_string()))
    }

    /// Look up a document and open its payload
    ///
    /// A row whose file has disappeared from disk is reported as not found.
    pub async fn open_download(&self, id: i64) -> Result<DocumentDownload> {
        let document = self.find_by_id(id).await?;

        if !self.storage.exists(&document.filepath).await? {
            warn!(
                "Document {} references missing file {}",
                document.id, document.filepath
            );
            return Err(AppError::NotFound(FILE_MISSING_MESSAGE.to_string()));
        }

        let file = match self.storage.open(&document.filepath).await {
            Ok(file) => file,
            // Removed between the existence check and the open
            Err(AppError::Storage(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound(FILE_MISSING_MESSAGE.to_string()));
            }
            Err(e) => return Err(e),
        };
        let len = file.metadata().await?.len();

        debug!("Opened document {} for download ({} bytes)", document.id, len);

        Ok(DocumentDownload {
            file,
            filename: document.filename,
            len,
        })
    }

    /// Delete a document's file and then its row
    ///
    /// Mutations of the same id are serialized through a per-id lock, so
    /// the lookup, file removal and row delete run as one unit. If the
    /// file is still on disk after a failed removal the row is kept and
    /// the error is returned.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.locks.lock(id).await;

        let document = self.find_by_id(id).await?;

        let removed = match self.storage.delete(&document.filepath).await {
            Ok(removed) => removed,
            // A removal abandoned at the deadline may still have unlinked the file
            Err(AppError::Timeout(detail)) => {
                if self.storage.exists(&document.filepath).await? {
                    warn!(
                        "Removal of {} timed out, keeping document {}",
                        document.filepath, document.id
                    );
                    return Err(AppError::Timeout(detail));
                }
                warn!(
                    "Removal of {} timed out after the file was gone",
                    document.filepath
                );
                true
            }
            Err(e) => return Err(e),
        };
        if !removed {
            warn!(
                "File for document {} was already missing: {}",
                document.id, document.filepath
            );
        }

        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!("Document {} row vanished before delete", id);
            return Err(AppError::NotFound(DOCUMENT_NOT_FOUND_MESSAGE.to_string()));
        }

        info!(
            "Document deleted: id={}, filename={}",
            document.id, document.filename
        );

        Ok(())
    }
}

fn random_suffix() -> u32 {
    (Uuid::new_v4().as_u128() % 1_000_000_000) as u32
}
