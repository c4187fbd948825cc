use axum::Router;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::core::config::StorageConfig;
use crate::core::database::run_migrations;
use crate::features::documents::models::Document;
use crate::features::documents::{self, DocumentService};
use crate::features::ui;
use crate::modules::storage::{LocalStorage, StorageBackend};
use crate::shared::constants::{PDF_MIME_TYPE, UPLOAD_FIELD_NAME};

/// A service wired to an in-memory database and a throwaway upload directory
pub struct TestContext {
    pub pool: SqlitePool,
    pub service: Arc<DocumentService>,
    server: TestServer,
    upload_dir: TempDir,
}

impl TestContext {
    pub fn server(&self) -> &TestServer {
        &self.server
    }

    pub fn upload_dir(&self) -> &Path {
        self.upload_dir.path()
    }

    /// Upload a valid PDF of `len` bytes through the service
    pub async fn upload(&self, name: &str, len: usize) -> Document {
        self.service
            .upload(pdf_bytes(len), name, PDF_MIME_TYPE)
            .await
            .unwrap()
    }

    /// A second service over the same database and directory with its own I/O timeout
    pub fn service_with_timeout(&self, io_timeout: Duration) -> DocumentService {
        DocumentService::new(
            self.pool.clone(),
            Arc::new(LocalStorage::new(self.upload_dir.path(), io_timeout)),
            self.service.max_file_size(),
        )
    }

    pub async fn row_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Number of entries in the upload directory, temp files included
    pub fn stored_file_count(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path())
            .unwrap()
            .filter(|entry| entry.as_ref().map(|e| e.path().is_file()).unwrap_or(false))
            .count()
    }
}

pub async fn test_context() -> TestContext {
    test_context_with(|storage| storage).await
}

/// Build a context whose storage backend is wrapped by `wrap`
pub async fn test_context_with<F>(wrap: F) -> TestContext
where
    F: FnOnce(Arc<dyn StorageBackend>) -> Arc<dyn StorageBackend>,
{
    // One connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();

    let upload_dir = TempDir::new().unwrap();
    let config = StorageConfig {
        upload_dir: upload_dir.path().to_path_buf(),
        ..StorageConfig::default()
    };
    let storage: Arc<dyn StorageBackend> = Arc::new(LocalStorage::from_config(&config));

    let service = Arc::new(DocumentService::new(
        pool.clone(),
        wrap(storage),
        config.max_file_size,
    ));
    let server = test_server(Arc::clone(&service));

    TestContext {
        pool,
        service,
        server,
        upload_dir,
    }
}

pub fn test_server(service: Arc<DocumentService>) -> TestServer {
    let app = Router::new()
        .merge(documents::routes(Arc::clone(&service)))
        .merge(ui::routes(service));
    TestServer::new(app).unwrap()
}

/// Bytes that look like a PDF, exactly `len` long
pub fn pdf_bytes(len: usize) -> Vec<u8> {
    let header = b"%PDF-1.7\n";
    (0..len)
        .map(|i| header.get(i).copied().unwrap_or(b'0' + (i % 10) as u8))
        .collect()
}

/// Multipart form with a PDF in the upload field
pub fn pdf_form(name: &str, data: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part(
        UPLOAD_FIELD_NAME,
        Part::bytes(data).file_name(name).mime_type(PDF_MIME_TYPE),
    )
}

/// Poll `check` for up to two seconds
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
