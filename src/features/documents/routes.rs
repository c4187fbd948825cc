use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::documents::handlers::{
    delete_document, download_document, list_documents, upload_document,
};
use crate::features::documents::services::DocumentService;
use crate::shared::constants::MULTIPART_OVERHEAD;

/// Create routes for the documents feature
pub fn routes(document_service: Arc<DocumentService>) -> Router {
    // Allow body size up to the file limit + buffer for multipart overhead
    let body_limit = document_service.max_file_size() + MULTIPART_OVERHEAD;

    Router::new()
        .route(
            "/documents/upload",
            post(upload_document).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/documents", get(list_documents))
        .route(
            "/documents/{id}",
            get(download_document).delete(delete_document),
        )
        .with_state(document_service)
}

#[cfg(test)]
mod tests {
    use axum::http::{header, StatusCode};
    use axum_test::multipart::{MultipartForm, Part};
    use fake::faker::lorem::en::Word;
    use fake::Fake;
    use serde_json::Value;

    use crate::features::documents::dtos::{
        DocumentListResponseDto, UploadDocumentResponseDto, FILE_MISSING_MESSAGE,
    };
    use crate::shared::constants::MULTIPART_OVERHEAD;
    use crate::shared::test_helpers::{pdf_bytes, pdf_form, test_context, TestContext};

    async fn upload(ctx: &TestContext, name: &str, len: usize) -> UploadDocumentResponseDto {
        let response = ctx
            .server()
            .post("/documents/upload")
            .multipart(pdf_form(name, pdf_bytes(len)))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<UploadDocumentResponseDto>()
    }

    async fn list(ctx: &TestContext) -> DocumentListResponseDto {
        let response = ctx.server().get("/documents").await;
        response.assert_status_ok();
        response.json::<DocumentListResponseDto>()
    }

    #[tokio::test]
    async fn test_upload_returns_created_document() {
        let ctx = test_context().await;

        let body = upload(&ctx, "lab results.pdf", 2048).await;

        assert!(body.success);
        assert_eq!(body.message, "File uploaded successfully");
        assert_eq!(body.document.filesize, 2048);
        assert_eq!(body.document.original_filename, "lab results.pdf");
        assert!(body.document.filename.ends_with("-lab_results.pdf"));
    }

    #[tokio::test]
    async fn test_upload_without_file_is_bad_request() {
        let ctx = test_context().await;
        let form = MultipartForm::new().add_text("note", "no file here");

        let response = ctx.server().post("/documents/upload").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_upload_non_pdf_is_rejected_and_nothing_stored() {
        let ctx = test_context().await;
        upload(&ctx, "existing.pdf", 10).await;

        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(b"just text".to_vec())
                .file_name("notes.txt")
                .mime_type("text/plain"),
        );
        let response = ctx.server().post("/documents/upload").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["message"], "Only PDF files are allowed");
        assert_eq!(list(&ctx).await.documents.len(), 1);
        assert_eq!(ctx.stored_file_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let ctx = test_context().await;
        let too_big = pdf_bytes(ctx.service.max_file_size() + 1);

        let response = ctx
            .server()
            .post("/documents/upload")
            .multipart(pdf_form("huge.pdf", too_big))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let message = response.json::<Value>()["message"].as_str().unwrap().to_string();
        assert!(message.starts_with("File size too large"));
        assert!(list(&ctx).await.documents.is_empty());
        assert_eq!(ctx.stored_file_count(), 0);
    }

    #[tokio::test]
    async fn test_body_over_request_limit_is_rejected_as_too_large() {
        let ctx = test_context().await;
        // Leading field alone exceeds the request body limit before the file is reached
        let padding = vec![b'x'; ctx.service.max_file_size() + MULTIPART_OVERHEAD + 1];
        let form = MultipartForm::new()
            .add_part("padding", Part::bytes(padding))
            .add_part(
                "file",
                Part::bytes(pdf_bytes(10))
                    .file_name("small.pdf")
                    .mime_type("application/pdf"),
            );

        let response = ctx.server().post("/documents/upload").multipart(form).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "File size too large. Maximum size is 10 MB");
        assert!(list(&ctx).await.documents.is_empty());
        assert_eq!(ctx.stored_file_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_at_exact_limit_is_accepted() {
        let ctx = test_context().await;
        let max = ctx.service.max_file_size();

        let body = upload(&ctx, "limit.pdf", max).await;

        assert_eq!(body.document.filesize, max as i64);
    }

    #[tokio::test]
    async fn test_list_returns_newest_first() {
        let ctx = test_context().await;
        let a = upload(&ctx, "a.pdf", 1).await.document;
        let b = upload(&ctx, "b.pdf", 2).await.document;
        let c = upload(&ctx, "c.pdf", 3).await.document;

        let body = list(&ctx).await;

        assert!(body.success);
        let ids: Vec<i64> = body.documents.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[tokio::test]
    async fn test_list_empty_is_success() {
        let ctx = test_context().await;
        let response = ctx.server().get("/documents").await;
        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["success"], true);
        assert_eq!(body["documents"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_uploads_minus_deletes_remain() {
        let ctx = test_context().await;
        let mut uploaded = Vec::new();
        for i in 0..5 {
            let name = format!("{}.pdf", Word().fake::<String>());
            uploaded.push(upload(&ctx, &name, 100 + i * 37).await.document);
        }

        for doc in uploaded.iter().step_by(2) {
            ctx.server()
                .delete(&format!("/documents/{}", doc.id))
                .await
                .assert_status_ok();
        }

        let remaining = list(&ctx).await.documents;
        assert_eq!(remaining.len(), 2);
        for doc in &remaining {
            let original = uploaded.iter().find(|u| u.id == doc.id).unwrap();
            assert_eq!(doc.filesize, original.filesize);
        }
        assert_eq!(ctx.stored_file_count(), 2);
    }

    #[tokio::test]
    async fn test_download_streams_pdf() {
        let ctx = test_context().await;
        let doc = upload(&ctx, "scan.pdf", 300).await.document;

        let response = ctx.server().get(&format!("/documents/{}", doc.id)).await;

        response.assert_status_ok();
        assert_eq!(response.header(header::CONTENT_TYPE), "application/pdf");
        let disposition = response.header(header::CONTENT_DISPOSITION);
        assert!(disposition
            .to_str()
            .unwrap()
            .contains(&format!("filename=\"{}\"", doc.filename)));
        assert_eq!(response.as_bytes().as_ref(), pdf_bytes(300).as_slice());
    }

    #[tokio::test]
    async fn test_download_unknown_id_is_not_found() {
        let ctx = test_context().await;

        let response = ctx.server().get("/documents/424242").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["message"], "Document not found");
    }

    #[tokio::test]
    async fn test_download_after_file_removed_is_not_found() {
        let ctx = test_context().await;
        let doc = upload(&ctx, "scan.pdf", 10).await.document;
        for entry in std::fs::read_dir(ctx.upload_dir()).unwrap() {
            std::fs::remove_file(entry.unwrap().path()).unwrap();
        }

        let response = ctx.server().get(&format!("/documents/{}", doc.id)).await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["message"], FILE_MISSING_MESSAGE);
    }

    #[tokio::test]
    async fn test_malformed_id_is_bad_request() {
        let ctx = test_context().await;

        let response = ctx.server().get("/documents/not-a-number").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["success"], false);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_leaves_others_untouched() {
        let ctx = test_context().await;
        upload(&ctx, "keep.pdf", 10).await;

        let response = ctx.server().delete("/documents/999").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["message"], "Document not found");
        assert_eq!(list(&ctx).await.documents.len(), 1);
        assert_eq!(ctx.stored_file_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_twice_second_is_not_found() {
        let ctx = test_context().await;
        let doc = upload(&ctx, "gone.pdf", 10).await.document;
        let path = format!("/documents/{}", doc.id);

        let first = ctx.server().delete(&path).await;
        first.assert_status_ok();
        let body = first.json::<Value>();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Document deleted successfully");

        ctx.server().delete(&path).await.assert_status(StatusCode::NOT_FOUND);
        assert!(list(&ctx).await.documents.is_empty());
        ctx.server().get(&path).await.assert_status(StatusCode::NOT_FOUND);
    }
}
