use axum::{routing::get, Router};
use std::sync::Arc;

use crate::features::documents::DocumentService;
use crate::features::ui::handlers::index_page;

/// Create routes for the browser page
pub fn routes(document_service: Arc<DocumentService>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .with_state(document_service)
}

#[cfg(test)]
mod tests {
    use axum::http::header;

    use crate::shared::test_helpers::test_context;

    #[tokio::test]
    async fn test_index_lists_uploaded_documents() {
        let ctx = test_context().await;
        let doc = ctx.upload("x-ray <left>.pdf", 1536).await;

        let response = ctx.server().get("/").await;

        response.assert_status_ok();
        assert!(response
            .header(header::CONTENT_TYPE)
            .to_str()
            .unwrap()
            .starts_with("text/html"));
        let html = response.text();
        assert!(html.contains(&doc.filename));
        assert!(html.contains("1.5 KB"));
        assert!(html.contains(&format!("/documents/{}", doc.id)));
        assert!(!html.contains(r#"<div class="no-documents">"#));
    }

    #[tokio::test]
    async fn test_index_escapes_display_names() {
        let ctx = test_context().await;
        ctx.upload("<img src=x onerror=alert(1)>.pdf", 10).await;

        let html = ctx.server().get("/").await.text();

        assert!(!html.contains("<img src=x"));
        assert!(html.contains("&lt;img src=x onerror=alert(1)&gt;.pdf"));
    }

    #[tokio::test]
    async fn test_index_empty_state() {
        let ctx = test_context().await;

        let response = ctx.server().get("/").await;

        response.assert_status_ok();
        assert!(response.text().contains(r#"<div class="no-documents">"#));
    }
}
