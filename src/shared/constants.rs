/// The only content type accepted for uploads
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Multipart field carrying the uploaded document
pub const UPLOAD_FIELD_NAME: &str = "file";

/// Name used when the client declares no usable filename
pub const FALLBACK_FILENAME: &str = "document.pdf";

/// Longest sanitized original filename kept in storage names
pub const MAX_STORED_NAME_LEN: usize = 120;

/// Extra request body allowance for multipart framing on top of the file size limit
pub const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// How long UI notices stay visible before auto-dismissing
pub const TOAST_TIMEOUT_MS: u64 = 5000;

/// Longest original filename kept for display
pub const MAX_DISPLAY_NAME_LEN: usize = 255;
