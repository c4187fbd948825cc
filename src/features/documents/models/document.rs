use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for stored documents
#[derive(Debug, Clone, FromRow)]
pub struct Document {
    pub id: i64,
    /// Generated storage-unique name, also offered as the download name
    pub filename: String,
    /// Name the client declared at upload time
    pub original_filename: String,
    pub filepath: String,
    pub filesize: i64,
    pub created_at: DateTime<Utc>,
}
