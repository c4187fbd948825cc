use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;

use crate::shared::constants::{
    FALLBACK_FILENAME, MAX_DISPLAY_NAME_LEN, MAX_STORED_NAME_LEN, PDF_MIME_TYPE,
};

lazy_static! {
    /// Characters that never make it into a stored filename
    /// - Kept: ASCII letters, digits, '.', '_' and '-'
    /// - Replaced: spaces, path separators, quotes, non-ASCII
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r"[^A-Za-z0-9._-]").unwrap();

    /// Runs of underscores left behind by replacement
    static ref REPEATED_UNDERSCORES: Regex = Regex::new(r"_{2,}").unwrap();
}

/// Check a declared content type against `application/pdf`.
///
/// Parameters such as `; charset=binary` and letter case are ignored.
pub fn is_pdf_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME_TYPE))
        .unwrap_or(false)
}

/// Reduce a client-declared filename to a safe single path component.
///
/// Directory parts are dropped, unsafe characters become `_`, leading dots
/// are stripped and the result is capped at [`MAX_STORED_NAME_LEN`] while
/// keeping the extension. Empty results fall back to [`FALLBACK_FILENAME`].
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let replaced = UNSAFE_FILENAME_CHARS.replace_all(base, "_");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&replaced, "_");
    let trimmed = collapsed.trim_start_matches(['.', '_']).trim_end_matches('_');

    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        return FALLBACK_FILENAME.to_string();
    }

    truncate_keeping_extension(trimmed, MAX_STORED_NAME_LEN)
}

fn truncate_keeping_extension(name: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name.to_string();
    }

    // Only ASCII survives sanitizing, so byte offsets are char boundaries
    match name.rfind('.') {
        Some(dot) if name.len() - dot < max_len => {
            let extension = &name[dot..];
            let stem_len = max_len - extension.len();
            format!("{}{}", &name[..stem_len], extension)
        }
        _ => name[..max_len].to_string(),
    }
}

/// Name kept for display: the last path component of the declared name,
/// trimmed and capped at [`MAX_DISPLAY_NAME_LEN`] characters.
pub fn display_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() {
        return FALLBACK_FILENAME.to_string();
    }

    base.chars().take(MAX_DISPLAY_NAME_LEN).collect()
}

/// Build the collision-resistant storage name:
/// `<unix-millis>-<random suffix>-<sanitized original name>`
pub fn generate_storage_name(original: &str, now: DateTime<Utc>, suffix: u32) -> String {
    format!(
        "{}-{}-{}",
        now.timestamp_millis(),
        suffix,
        sanitize_filename(original)
    )
}
