//! Object naming shared by the blob store implementations.

use crate::defaults::{ATTACHMENT_PREFIX, STORAGE_URI_SCHEME};

/// Characters that are not allowed in stored file names.
const UNSAFE_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replace characters that are unsafe in object names with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Sanitize an id used as a path segment. Empty and all-dot ids become
/// underscores so they cannot name the current or parent directory.
pub fn sanitize_path_segment(id: &str) -> String {
    if id.chars().all(|c| c == '.') {
        return "_".repeat(id.len().max(1));
    }
    sanitize_filename(id)
}

/// Object path of an attachment inside its bucket:
/// `attachments/{email_id}/{file_id}_{sanitized_name}`.
///
/// Every component is sanitized, so the path always stays below
/// `attachments/`.
pub fn attachment_object_path(email_id: &str, file_id: &str, file_name: &str) -> String {
    format!(
        "{ATTACHMENT_PREFIX}/{}/{}_{}",
        sanitize_path_segment(email_id),
        sanitize_path_segment(file_id),
        sanitize_filename(file_name)
    )
}

/// `gs://{bucket}/{object_path}`
pub fn storage_uri(bucket: &str, object_path: &str) -> String {
    format!("{STORAGE_URI_SCHEME}{bucket}/{object_path}")
}
