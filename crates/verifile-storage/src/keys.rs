//! Shared key generation for storage backends.

use uuid::Uuid;
use verifile_core::validation::sanitize_file_name;

pub const UPLOAD_PREFIX: &str = "uploads";

/// `uploads/{uuid}/{sanitized file name}`. The UUID keeps repeated names apart.
pub fn generate_upload_key(file_name: &str) -> String {
    format!(
        "{}/{}/{}",
        UPLOAD_PREFIX,
        Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}

/// True for keys produced by [`generate_upload_key`].
pub fn is_upload_key(key: &str) -> bool {
    let mut parts = key.split('/');
    matches!(
        (parts.next(), parts.next(), parts.next(), parts.next()),
        (Some(UPLOAD_PREFIX), Some(id), Some(name), None)
            if Uuid::parse_str(id).is_ok() && !name.is_empty() && name != ".."
    )
}

/// Last path segment of a key.
pub fn file_name_from_key(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
