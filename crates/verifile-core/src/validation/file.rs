use crate::constants::MAX_FILE_NAME_LENGTH;

use super::ValidationError;

/// Reject files strictly larger than `max` bytes.
pub fn validate_file_size(size: u64, max: u64) -> Result<(), ValidationError> {
    if size > max {
        return Err(ValidationError::FileTooLarge { size, max });
    }
    Ok(())
}

pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidFilename(
            "Filename must not be empty".to_string(),
        ));
    }
    if name.chars().count() > MAX_FILE_NAME_LENGTH {
        return Err(ValidationError::InvalidFilename(format!(
            "Filename must be at most {} characters",
            MAX_FILE_NAME_LENGTH
        )));
    }
    Ok(())
}

/// Reduce a client-supplied file name to a single safe storage key segment.
///
/// Path separators and control characters become `_`, leading dots are stripped
/// so the segment can never be `.` or `..`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_control() || c == '/' || c == '\\' || c == '?' || c == '#' || c == '%' {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}
