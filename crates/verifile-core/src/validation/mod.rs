//! Field validation shared by the intake wizard and the HTTP handlers.

pub mod email;
pub mod file;
pub mod otp;

pub use email::{is_valid_email, normalize_email, validate_email};
pub use file::{sanitize_file_name, validate_file_name, validate_file_size};
pub use otp::{is_complete_otp, sanitize_otp_input, validate_otp_code};

/// Validation failures for user-supplied fields
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Please enter a valid email address")]
    InvalidEmail(String),

    #[error("File size must be less than {}", size_limit_text(.max))]
    FileTooLarge { size: u64, max: u64 },

    #[error("Please select a file to upload")]
    MissingFile,

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Please enter a valid 6-digit OTP")]
    InvalidOtp,
}

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Human-readable size limit: whole megabytes when exact, else kilobytes, else bytes.
pub fn format_size_limit(bytes: u64) -> String {
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{}KB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

fn size_limit_text(max: &u64) -> String {
    format_size_limit(*max)
}
