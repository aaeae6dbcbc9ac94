//! Limits shared by the client and the server.

/// Number of digits in a one-time passcode.
pub const OTP_LENGTH: usize = 6;

/// Default lifetime of an issued passcode.
pub const OTP_EXPIRY_MINUTES: i64 = 10;

/// Failed verification attempts tolerated before a code is burned.
pub const OTP_MAX_ATTEMPTS: u32 = 5;

/// Largest file accepted at intake (10 MB).
pub const MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Longest file name accepted by the upload broker.
pub const MAX_FILE_NAME_LENGTH: usize = 255;
