//! Verifile Services Layer
//!
//! Business services behind the HTTP surface: passcode issue and verification,
//! passcode delivery, signed upload tokens, and the upload broker. Handlers in
//! `verifile-api` stay thin and call into these.

pub mod otp;
pub mod tokens;
pub mod upload;

pub use otp::{
    generate_code, render_otp_email, InMemoryOtpStore, IssuedOtp, LogOtpDelivery,
    OtpCleanupService, OtpDelivery, OtpService, RecordingOtpDelivery, SmtpOtpDelivery,
    DEFAULT_PURGE_INTERVAL,
};
pub use tokens::{TokenError, TokenPurpose, TokenSigner};
pub use upload::UploadBroker;
pub use verifile_storage::{
    create_storage, LocalStorage, S3Storage, Storage, StorageBackend, StorageError, StorageResult,
};
