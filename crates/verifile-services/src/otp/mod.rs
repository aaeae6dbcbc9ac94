//! One-time passcodes: generation, storage, delivery, and verification.

pub mod cleanup;
pub mod delivery;
pub mod generator;
pub mod service;
pub mod store;

pub use cleanup::{OtpCleanupService, DEFAULT_PURGE_INTERVAL};
pub use delivery::{render_otp_email, LogOtpDelivery, OtpDelivery, RecordingOtpDelivery, SmtpOtpDelivery};
pub use generator::generate_code;
pub use service::{IssuedOtp, OtpService};
pub use store::InMemoryOtpStore;
