//! Verifile Core Library
//!
//! Domain models, error types, configuration, and validation shared by the
//! server, the client wizard, and the CLI.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use config::{BaseConfig, Config, OtpStoreKind, VerifileConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
pub use store::OtpStore;
pub use validation::ValidationError;
