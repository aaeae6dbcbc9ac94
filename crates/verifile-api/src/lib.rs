//! Verifile API Library
//!
//! HTTP surface for passcode issue and verification and for brokered uploads.

mod api_doc;
pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use api_doc::get_openapi_spec;
pub use error::{ErrorResponse, HttpAppError, ValidatedJson};
pub use state::AppState;
