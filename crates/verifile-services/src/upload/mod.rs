//! Upload brokering: write targets, direct writes, and confirmation.

pub mod broker;

pub use broker::UploadBroker;
