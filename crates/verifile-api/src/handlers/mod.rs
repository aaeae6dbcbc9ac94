//! HTTP handlers. Business rules live in `verifile-services`.

pub mod otp;
pub mod upload;
