pub mod otp;
pub mod session;
pub mod upload;

pub use otp::*;
pub use session::*;
pub use upload::*;
