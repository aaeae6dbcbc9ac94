use crate::constants::OTP_LENGTH;

use super::ValidationError;

/// Keep only ASCII digits and truncate to the passcode length.
///
/// Applied to every keystroke of the passcode field, so pasted values such as
/// `"123 456"` or `"12-34-56-78"` become `"123456"`.
pub fn sanitize_otp_input(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .take(OTP_LENGTH)
        .collect()
}

/// Submission is enabled iff this returns true.
pub fn is_complete_otp(value: &str) -> bool {
    value.len() == OTP_LENGTH && value.bytes().all(|b| b.is_ascii_digit())
}

pub fn validate_otp_code(code: &str) -> Result<(), ValidationError> {
    if is_complete_otp(code) {
        Ok(())
    } else {
        Err(ValidationError::InvalidOtp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_digits_only() {
        assert_eq!(sanitize_otp_input("12a3b4"), "1234");
        assert_eq!(sanitize_otp_input("123 456"), "123456");
        assert_eq!(sanitize_otp_input("abc"), "");
        assert_eq!(sanitize_otp_input("１２３"), "");
    }

    #[test]
    fn sanitize_truncates_to_six() {
        assert_eq!(sanitize_otp_input("12345678"), "123456");
        assert_eq!(sanitize_otp_input("12-34-56-78"), "123456");
    }

    #[test]
    fn sanitized_value_never_exceeds_six_digits() {
        for raw in ["", "1", "999999999999", "x1y2z3w4v5u6t7", "000000"] {
            let v = sanitize_otp_input(raw);
            assert!(v.len() <= OTP_LENGTH);
            assert!(v.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn complete_iff_exactly_six_digits() {
        assert!(is_complete_otp("123456"));
        assert!(is_complete_otp("000000"));
        assert!(!is_complete_otp("12345"));
        assert!(!is_complete_otp("1234567"));
        assert!(!is_complete_otp("12345a"));
        assert!(!is_complete_otp(""));
        assert_eq!(validate_otp_code("12 456"), Err(ValidationError::InvalidOtp));
    }
}
