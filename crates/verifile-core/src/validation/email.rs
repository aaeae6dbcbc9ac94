use regex::Regex;
use std::sync::LazyLock;

use super::ValidationError;

/// One `@`, no whitespace, and a dotted domain part.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Basic syntactic check used before leaving the intake step.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail(email.to_string()))
    }
}

/// Canonical form used as the passcode store key and inside upload grants.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_basic_addresses() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("your.email@example.com"));
        assert!(is_valid_email("first+tag@sub.domain.org"));
    }

    #[test]
    fn rejects_missing_at_or_domain_suffix() {
        for s in [
            "",
            "plainaddress",
            "a.b.com",
            "a@b",
            "a@",
            "@b.com",
            "a@b.",
            "a b@c.com",
            "a@@b.com",
            "a@b .com",
        ] {
            assert!(!is_valid_email(s), "{:?} should be rejected", s);
        }
    }

    #[test]
    fn validate_email_reports_offending_value() {
        assert_eq!(
            validate_email("nope"),
            Err(ValidationError::InvalidEmail("nope".to_string()))
        );
        assert!(validate_email("a@b.com").is_ok());
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_email("  User@Example.COM "), "user@example.com");
    }
}
