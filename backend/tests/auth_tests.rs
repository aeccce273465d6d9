//! Authentication input tests

use proptest::prelude::*;

use shared::validation::{validate_email, validate_password};

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("anna@gelateria.it").is_ok());
        assert!(validate_email("info@esempio.com").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign.it").is_err());
        assert!(validate_email("a@b").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("").is_err());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any password of at least 8 characters passes the length check
        #[test]
        fn prop_password_length_threshold(password in "[a-zA-Z0-9!?_-]{8,40}") {
            prop_assert!(validate_password(&password).is_ok());
        }

        /// Any shorter password is refused
        #[test]
        fn prop_short_password_refused(password in "[a-zA-Z0-9!?_-]{0,7}") {
            prop_assert!(validate_password(&password).is_err());
        }
    }
}
