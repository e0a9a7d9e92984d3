use std::sync::LazyLock;

use regex::Regex;

use super::{FormData, ValidationErrors};
use crate::models::NewCustomer;

pub const NAME: &str = "name";
pub const EMAIL: &str = "email";

// Local part, `@`, then dot-separated labels ending in a 2+ letter TLD.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_'+\-.]*[A-Za-z0-9_+\-]@([A-Za-z0-9][A-Za-z0-9\-]*\.)+[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

pub fn is_valid_email(email: &str) -> bool {
    !email.starts_with('.') && !email.contains("..") && EMAIL_PATTERN.is_match(email)
}

/// Validate the customer form used for both create and update.
pub fn validate_customer(form: &FormData) -> Result<NewCustomer, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = form.get_trimmed(NAME);
    if name.is_none() {
        errors.add(NAME, "Name is required");
    }

    let email = form.get_trimmed(EMAIL).unwrap_or_default();
    if !is_valid_email(email) {
        errors.add(EMAIL, "Invalid email format");
    }

    errors.into_result(|| NewCustomer {
        name: name.unwrap_or_default().to_string(),
        email: email.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn form(name: &str, email: &str) -> FormData {
        FormData::new().with(NAME, name).with(EMAIL, email)
    }

    #[test]
    fn accepts_and_trims_valid_customer() {
        let customer = validate_customer(&form("  Ada Lovelace ", " ada@example.com"))
            .expect("valid customer");
        assert_eq!(customer.name, "Ada Lovelace");
        assert_eq!(customer.email, "ada@example.com");
    }

    #[test]
    fn blank_name_is_required() {
        let errors = validate_customer(&form("   ", "ada@example.com")).unwrap_err();
        assert_eq!(errors.get(NAME), Some("Name is required"));
        assert_eq!(errors.get(EMAIL), None);
    }

    #[test]
    fn reports_every_failing_field() {
        let errors = validate_customer(&FormData::new()).unwrap_err();
        assert_eq!(errors.get(NAME), Some("Name is required"));
        assert_eq!(errors.get(EMAIL), Some("Invalid email format"));
    }

    #[rstest]
    #[case("ada@example.com")]
    #[case("first.last+tag@mail.example.co.uk")]
    #[case("o'brien@example.ie")]
    #[case("x_y-z@sub-domain.example.org")]
    fn accepts_email(#[case] email: &str) {
        assert!(is_valid_email(email), "{email} should be valid");
    }

    #[rstest]
    #[case("not-an-email")]
    #[case("")]
    #[case("@example.com")]
    #[case("ada@")]
    #[case("ada@example")]
    #[case("ada@example.c")]
    #[case(".ada@example.com")]
    #[case("ada..b@example.com")]
    #[case("ada.@example.com")]
    #[case("ada@-example.com")]
    #[case("ada lovelace@example.com")]
    fn rejects_email(#[case] email: &str) {
        assert!(!is_valid_email(email), "{email} should be invalid");
    }
}
