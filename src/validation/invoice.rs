use super::{FormData, ValidationErrors};
use crate::models::{InvoicePatch, InvoiceStatus, NewInvoice};
use crate::money::{self, Money, MoneyError};

pub const VALUE: &str = "value";
pub const CUSTOMER_ID: &str = "customer_id";
pub const DESCRIPTION: &str = "description";
pub const STATUS: &str = "status";

const INVALID_STATUS: &str = "Invalid invoice status";

/// Check a minor-unit amount the way the store-facing schema does.
pub fn validate_cents(cents: i64) -> Result<i32, String> {
    Money::from_cents(cents)
        .map(Money::cents)
        .map_err(|err| match err {
            MoneyError::TooManyDecimalPlaces => {
                "Value must be a valid monetary amount with at most 2 decimal places".to_string()
            }
            other => other.to_string(),
        })
}

pub fn validate_status(raw: &str) -> Result<InvoiceStatus, ValidationErrors> {
    raw.parse::<InvoiceStatus>()
        .map_err(|_| ValidationErrors::single(STATUS, INVALID_STATUS))
}

/// Validate a new-invoice form.
pub fn validate_new_invoice(form: &FormData) -> Result<NewInvoice, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let value = match form.get(VALUE) {
        Some(raw) => check_value(raw, &mut errors),
        None => {
            errors.add(VALUE, MoneyError::EmptyInput.to_string());
            None
        }
    };

    let customer_id = match form.get_trimmed(CUSTOMER_ID) {
        Some(raw) => check_customer_id(raw, &mut errors),
        None => {
            errors.add(CUSTOMER_ID, "Please select a customer");
            None
        }
    };

    let status = match form.get_trimmed(STATUS) {
        Some(raw) => check_status(raw, &mut errors),
        None => Some(InvoiceStatus::default()),
    };

    let description = description_text(form);

    match (value, customer_id, status) {
        (Some(value), Some(customer_id), Some(status)) if errors.is_empty() => Ok(NewInvoice {
            value,
            description,
            customer_id,
            status,
        }),
        _ => Err(errors),
    }
}

/// Validate a partial update. Only submitted fields are checked and applied.
pub fn validate_invoice_patch(form: &FormData) -> Result<InvoicePatch, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let mut patch = InvoicePatch::default();

    if let Some(raw) = form.get(VALUE) {
        patch.value = check_value(raw, &mut errors);
    }
    if let Some(raw) = form.get(CUSTOMER_ID) {
        patch.customer_id = check_customer_id(raw.trim(), &mut errors);
    }
    if let Some(raw) = form.get(STATUS) {
        patch.status = check_status(raw, &mut errors);
    }
    if form.contains(DESCRIPTION) {
        patch.description = Some(description_text(form));
    }

    errors.into_result(|| patch)
}

// Blank clears the description; anything else is kept as typed.
fn description_text(form: &FormData) -> Option<String> {
    form.get(DESCRIPTION)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

fn check_value(raw: &str, errors: &mut ValidationErrors) -> Option<i32> {
    let checked = money::parse_amount(raw)
        .map_err(|err| err.to_string())
        .and_then(|money| validate_cents(i64::from(money.cents())));

    match checked {
        Ok(cents) => Some(cents),
        Err(message) => {
            errors.add(VALUE, message);
            None
        }
    }
}

fn check_customer_id(raw: &str, errors: &mut ValidationErrors) -> Option<i32> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Some(id),
        _ => {
            errors.add(CUSTOMER_ID, "Customer ID must be a positive integer");
            None
        }
    }
}

fn check_status(raw: &str, errors: &mut ValidationErrors) -> Option<InvoiceStatus> {
    match raw.parse::<InvoiceStatus>() {
        Ok(status) => Some(status),
        Err(_) => {
            errors.add(STATUS, INVALID_STATUS);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn invoice_form(value: &str, customer_id: &str) -> FormData {
        FormData::new()
            .with(VALUE, value)
            .with(CUSTOMER_ID, customer_id)
    }

    #[test]
    fn builds_new_invoice_with_defaults() {
        let invoice = validate_new_invoice(&invoice_form("12,64", "3")).expect("valid");
        assert_eq!(
            invoice,
            NewInvoice {
                value: 1264,
                description: None,
                customer_id: 3,
                status: InvoiceStatus::Open,
            }
        );
    }

    #[test]
    fn keeps_description_and_explicit_status() {
        let form = invoice_form("100", "1")
            .with(DESCRIPTION, "  March retainer ")
            .with(STATUS, "paid");
        let invoice = validate_new_invoice(&form).expect("valid");
        assert_eq!(invoice.description.as_deref(), Some("  March retainer "));
        assert_eq!(invoice.status, InvoiceStatus::Paid);
    }

    #[test]
    fn blank_status_defaults_to_open() {
        let form = invoice_form("1", "1").with(STATUS, "");
        assert_eq!(
            validate_new_invoice(&form).map(|i| i.status),
            Ok(InvoiceStatus::Open)
        );
    }

    #[rstest]
    #[case("0", "Value must be a positive number")]
    #[case("-5", "Value must be a positive number")]
    #[case("", "Value must be a positive number")]
    #[case("ten", "Please enter a valid number")]
    fn reports_value_errors(#[case] value: &str, #[case] message: &str) {
        let errors = validate_new_invoice(&invoice_form(value, "1")).unwrap_err();
        assert_eq!(errors.get(VALUE), Some(message));
    }

    #[test]
    fn missing_value_asks_for_one() {
        let form = FormData::new().with(CUSTOMER_ID, "1");
        let errors = validate_new_invoice(&form).unwrap_err();
        assert_eq!(errors.get(VALUE), Some("Please enter an invoice value"));
    }

    #[rstest]
    #[case("0")]
    #[case("-2")]
    #[case("abc")]
    #[case("1.5")]
    fn customer_reference_must_be_positive_integer(#[case] customer_id: &str) {
        let errors = validate_new_invoice(&invoice_form("10", customer_id)).unwrap_err();
        assert_eq!(
            errors.get(CUSTOMER_ID),
            Some("Customer ID must be a positive integer")
        );
    }

    #[test]
    fn missing_customer_asks_for_selection() {
        let form = FormData::new().with(VALUE, "10");
        let errors = validate_new_invoice(&form).unwrap_err();
        assert_eq!(errors.get(CUSTOMER_ID), Some("Please select a customer"));
    }

    #[test]
    fn unknown_status_fails() {
        let form = invoice_form("10", "1").with(STATUS, "draft");
        let errors = validate_new_invoice(&form).unwrap_err();
        assert_eq!(errors.get(STATUS), Some("Invalid invoice status"));
    }

    #[test]
    fn patch_only_contains_submitted_fields() {
        let form = FormData::new().with(STATUS, "void");
        let patch = validate_invoice_patch(&form).expect("valid patch");
        assert_eq!(
            patch,
            InvoicePatch {
                status: Some(InvoiceStatus::Void),
                ..InvoicePatch::default()
            }
        );
    }

    #[test]
    fn patch_keeps_description_as_typed() {
        let form = FormData::new().with(DESCRIPTION, " Q2\tsupport ");
        let patch = validate_invoice_patch(&form).expect("valid patch");
        assert_eq!(patch.description, Some(Some(" Q2\tsupport ".to_string())));
    }

    #[test]
    fn patch_with_blank_description_clears_it() {
        let form = FormData::new().with(DESCRIPTION, " ").with(VALUE, "3,5");
        let patch = validate_invoice_patch(&form).expect("valid patch");
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.value, Some(350));
    }

    #[test]
    fn patch_validates_supplied_fields() {
        let form = FormData::new()
            .with(VALUE, "0")
            .with(CUSTOMER_ID, "x")
            .with(STATUS, "closed");
        let errors = validate_invoice_patch(&form).unwrap_err();
        assert!(errors.get(VALUE).is_some());
        assert!(errors.get(CUSTOMER_ID).is_some());
        assert!(errors.get(STATUS).is_some());
    }

    #[test]
    fn every_status_validates() {
        for status in InvoiceStatus::ALL {
            assert_eq!(validate_status(status.as_str()), Ok(status));
        }
        assert!(validate_status("refunded").is_err());
    }

    #[test]
    fn cents_must_be_positive() {
        assert_eq!(validate_cents(1264), Ok(1264));
        assert!(validate_cents(0).is_err());
        assert!(validate_cents(i64::from(i32::MAX) + 1).is_err());
    }
}
