//! Field-level validation of submitted forms.
//!
//! Validators take the raw [`FormData`] of a submission, check every field
//! and either return a typed record ready for the store or the full set of
//! failing fields. They perform no I/O.

mod customer;
mod invoice;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

pub use customer::{EMAIL, NAME, validate_customer};
pub use invoice::{
    CUSTOMER_ID, DESCRIPTION, STATUS, VALUE, validate_invoice_patch,
    validate_new_invoice, validate_status,
};

/// Raw text of a submitted form, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: HashMap<String, String>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field, builder style.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Raw value of a field, `None` when the field was not submitted.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed value of a field, `None` when absent or blank.
    pub fn get_trimmed(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

impl<K, V> FromIterator<(K, V)> for FormData
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Every failing field of a submission with its message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message for a field; the first message per field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// `Ok(value)` when nothing failed.
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_data_distinguishes_blank_from_missing() {
        let form = FormData::new().with("name", "   ");
        assert_eq!(form.get("name"), Some("   "));
        assert_eq!(form.get_trimmed("name"), None);
        assert!(form.contains("name"));
        assert!(!form.contains("email"));
    }

    #[test]
    fn form_data_collects_pairs() {
        let form: FormData = [("name", "Ada"), ("email", "ada@example.com")]
            .into_iter()
            .collect();
        assert_eq!(form.get("email"), Some("ada@example.com"));
    }

    #[test]
    fn errors_keep_first_message_and_render_in_field_order() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Name is required");
        errors.add("email", "Invalid email format");
        errors.add("name", "ignored");

        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(
            errors.to_string(),
            "email: Invalid email format; name: Name is required"
        );
    }

    #[test]
    fn into_result_only_builds_on_success() {
        assert_eq!(ValidationErrors::new().into_result(|| 5), Ok(5));
        let failed = ValidationErrors::single("value", "bad").into_result(|| 5);
        assert!(failed.is_err());
    }
}
