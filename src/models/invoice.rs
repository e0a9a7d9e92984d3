use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use super::InvoiceStatus;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Invoice {
    pub id: i32,
    pub created_at: NaiveDateTime,
    /// Amount in cents
    pub value: i32,
    pub description: Option<String>,
    pub customer_id: i32,
    pub status: InvoiceStatus,
}

impl<'r> FromRow<'r, PgRow> for Invoice {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<InvoiceStatus>()
            .map_err(|err| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: Box::new(err),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            created_at: row.try_get("createTS")?,
            value: row.try_get("value")?,
            description: row.try_get("description")?,
            customer_id: row.try_get("customerId")?,
            status,
        })
    }
}

/// An invoice joined with the name of its customer.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct InvoiceWithCustomer {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub customer_name: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for InvoiceWithCustomer {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            invoice: Invoice::from_row(row)?,
            customer_name: row.try_get("customerName")?,
        })
    }
}

/// Validated fields for a new invoice.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub value: i32,
    pub description: Option<String>,
    pub customer_id: i32,
    pub status: InvoiceStatus,
}

/// Fields supplied for a partial update. `None` leaves the column unchanged;
/// `description: Some(None)` clears the description.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoicePatch {
    pub value: Option<i32>,
    pub description: Option<Option<String>>,
    pub customer_id: Option<i32>,
    pub status: Option<InvoiceStatus>,
}

impl InvoicePatch {
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.description.is_none()
            && self.customer_id.is_none()
            && self.status.is_none()
    }

    /// Apply the supplied fields to an invoice in place.
    pub fn apply_to(&self, invoice: &mut Invoice) {
        if let Some(value) = self.value {
            invoice.value = value;
        }
        if let Some(description) = &self.description {
            invoice.description = description.clone();
        }
        if let Some(customer_id) = self.customer_id {
            invoice.customer_id = customer_id;
        }
        if let Some(status) = self.status {
            invoice.status = status;
        }
    }
}
