//! Form-submission handlers.
//!
//! Every handler validates the raw submission first and only then issues a
//! single store operation, so invalid input never reaches storage. Failures
//! come back as [`ActionError`] and can be flattened into an
//! [`ActionResult`] for presentation.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::Store;
use crate::models::{Customer, Invoice, InvoiceStats, InvoiceStatus, InvoiceWithCustomer};
use crate::validation::{self, FormData, ValidationErrors};

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    ValidationFailed(#[from] ValidationErrors),
    #[error("Cannot delete customer with existing invoices")]
    ReferentialViolation { customer_id: i32, invoice_count: usize },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ActionError {
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            ActionError::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Outcome of a submission as shown to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: BTreeMap<String, String>,
}

impl ActionResult {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(err: &ActionError) -> Self {
        Self {
            success: false,
            message: Some(err.to_string()),
            field_errors: err
                .field_errors()
                .map(|errors| errors.fields().clone())
                .unwrap_or_default(),
        }
    }

    pub fn from_result<T>(result: &Result<T, ActionError>) -> Self {
        match result {
            Ok(_) => Self::success(),
            Err(err) => Self::failure(err),
        }
    }
}

fn log_failure(operation: &str, err: &ActionError) {
    match err {
        ActionError::Storage(source) => error!(operation, error = %source, "store call failed"),
        ActionError::ReferentialViolation {
            customer_id,
            invoice_count,
        } => warn!(operation, customer_id, invoice_count, "customer still has invoices"),
        other => warn!(operation, error = %other, "request rejected"),
    }
}

fn logged<T>(operation: &str, result: Result<T, ActionError>) -> Result<T, ActionError> {
    if let Err(err) = &result {
        log_failure(operation, err);
    }
    result
}

pub async fn create_customer<S: Store>(store: &S, form: &FormData) -> Result<Customer, ActionError> {
    let result = async {
        let customer = validation::validate_customer(form)?;
        let created = store.create_customer(&customer).await?;
        info!(customer_id = created.id, "customer created");
        Ok::<_, ActionError>(created)
    }
    .await;
    logged("create_customer", result)
}

pub async fn update_customer<S: Store>(
    store: &S,
    id: i32,
    form: &FormData,
) -> Result<Customer, ActionError> {
    let result = async {
        let customer = validation::validate_customer(form)?;
        let updated = store
            .update_customer(id, &customer)
            .await?
            .ok_or(ActionError::NotFound { entity: "customer", id })?;
        info!(customer_id = id, "customer updated");
        Ok::<_, ActionError>(updated)
    }
    .await;
    logged("update_customer", result)
}

/// Delete a customer that no invoice refers to.
pub async fn delete_customer<S: Store>(store: &S, id: i32) -> Result<Vec<Customer>, ActionError> {
    let result = async {
        let invoices = store.invoices_by_customer(id).await?;
        if !invoices.is_empty() {
            return Err(ActionError::ReferentialViolation {
                customer_id: id,
                invoice_count: invoices.len(),
            });
        }
        let deleted = store.delete_customer(id).await?;
        info!(customer_id = id, rows = deleted.len(), "customer deleted");
        Ok::<_, ActionError>(deleted)
    }
    .await;
    logged("delete_customer", result)
}

pub async fn create_invoice<S: Store>(store: &S, form: &FormData) -> Result<Invoice, ActionError> {
    let result = async {
        let invoice = validation::validate_new_invoice(form)?;
        let created = store.create_invoice(&invoice).await?;
        info!(
            invoice_id = created.id,
            customer_id = created.customer_id,
            value = created.value,
            "invoice created"
        );
        Ok::<_, ActionError>(created)
    }
    .await;
    logged("create_invoice", result)
}

/// Apply the submitted fields to an invoice, leaving the rest unchanged.
pub async fn update_invoice<S: Store>(
    store: &S,
    id: i32,
    form: &FormData,
) -> Result<Invoice, ActionError> {
    let result = async {
        let patch = validation::validate_invoice_patch(form)?;
        let updated = store
            .update_invoice(id, &patch)
            .await?
            .ok_or(ActionError::NotFound { entity: "invoice", id })?;
        info!(invoice_id = id, "invoice updated");
        Ok::<_, ActionError>(updated)
    }
    .await;
    logged("update_invoice", result)
}

pub async fn update_invoice_status<S: Store>(
    store: &S,
    id: i32,
    status: &str,
) -> Result<Invoice, ActionError> {
    let result = async {
        let status = validation::validate_status(status)?;
        let updated = store
            .update_invoice_status(id, status)
            .await?
            .ok_or(ActionError::NotFound { entity: "invoice", id })?;
        info!(invoice_id = id, status = %status, "invoice status updated");
        Ok::<_, ActionError>(updated)
    }
    .await;
    logged("update_invoice_status", result)
}

pub async fn delete_invoice<S: Store>(store: &S, id: i32) -> Result<Vec<Invoice>, ActionError> {
    let result = async {
        let deleted = store.delete_invoice(id).await?;
        info!(invoice_id = id, rows = deleted.len(), "invoice deleted");
        Ok::<_, ActionError>(deleted)
    }
    .await;
    logged("delete_invoice", result)
}

pub async fn get_customer<S: Store>(store: &S, id: i32) -> Result<Customer, ActionError> {
    store
        .customer(id)
        .await?
        .ok_or(ActionError::NotFound { entity: "customer", id })
}

pub async fn get_invoice<S: Store>(store: &S, id: i32) -> Result<InvoiceWithCustomer, ActionError> {
    store
        .invoice(id)
        .await?
        .ok_or(ActionError::NotFound { entity: "invoice", id })
}

/// Customers ordered by name, optionally narrowed by a name search.
pub async fn list_customers<S: Store>(
    store: &S,
    query: Option<&str>,
) -> Result<Vec<Customer>, ActionError> {
    let customers = match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => store.search_customers(query).await?,
        None => store.customers().await?,
    };
    Ok(customers)
}

/// Invoices newest first, optionally only those with the given status.
pub async fn list_invoices<S: Store>(
    store: &S,
    status: Option<InvoiceStatus>,
) -> Result<Vec<InvoiceWithCustomer>, ActionError> {
    let invoices = match status {
        Some(status) => store.invoices_by_status(status).await?,
        None => store.invoices().await?,
    };
    Ok(invoices)
}

/// Invoices of one customer, newest first.
pub async fn list_invoices_by_customer<S: Store>(
    store: &S,
    customer_id: i32,
) -> Result<Vec<Invoice>, ActionError> {
    get_customer(store, customer_id).await?;
    Ok(store.invoices_by_customer(customer_id).await?)
}

pub async fn invoice_stats<S: Store>(store: &S) -> Result<InvoiceStats, ActionError> {
    Ok(store.invoice_stats().await?)
}
