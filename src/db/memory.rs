use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use chrono::Local;

use super::Store;
use crate::models::{
    Customer, Invoice, InvoicePatch, InvoiceStats, InvoiceStatus, InvoiceWithCustomer,
    NewCustomer, NewInvoice,
};

/// Store that keeps both tables in process memory.
///
/// Mirrors the relational behaviour the handlers rely on: ids are assigned
/// on insert, the invoice -> customer reference is enforced and listings
/// come back in the same order as the SQL queries.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    customers: Vec<Customer>,
    invoices: Vec<Invoice>,
    last_customer_id: i32,
    last_invoice_id: i32,
}

impl Tables {
    fn customer_exists(&self, id: i32) -> bool {
        self.customers.iter().any(|c| c.id == id)
    }

    fn with_customer(&self, invoice: &Invoice) -> InvoiceWithCustomer {
        InvoiceWithCustomer {
            invoice: invoice.clone(),
            customer_name: self
                .customers
                .iter()
                .find(|c| c.id == invoice.customer_id)
                .map(|c| c.name.clone()),
        }
    }

    fn newest_first<'a>(&self, invoices: impl Iterator<Item = &'a Invoice>) -> Vec<Invoice> {
        let mut invoices: Vec<Invoice> = invoices.cloned().collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        invoices
    }
}

fn foreign_key_violation(customer_id: i32) -> anyhow::Error {
    anyhow!(
        "insert or update on table \"invoices\" violates foreign key constraint: customer {customer_id} does not exist"
    )
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

impl Store for MemoryStore {
    async fn customers(&self) -> Result<Vec<Customer>> {
        let tables = self.tables()?;
        let mut customers = tables.customers.clone();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn customer(&self, id: i32) -> Result<Option<Customer>> {
        let tables = self.tables()?;
        Ok(tables.customers.iter().find(|c| c.id == id).cloned())
    }

    async fn search_customers(&self, query: &str) -> Result<Vec<Customer>> {
        let needle = query.trim().to_lowercase();
        let mut customers: Vec<Customer> = self
            .customers()
            .await?
            .into_iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .collect();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        let mut tables = self.tables()?;
        tables.last_customer_id += 1;
        let created = Customer {
            id: tables.last_customer_id,
            name: customer.name.clone(),
            email: customer.email.clone(),
            created_at: Local::now().naive_local(),
        };
        tables.customers.push(created.clone());
        Ok(created)
    }

    async fn update_customer(&self, id: i32, customer: &NewCustomer) -> Result<Option<Customer>> {
        let mut tables = self.tables()?;
        let updated = tables.customers.iter_mut().find(|c| c.id == id).map(|c| {
            c.name = customer.name.clone();
            c.email = customer.email.clone();
            c.clone()
        });
        Ok(updated)
    }

    async fn delete_customer(&self, id: i32) -> Result<Vec<Customer>> {
        let mut tables = self.tables()?;
        if tables.invoices.iter().any(|i| i.customer_id == id) {
            bail!(
                "update or delete on table \"customers\" violates foreign key constraint: customer {id} is still referenced"
            );
        }
        let (deleted, kept): (Vec<Customer>, Vec<Customer>) =
            tables.customers.drain(..).partition(|c| c.id == id);
        tables.customers = kept;
        Ok(deleted)
    }

    async fn invoices(&self) -> Result<Vec<InvoiceWithCustomer>> {
        let tables = self.tables()?;
        let invoices = tables.newest_first(tables.invoices.iter());
        Ok(invoices.iter().map(|i| tables.with_customer(i)).collect())
    }

    async fn invoice(&self, id: i32) -> Result<Option<InvoiceWithCustomer>> {
        let tables = self.tables()?;
        Ok(tables
            .invoices
            .iter()
            .find(|i| i.id == id)
            .map(|i| tables.with_customer(i)))
    }

    async fn invoices_by_customer(&self, customer_id: i32) -> Result<Vec<Invoice>> {
        let tables = self.tables()?;
        Ok(tables.newest_first(
            tables
                .invoices
                .iter()
                .filter(|i| i.customer_id == customer_id),
        ))
    }

    async fn invoices_by_status(&self, status: InvoiceStatus) -> Result<Vec<InvoiceWithCustomer>> {
        let tables = self.tables()?;
        let invoices = tables.newest_first(tables.invoices.iter().filter(|i| i.status == status));
        Ok(invoices.iter().map(|i| tables.with_customer(i)).collect())
    }

    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<Invoice> {
        let mut tables = self.tables()?;
        if !tables.customer_exists(invoice.customer_id) {
            return Err(foreign_key_violation(invoice.customer_id));
        }
        tables.last_invoice_id += 1;
        let created = Invoice {
            id: tables.last_invoice_id,
            created_at: Local::now().naive_local(),
            value: invoice.value,
            description: invoice.description.clone(),
            customer_id: invoice.customer_id,
            status: invoice.status,
        };
        tables.invoices.push(created.clone());
        Ok(created)
    }

    async fn update_invoice(&self, id: i32, patch: &InvoicePatch) -> Result<Option<Invoice>> {
        let mut tables = self.tables()?;
        if let Some(customer_id) = patch.customer_id {
            if !tables.customer_exists(customer_id) {
                return Err(foreign_key_violation(customer_id));
            }
        }
        let updated = tables.invoices.iter_mut().find(|i| i.id == id).map(|invoice| {
            patch.apply_to(invoice);
            invoice.clone()
        });
        Ok(updated)
    }

    async fn update_invoice_status(
        &self,
        id: i32,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>> {
        let patch = InvoicePatch {
            status: Some(status),
            ..InvoicePatch::default()
        };
        self.update_invoice(id, &patch).await
    }

    async fn delete_invoice(&self, id: i32) -> Result<Vec<Invoice>> {
        let mut tables = self.tables()?;
        let (deleted, kept): (Vec<Invoice>, Vec<Invoice>) =
            tables.invoices.drain(..).partition(|i| i.id == id);
        tables.invoices = kept;
        Ok(deleted)
    }

    async fn invoice_stats(&self) -> Result<InvoiceStats> {
        let tables = self.tables()?;
        let mut stats = InvoiceStats::default();
        for invoice in &tables.invoices {
            let value = i64::from(invoice.value);
            stats.total_invoices += 1;
            stats.total_amount += value;
            match invoice.status {
                InvoiceStatus::Open => stats.outstanding_amount += value,
                InvoiceStatus::Paid => stats.paid_amount += value,
                InvoiceStatus::Void => stats.void_amount += value,
                InvoiceStatus::Uncollectible => stats.uncollectible_amount += value,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_customer(name: &str) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    fn new_invoice(customer_id: i32, value: i32, status: InvoiceStatus) -> NewInvoice {
        NewInvoice {
            value,
            description: None,
            customer_id,
            status,
        }
    }

    #[tokio::test]
    async fn assigns_increasing_ids() {
        let store = MemoryStore::new();
        let first = store.create_customer(&new_customer("Ada")).await.unwrap();
        let second = store.create_customer(&new_customer("Grace")).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn customers_are_ordered_by_name() {
        let store = MemoryStore::new();
        store.create_customer(&new_customer("Zed")).await.unwrap();
        store.create_customer(&new_customer("Ada")).await.unwrap();

        let names: Vec<String> = store
            .customers()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Ada", "Zed"]);
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let store = MemoryStore::new();
        store.create_customer(&new_customer("Acme Corp")).await.unwrap();
        store.create_customer(&new_customer("Globex")).await.unwrap();

        let found = store.search_customers("acme").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Acme Corp");
    }

    #[tokio::test]
    async fn invoice_requires_existing_customer() {
        let store = MemoryStore::new();
        let result = store
            .create_invoice(&new_invoice(42, 100, InvoiceStatus::Open))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn listings_are_newest_first_with_customer_name() {
        let store = MemoryStore::new();
        let customer = store.create_customer(&new_customer("Ada")).await.unwrap();
        let older = store
            .create_invoice(&new_invoice(customer.id, 100, InvoiceStatus::Open))
            .await
            .unwrap();
        let newer = store
            .create_invoice(&new_invoice(customer.id, 200, InvoiceStatus::Paid))
            .await
            .unwrap();

        let listed = store.invoices().await.unwrap();
        assert_eq!(listed[0].invoice.id, newer.id);
        assert_eq!(listed[1].invoice.id, older.id);
        assert_eq!(listed[0].customer_name.as_deref(), Some("Ada"));

        let open = store.invoices_by_status(InvoiceStatus::Open).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].invoice.id, older.id);
    }

    #[tokio::test]
    async fn delete_returns_removed_rows() {
        let store = MemoryStore::new();
        let customer = store.create_customer(&new_customer("Ada")).await.unwrap();
        let invoice = store
            .create_invoice(&new_invoice(customer.id, 100, InvoiceStatus::Open))
            .await
            .unwrap();

        assert_eq!(store.delete_invoice(invoice.id).await.unwrap(), vec![invoice]);
        assert!(store.delete_invoice(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn referenced_customer_cannot_be_deleted() {
        let store = MemoryStore::new();
        let customer = store.create_customer(&new_customer("Ada")).await.unwrap();
        store
            .create_invoice(&new_invoice(customer.id, 100, InvoiceStatus::Open))
            .await
            .unwrap();

        assert!(store.delete_customer(customer.id).await.is_err());
        assert!(store.customer(customer.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn stats_sum_values_per_status() {
        let store = MemoryStore::new();
        let customer = store.create_customer(&new_customer("Ada")).await.unwrap();
        for (value, status) in [
            (100, InvoiceStatus::Open),
            (250, InvoiceStatus::Open),
            (400, InvoiceStatus::Paid),
            (30, InvoiceStatus::Void),
            (7, InvoiceStatus::Uncollectible),
        ] {
            store
                .create_invoice(&new_invoice(customer.id, value, status))
                .await
                .unwrap();
        }

        let stats = store.invoice_stats().await.unwrap();
        assert_eq!(
            stats,
            InvoiceStats {
                total_invoices: 5,
                total_amount: 787,
                paid_amount: 400,
                outstanding_amount: 350,
                void_amount: 30,
                uncollectible_amount: 7,
            }
        );
    }
}
