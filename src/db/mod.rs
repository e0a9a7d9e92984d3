mod memory;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::config::Config;
use crate::models::{
    Customer, Invoice, InvoicePatch, InvoiceStats, InvoiceStatus, InvoiceWithCustomer,
    NewCustomer, NewInvoice,
};

pub use memory::MemoryStore;

const CUSTOMER_COLUMNS: &str = r#"id, name, email, "createTS""#;
const INVOICE_COLUMNS: &str = r#"id, "createTS", value, description, "customerId", status"#;
const INVOICE_WITH_CUSTOMER: &str = r#"
    SELECT i.id, i."createTS", i.value, i.description, i."customerId", i.status,
           c.name AS "customerName"
    FROM invoices i
    LEFT JOIN customers c ON c.id = i."customerId"
"#;

/// Persistence operations used by the form handlers and screens.
///
/// Each call performs a single relational operation. Implementations are
/// passed around explicitly, never reached through a global.
#[allow(async_fn_in_trait)]
pub trait Store {
    async fn customers(&self) -> Result<Vec<Customer>>;
    async fn customer(&self, id: i32) -> Result<Option<Customer>>;
    /// Case-insensitive substring match on the customer name.
    async fn search_customers(&self, query: &str) -> Result<Vec<Customer>>;
    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer>;
    async fn update_customer(&self, id: i32, customer: &NewCustomer) -> Result<Option<Customer>>;
    async fn delete_customer(&self, id: i32) -> Result<Vec<Customer>>;

    /// All invoices, newest first.
    async fn invoices(&self) -> Result<Vec<InvoiceWithCustomer>>;
    async fn invoice(&self, id: i32) -> Result<Option<InvoiceWithCustomer>>;
    async fn invoices_by_customer(&self, customer_id: i32) -> Result<Vec<Invoice>>;
    async fn invoices_by_status(&self, status: InvoiceStatus) -> Result<Vec<InvoiceWithCustomer>>;
    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<Invoice>;
    async fn update_invoice(&self, id: i32, patch: &InvoicePatch) -> Result<Option<Invoice>>;
    async fn update_invoice_status(&self, id: i32, status: InvoiceStatus)
        -> Result<Option<Invoice>>;
    async fn delete_invoice(&self, id: i32) -> Result<Vec<Invoice>>;
    async fn invoice_stats(&self) -> Result<InvoiceStats>;
}

/// PostgreSQL-backed store
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(config.database_url())
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!().run(self.get_pool()).await?;
        info!("database migrations applied");
        Ok(())
    }
}

impl Store for Database {
    async fn customers(&self) -> Result<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name ASC"
        ))
        .fetch_all(self.get_pool())
        .await?;

        Ok(customers)
    }

    async fn customer(&self, id: i32) -> Result<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(customer)
    }

    async fn search_customers(&self, query: &str) -> Result<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE name ILIKE $1 ORDER BY name ASC"
        ))
        .bind(like_pattern(query))
        .fetch_all(self.get_pool())
        .await?;

        Ok(customers)
    }

    async fn create_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        let created = sqlx::query_as::<_, Customer>(&format!(
            "INSERT INTO customers (name, email) VALUES ($1, $2) RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(&customer.name)
        .bind(&customer.email)
        .fetch_one(self.get_pool())
        .await?;

        Ok(created)
    }

    async fn update_customer(&self, id: i32, customer: &NewCustomer) -> Result<Option<Customer>> {
        let updated = sqlx::query_as::<_, Customer>(&format!(
            "UPDATE customers SET name = $1, email = $2 WHERE id = $3 RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(updated)
    }

    async fn delete_customer(&self, id: i32) -> Result<Vec<Customer>> {
        let deleted = sqlx::query_as::<_, Customer>(&format!(
            "DELETE FROM customers WHERE id = $1 RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(deleted)
    }

    async fn invoices(&self) -> Result<Vec<InvoiceWithCustomer>> {
        let invoices = sqlx::query_as::<_, InvoiceWithCustomer>(&format!(
            r#"{INVOICE_WITH_CUSTOMER} ORDER BY i."createTS" DESC, i.id DESC"#
        ))
        .fetch_all(self.get_pool())
        .await?;

        Ok(invoices)
    }

    async fn invoice(&self, id: i32) -> Result<Option<InvoiceWithCustomer>> {
        let invoice = sqlx::query_as::<_, InvoiceWithCustomer>(&format!(
            "{INVOICE_WITH_CUSTOMER} WHERE i.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(invoice)
    }

    async fn invoices_by_customer(&self, customer_id: i32) -> Result<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"SELECT {INVOICE_COLUMNS} FROM invoices WHERE "customerId" = $1 ORDER BY "createTS" DESC, id DESC"#
        ))
        .bind(customer_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(invoices)
    }

    async fn invoices_by_status(&self, status: InvoiceStatus) -> Result<Vec<InvoiceWithCustomer>> {
        let invoices = sqlx::query_as::<_, InvoiceWithCustomer>(&format!(
            r#"{INVOICE_WITH_CUSTOMER} WHERE i.status = $1 ORDER BY i."createTS" DESC, i.id DESC"#
        ))
        .bind(status.as_str())
        .fetch_all(self.get_pool())
        .await?;

        Ok(invoices)
    }

    async fn create_invoice(&self, invoice: &NewInvoice) -> Result<Invoice> {
        let created = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (value, description, "customerId", status)
            VALUES ($1, $2, $3, $4)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice.value)
        .bind(&invoice.description)
        .bind(invoice.customer_id)
        .bind(invoice.status.as_str())
        .fetch_one(self.get_pool())
        .await?;

        Ok(created)
    }

    async fn update_invoice(&self, id: i32, patch: &InvoicePatch) -> Result<Option<Invoice>> {
        if patch.is_empty() {
            let current = sqlx::query_as::<_, Invoice>(&format!(
                "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(self.get_pool())
            .await?;
            return Ok(current);
        }

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE invoices SET ");
        let mut fields = builder.separated(", ");
        if let Some(value) = patch.value {
            fields.push("value = ").push_bind_unseparated(value);
        }
        if let Some(description) = &patch.description {
            fields
                .push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(customer_id) = patch.customer_id {
            fields
                .push(r#""customerId" = "#)
                .push_bind_unseparated(customer_id);
        }
        if let Some(status) = patch.status {
            fields.push("status = ").push_bind_unseparated(status.as_str());
        }
        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ")
            .push(INVOICE_COLUMNS);

        let updated = builder
            .build_query_as::<Invoice>()
            .fetch_optional(self.get_pool())
            .await?;

        Ok(updated)
    }

    async fn update_invoice_status(
        &self,
        id: i32,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>> {
        let updated = sqlx::query_as::<_, Invoice>(&format!(
            "UPDATE invoices SET status = $1 WHERE id = $2 RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(updated)
    }

    async fn delete_invoice(&self, id: i32) -> Result<Vec<Invoice>> {
        let deleted = sqlx::query_as::<_, Invoice>(&format!(
            "DELETE FROM invoices WHERE id = $1 RETURNING {INVOICE_COLUMNS}"
        ))
        .bind(id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(deleted)
    }

    async fn invoice_stats(&self) -> Result<InvoiceStats> {
        let stats = sqlx::query_as::<_, InvoiceStats>(
            r#"
            SELECT
                COUNT(*) AS total_invoices,
                COALESCE(SUM(value), 0)::BIGINT AS total_amount,
                COALESCE(SUM(CASE WHEN status = 'paid' THEN value ELSE 0 END), 0)::BIGINT AS paid_amount,
                COALESCE(SUM(CASE WHEN status = 'open' THEN value ELSE 0 END), 0)::BIGINT AS outstanding_amount,
                COALESCE(SUM(CASE WHEN status = 'void' THEN value ELSE 0 END), 0)::BIGINT AS void_amount,
                COALESCE(SUM(CASE WHEN status = 'uncollectible' THEN value ELSE 0 END), 0)::BIGINT AS uncollectible_amount
            FROM invoices
            "#,
        )
        .fetch_one(self.get_pool())
        .await?;

        Ok(stats)
    }
}

/// The store selected by `DATABASE_URL`.
pub enum Backend {
    Postgres(Database),
    Memory(MemoryStore),
}

/// Connect to the configured store, applying migrations when asked to
pub async fn init(config: &Config) -> Result<Backend> {
    if config.uses_memory_store() {
        info!("using in-memory store, data is discarded on exit");
        return Ok(Backend::Memory(MemoryStore::new()));
    }

    let db = Database::new(config).await?;
    info!(max_connections = config.max_connections, "database connection established");

    if config.run_migrations {
        db.run_migrations().await?;
    }

    Ok(Backend::Postgres(db))
}

/// `ILIKE` pattern matching `query` anywhere, with wildcards escaped.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("acme"), "%acme%");
        assert_eq!(like_pattern(" 50%_off "), r"%50\%\_off%");
        assert_eq!(like_pattern(""), "%%");
    }
}
