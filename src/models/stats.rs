use serde::Serialize;

/// Invoice totals in minor units, grouped by status.
#[derive(sqlx::FromRow, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceStats {
    pub total_invoices: i64,
    pub total_amount: i64,
    pub paid_amount: i64,
    pub outstanding_amount: i64,
    pub void_amount: i64,
    pub uncollectible_amount: i64,
}
