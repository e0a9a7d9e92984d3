mod customer;
mod invoice;
mod stats;
mod status;

pub use customer::{Customer, NewCustomer};
pub use invoice::{Invoice, InvoicePatch, InvoiceWithCustomer, NewInvoice};
pub use stats::InvoiceStats;
pub use status::InvoiceStatus;
