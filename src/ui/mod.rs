pub mod components;
pub mod customer_wizard;
pub mod customers;
pub mod dashboard;
pub mod invoice_detail;
pub mod invoice_wizard;
