pub mod invoices;
pub mod stats;
