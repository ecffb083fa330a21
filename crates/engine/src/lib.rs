//! Domain core of the household invoice tracker.
//!
//! Everything here is pure: money formatting and parsing, the "paid this
//! month" rule, list filtering, client-side KPIs and the editable-cell state
//! machine. Network, storage and rendering live in the front end crate.

pub use cell::{CellEditor, CellState, CellValue, Commit, EMPTY_METHOD, Field};
pub use currency::Currency;
pub use filter::{Filters, FiltersPatch, MethodFilter, StatusFilter, extract_methods, filter};
pub use invoice::{Invoice, PaymentStatus, paid_in_month_of, status_for};
pub use kpis::{Kpis, pending_this_month};
pub use money::{Money, only_digits};

pub mod cell;
mod currency;
pub mod filter;
mod invoice;
pub mod kpis;
pub mod money;
