use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::Money;

/// Household invoice as seen by the client.
///
/// `row` is the backend spreadsheet row and the only key used by write
/// operations. Invoices are never created client-side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub row: i64,
    pub name: String,
    pub reference: String,
    pub amount: Money,
    /// Last payment date as sent by the backend, `d/M/yyyy[ time]`.
    pub last_paid: String,
    /// Payment method, trimmed; empty when unknown.
    pub method: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Pending,
}

impl PaymentStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Paid => "Pagado",
            Self::Pending => "Pendiente",
        }
    }
}

impl Invoice {
    /// Returns `true` when the last payment falls in `today`'s month and year.
    #[must_use]
    pub fn is_paid_in(&self, today: NaiveDate) -> bool {
        paid_in_month_of(&self.last_paid, today)
    }

    #[must_use]
    pub fn status(&self, today: NaiveDate) -> PaymentStatus {
        status_for(&self.last_paid, today)
    }
}

/// Status badge for a raw payment date.
#[must_use]
pub fn status_for(last_paid: &str, today: NaiveDate) -> PaymentStatus {
    if paid_in_month_of(last_paid, today) {
        PaymentStatus::Paid
    } else {
        PaymentStatus::Pending
    }
}

/// Checks a `day/month/year[ time]` string against the month of `today`.
///
/// Anything before the first space is split on `/`; fewer than three
/// components, or a month/year that is not an integer, means "not paid".
#[must_use]
pub fn paid_in_month_of(date: &str, today: NaiveDate) -> bool {
    let base = date.trim().split(' ').next().unwrap_or_default();
    let parts: Vec<&str> = base.split('/').collect();
    if parts.len() < 3 {
        return false;
    }

    let month = parts[1].trim().parse::<u32>();
    let year = parts[2].trim().parse::<i32>();
    matches!((month, year), (Ok(m), Ok(y)) if m == today.month() && y == today.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn may_2024() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn same_month_and_year_is_paid() {
        assert!(paid_in_month_of("3/5/2024", may_2024()));
        assert!(paid_in_month_of("31/05/2024 18:22:01", may_2024()));
        assert!(paid_in_month_of("  1/5/2024  ", may_2024()));
    }

    #[test]
    fn other_months_or_years_are_pending() {
        assert!(!paid_in_month_of("3/4/2024", may_2024()));
        assert!(!paid_in_month_of("3/5/2023", may_2024()));
    }

    #[test]
    fn malformed_dates_are_never_paid() {
        for date in ["", "5/2024", "2024-05-03", "3/mayo/2024", "3/5/", "//"] {
            assert!(!paid_in_month_of(date, may_2024()), "{date:?}");
        }
    }

    #[test]
    fn status_labels() {
        let invoice = Invoice {
            row: 1,
            name: "Agua".to_string(),
            reference: "ACU-1".to_string(),
            amount: Money::new(50_000),
            last_paid: "3/5/2024".to_string(),
            method: String::new(),
        };
        assert_eq!(invoice.status(may_2024()).label(), "Pagado");
        let june = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(invoice.status(june).label(), "Pendiente");
    }
}
