use chrono::NaiveDate;

use crate::{Invoice, Money};

/// Headline figures computed client-side from the full invoice list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Kpis {
    pub total: usize,
    pub paid: usize,
    pub pending: usize,
    /// Sum of the invoices paid this month.
    pub paid_amount: Money,
    /// Sum of the invoices still pending this month.
    pub pending_amount: Money,
    /// Method with the highest cumulative amount; ties keep the first seen.
    pub top_method: Option<String>,
}

impl Kpis {
    #[must_use]
    pub fn compute(invoices: &[Invoice], today: NaiveDate) -> Self {
        let mut kpis = Kpis {
            total: invoices.len(),
            ..Kpis::default()
        };
        let mut by_method: Vec<(&str, Money)> = Vec::new();

        for invoice in invoices {
            if invoice.is_paid_in(today) {
                kpis.paid += 1;
                kpis.paid_amount += invoice.amount;
            } else {
                kpis.pending += 1;
                kpis.pending_amount += invoice.amount;
            }

            let method = invoice.method.trim();
            if method.is_empty() {
                continue;
            }
            match by_method.iter_mut().find(|(name, _)| *name == method) {
                Some((_, total)) => *total += invoice.amount,
                None => by_method.push((method, invoice.amount)),
            }
        }

        let mut top: Option<(&str, Money)> = None;
        for (method, total) in by_method {
            if top.is_none_or(|(_, best)| total > best) {
                top = Some((method, total));
            }
        }
        kpis.top_method = top.map(|(method, _)| method.to_string());
        kpis
    }
}

/// Invoices not paid this month, in list order.
#[must_use]
pub fn pending_this_month(invoices: &[Invoice], today: NaiveDate) -> Vec<&Invoice> {
    invoices
        .iter()
        .filter(|invoice| !invoice.is_paid_in(today))
        .collect()
}
