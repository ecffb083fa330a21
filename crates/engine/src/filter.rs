//! Derives the visible invoice list from the full list and the active filters.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::Invoice;

/// Payment-status selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Paid,
    Pending,
}

impl StatusFilter {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::All => "Todos",
            Self::Paid => "Pagado",
            Self::Pending => "Pendiente",
        }
    }

    /// Cycles `All → Paid → Pending → All`.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::All => Self::Paid,
            Self::Paid => Self::Pending,
            Self::Pending => Self::All,
        }
    }
}

/// Payment-method selector: everything, or one exact method.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum MethodFilter {
    #[default]
    All,
    Exact(String),
}

impl MethodFilter {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::All => "Todos",
            Self::Exact(method) => method.as_str(),
        }
    }
}

/// Active filter criteria.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Filters {
    pub query: String,
    pub status: StatusFilter,
    pub method: MethodFilter,
}

/// Partial update of [`Filters`]; `None` keeps the current value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FiltersPatch {
    pub query: Option<String>,
    pub status: Option<StatusFilter>,
    pub method: Option<MethodFilter>,
}

impl FiltersPatch {
    /// Patch that restores every criterion to its default.
    #[must_use]
    pub fn clear() -> Self {
        Self {
            query: Some(String::new()),
            status: Some(StatusFilter::All),
            method: Some(MethodFilter::All),
        }
    }
}

impl Filters {
    /// Shallow merge: fields present in `patch` replace the current ones.
    pub fn merge(&mut self, patch: FiltersPatch) {
        if let Some(query) = patch.query {
            self.query = query;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(method) = patch.method {
            self.method = method;
        }
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.query.trim().is_empty()
            && self.status == StatusFilter::All
            && self.method == MethodFilter::All
    }

    /// Returns `true` when `invoice` satisfies status, method and query.
    #[must_use]
    pub fn matches(&self, invoice: &Invoice, today: NaiveDate) -> bool {
        let paid = invoice.is_paid_in(today);
        match self.status {
            StatusFilter::Paid if !paid => return false,
            StatusFilter::Pending if paid => return false,
            _ => {}
        }

        if let MethodFilter::Exact(method) = &self.method
            && invoice.method.trim() != method.as_str()
        {
            return false;
        }

        let query = self.query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        invoice.name.to_lowercase().contains(&query)
            || invoice.reference.to_lowercase().contains(&query)
    }
}

/// Keeps the invoices matching `filters`, preserving their order.
#[must_use]
pub fn filter(invoices: &[Invoice], filters: &Filters, today: NaiveDate) -> Vec<Invoice> {
    invoices
        .iter()
        .filter(|invoice| filters.matches(invoice, today))
        .cloned()
        .collect()
}

/// Distinct non-empty payment methods, sorted.
#[must_use]
pub fn extract_methods(invoices: &[Invoice]) -> Vec<String> {
    let distinct: BTreeSet<&str> = invoices
        .iter()
        .map(|invoice| invoice.method.trim())
        .filter(|method| !method.is_empty())
        .collect();
    let mut methods: Vec<String> = distinct.into_iter().map(str::to_string).collect();
    methods.sort_by_key(|method| method.to_lowercase());
    methods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Money;

    fn invoice(row: i64, name: &str, reference: &str, last_paid: &str, method: &str) -> Invoice {
        Invoice {
            row,
            name: name.to_string(),
            reference: reference.to_string(),
            amount: Money::new(10_000 * row),
            last_paid: last_paid.to_string(),
            method: method.to_string(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    fn sample() -> Vec<Invoice> {
        vec![
            invoice(1, "Agua", "ACU-001", "3/5/2024", ""),
            invoice(2, "Luz", "EPM-77", "2/4/2024", "Nequi"),
            invoice(3, "Internet", "CLARO-9", "10/5/2024 09:10", " Nequi "),
            invoice(4, "Gas", "VANTI", "", "Daviplata"),
        ]
    }

    fn rows(list: &[Invoice]) -> Vec<i64> {
        list.iter().map(|i| i.row).collect()
    }

    #[test]
    fn default_filters_keep_everything() {
        let list = sample();
        assert_eq!(filter(&list, &Filters::default(), today()), list);
    }

    #[test]
    fn status_filter_splits_paid_and_pending() {
        let list = sample();
        let paid = Filters {
            status: StatusFilter::Paid,
            ..Filters::default()
        };
        let pending = Filters {
            status: StatusFilter::Pending,
            ..Filters::default()
        };
        assert_eq!(rows(&filter(&list, &paid, today())), vec![1, 3]);
        assert_eq!(rows(&filter(&list, &pending, today())), vec![2, 4]);
    }

    #[test]
    fn method_filter_is_trimmed_exact_and_case_sensitive() {
        let list = sample();
        let nequi = Filters {
            method: MethodFilter::Exact("Nequi".to_string()),
            ..Filters::default()
        };
        assert_eq!(rows(&filter(&list, &nequi, today())), vec![2, 3]);

        let lower = Filters {
            method: MethodFilter::Exact("nequi".to_string()),
            ..Filters::default()
        };
        assert!(filter(&list, &lower, today()).is_empty());
    }

    #[test]
    fn query_matches_name_or_reference_ignoring_case() {
        let list = sample();
        let by_name = Filters {
            query: "  LU ".to_string(),
            ..Filters::default()
        };
        assert_eq!(rows(&filter(&list, &by_name, today())), vec![2]);

        let by_reference = Filters {
            query: "claro".to_string(),
            ..Filters::default()
        };
        assert_eq!(rows(&filter(&list, &by_reference, today())), vec![3]);
    }

    #[test]
    fn criteria_combine_conjunctively() {
        let list = sample();
        let filters = Filters {
            query: "a".to_string(),
            status: StatusFilter::Pending,
            method: MethodFilter::Exact("Daviplata".to_string()),
        };
        assert_eq!(rows(&filter(&list, &filters, today())), vec![4]);
    }

    #[test]
    fn merge_only_replaces_present_fields() {
        let mut filters = Filters {
            query: "agua".to_string(),
            status: StatusFilter::Paid,
            method: MethodFilter::All,
        };
        filters.merge(FiltersPatch {
            method: Some(MethodFilter::Exact("Nequi".to_string())),
            ..FiltersPatch::default()
        });
        assert_eq!(filters.query, "agua");
        assert_eq!(filters.status, StatusFilter::Paid);
        assert_eq!(filters.method, MethodFilter::Exact("Nequi".to_string()));

        filters.merge(FiltersPatch::clear());
        assert!(filters.is_default());
    }

    #[test]
    fn extract_methods_is_distinct_trimmed_and_sorted() {
        assert_eq!(
            extract_methods(&sample()),
            vec!["Daviplata".to_string(), "Nequi".to_string()]
        );
    }

    #[test]
    fn status_cycles() {
        assert_eq!(StatusFilter::All.next(), StatusFilter::Paid);
        assert_eq!(StatusFilter::Paid.next(), StatusFilter::Pending);
        assert_eq!(StatusFilter::Pending.next(), StatusFilter::All);
    }
}
