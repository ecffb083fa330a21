use api_types::RawAmount;
use engine::{Currency, Money};
use ratatui::{
    style::{Color, Style},
    text::Span,
};

use crate::client::money_from;

/// Placeholder for values the backend did not send.
pub const MISSING: &str = "—";

/// Formatted amount in the given color.
#[must_use]
pub fn styled_amount(amount: Money, currency: Currency, color: Color) -> Span<'static> {
    Span::styled(amount.format(currency), Style::default().fg(color))
}

/// Backend amount formatted for display, or [`MISSING`] when absent.
#[must_use]
pub fn raw_amount_text(raw: Option<&RawAmount>, currency: Currency) -> String {
    match raw {
        Some(_) => money_from(raw).format(currency),
        None => MISSING.to_string(),
    }
}

/// Text bar such as `████████░░ 80%`; empty track when `total` is zero.
#[must_use]
pub fn inline_progress_bar(done: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return "░".repeat(width);
    }
    let filled = (done * width / total).min(width);
    let percentage = done * 100 / total;
    format!(
        "{}{} {percentage}%",
        "█".repeat(filled),
        "░".repeat(width - filled)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_amounts_use_placeholder() {
        assert_eq!(raw_amount_text(None, Currency::Cop), "—");
        assert_eq!(
            raw_amount_text(Some(&RawAmount::Text("$ 1.200".into())), Currency::Cop),
            "$\u{a0}1.200"
        );
    }

    #[test]
    fn progress_bar_scales() {
        assert_eq!(inline_progress_bar(0, 0, 4), "░░░░");
        assert_eq!(inline_progress_bar(1, 2, 4), "██░░ 50%");
        assert_eq!(inline_progress_bar(3, 3, 4), "████ 100%");
    }
}
