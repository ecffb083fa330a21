use engine::{Currency, Kpis};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::Span,
};

use crate::ui::{
    components::{
        card::StatCard,
        money::{MISSING, inline_progress_bar, styled_amount},
    },
    theme::Theme,
};

/// Shown under the paid total until month-over-month comparison exists.
pub const MONTH_DELTA_PLACEHOLDER: &str = "vs mes anterior: (próximamente)";

/// Four cards computed from the full invoice list.
pub fn render(frame: &mut Frame<'_>, area: Rect, kpis: &Kpis, currency: Currency, theme: &Theme) {
    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(area);

    StatCard::new(
        "Pagadas",
        Span::styled(
            format!("{} / {}", kpis.paid, kpis.total),
            Style::default().fg(theme.positive),
        ),
        theme,
    )
    .subtitle(inline_progress_bar(kpis.paid, kpis.total, 10))
    .render(frame, cards[0]);

    StatCard::new(
        "Pagado este mes",
        styled_amount(kpis.paid_amount, currency, theme.positive),
        theme,
    )
    .subtitle(MONTH_DELTA_PLACEHOLDER)
    .render(frame, cards[1]);

    StatCard::new(
        "Pendiente",
        styled_amount(kpis.pending_amount, currency, theme.warning),
        theme,
    )
    .subtitle(format!("{} facturas", kpis.pending))
    .render(frame, cards[2]);

    let top = kpis.top_method.clone().unwrap_or_else(|| MISSING.to_string());
    StatCard::new(
        "Método principal",
        Span::styled(top, Style::default().fg(theme.text)),
        theme,
    )
    .render(frame, cards[3]);
}
