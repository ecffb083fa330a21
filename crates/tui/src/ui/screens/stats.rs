use api_types::{RawAmount, stats::Statistics};
use engine::{Currency, pending_this_month};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Cell, Clear, Paragraph, Row, Table},
};

use crate::{
    app::{AppState, StatsModal, StatsTab},
    ui::{
        components::{
            card::Card,
            centered_rect,
            money::{MISSING, raw_amount_text},
            tabs::render_tabs,
        },
        sanitize,
        theme::Theme,
    },
};

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let Some(modal) = &state.stats_modal else {
        return;
    };

    let popup = centered_rect(80, 80, area);
    frame.render_widget(Clear, popup);

    let card = Card::new("Estadísticas", theme).focused(true);
    let inner = card.inner(popup);
    frame.render_widget(card.block(), popup);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Tabs
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Tab body
            Constraint::Length(1), // Footer
        ])
        .split(inner);

    render_tabs(frame, layout[0], modal.tab, theme);
    render_body(frame, layout[2], state, modal, theme);

    let updated = state
        .store
        .meta()
        .last_stats_at
        .map(|at| at.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| MISSING.to_string());
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!("Actualizado: {updated}"),
            Style::default().fg(theme.dim),
        ))
        .alignment(Alignment::Right),
        layout[3],
    );
}

fn render_body(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &AppState,
    modal: &StatsModal,
    theme: &Theme,
) {
    if modal.loading {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Cargando estadísticas…",
                Style::default().fg(theme.dim),
            ))
            .alignment(Alignment::Center),
            area,
        );
        return;
    }

    // The pending tab is computed locally and does not need the backend.
    if modal.tab == StatsTab::Pending {
        render_pending(frame, area, state, theme);
        return;
    }

    if let Some(error) = &modal.error {
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("❌ {}", sanitize(error)),
                Style::default().fg(theme.error),
            ))
            .alignment(Alignment::Center),
            area,
        );
        return;
    }

    let empty = Statistics::default();
    let stats = state.store.stats().unwrap_or(&empty);
    let currency = state.currency;

    match modal.tab {
        StatsTab::Summary => render_summary(frame, area, stats, currency, theme),
        StatsTab::Methods => {
            let rows = stats.by_metodo.as_deref().unwrap_or_default();
            render_totals(
                frame,
                area,
                "Método",
                rows.iter()
                    .map(|row| (row.metodo.as_deref(), row.total.as_ref())),
                "Sin desglose por método todavía 💳",
                currency,
                theme,
            );
        }
        StatsTab::Months => {
            let rows = stats.by_mes.as_deref().unwrap_or_default();
            render_totals(
                frame,
                area,
                "Mes",
                rows.iter().map(|row| (row.mes.as_deref(), row.total.as_ref())),
                "Sin histórico por mes todavía 📅",
                currency,
                theme,
            );
        }
        StatsTab::Top => {
            let rows = stats.top_facturas.as_deref().unwrap_or_default();
            render_totals(
                frame,
                area,
                "Factura",
                rows.iter()
                    .map(|row| (row.nombre.as_deref(), row.total.as_ref())),
                "Sin facturas destacadas todavía",
                currency,
                theme,
            );
        }
        StatsTab::Pending => {}
    }
}

fn render_summary(
    frame: &mut Frame<'_>,
    area: Rect,
    stats: &Statistics,
    currency: Currency,
    theme: &Theme,
) {
    let count = |value: Option<i64>| value.map_or_else(|| MISSING.to_string(), |n| n.to_string());
    let entries = [
        ("Total histórico", raw_amount_text(stats.total_pagado.as_ref(), currency)),
        ("Pagos este mes", count(stats.pagos_este_mes)),
        ("Total este mes", raw_amount_text(stats.total_este_mes.as_ref(), currency)),
        ("Registros", count(stats.total_registros)),
    ];

    let lines = entries
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{label:<18}"), Style::default().fg(theme.dim)),
                Span::styled(
                    value,
                    Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
                ),
            ])
        })
        .collect::<Vec<_>>();
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_totals<'a>(
    frame: &mut Frame<'_>,
    area: Rect,
    label: &'static str,
    rows: impl Iterator<Item = (Option<&'a str>, Option<&'a RawAmount>)>,
    empty: &'static str,
    currency: Currency,
    theme: &Theme,
) {
    let rows = rows
        .map(|(name, total)| {
            Row::new(vec![
                Cell::from(name.map_or_else(|| MISSING.to_string(), sanitize)),
                Cell::from(raw_amount_text(total, currency)),
            ])
        })
        .collect::<Vec<_>>();

    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(empty, Style::default().fg(theme.dim))),
            area,
        );
        return;
    }

    let header = Row::new(vec![Cell::from(label), Cell::from("Total")])
        .style(Style::default().fg(theme.dim).add_modifier(Modifier::BOLD));
    let table = Table::new(rows, [Constraint::Min(20), Constraint::Length(16)])
        .header(header)
        .style(Style::default().fg(theme.text));
    frame.render_widget(table, area);
}

fn render_pending(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let pending = pending_this_month(state.store.invoices(), state.today);
    let limit = state.pending_preview;

    let mut lines = vec![Line::from(vec![
        Span::styled(
            "Pendientes este mes: ",
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(pending.len().to_string()),
    ])];

    if pending.is_empty() {
        lines.push(Line::from(Span::styled(
            "Nada pendiente. Milagro.",
            Style::default().fg(theme.dim),
        )));
        frame.render_widget(Paragraph::new(lines), area);
        return;
    }

    lines.push(Line::default());
    for invoice in pending.iter().take(limit) {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<28}", sanitize(&invoice.name)),
                Style::default().fg(theme.text),
            ),
            Span::styled(
                invoice.amount.format(state.currency),
                Style::default().fg(theme.warning),
            ),
        ]));
    }
    if pending.len() > limit {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!("Mostrando hasta {limit} de {}.", pending.len()),
            Style::default().fg(theme.dim),
        )));
    }

    frame.render_widget(Paragraph::new(lines), area);
}
