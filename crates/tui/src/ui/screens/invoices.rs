use engine::{CellValue, Field, Invoice, Kpis, PaymentStatus};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState},
};

use crate::{
    app::{AppState, Column},
    ui::{components::kpis, sanitize, theme::Theme},
};

const HEADERS: [&str; 7] = [
    "Factura",
    "Referencia",
    "Valor",
    "Método",
    "Último pago",
    "Estado",
    "",
];

pub fn render(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // KPI strip
            Constraint::Length(3), // Filters
            Constraint::Min(0),    // Table
        ])
        .split(area);

    let stats = Kpis::compute(state.store.invoices(), state.today);
    kpis::render(frame, layout[0], &stats, state.currency, theme);
    render_filters(frame, layout[1], state, theme);

    if let Some(err) = &state.load_error {
        render_message(
            frame,
            layout[2],
            Line::from(vec![
                Span::styled(
                    format!("❌ Error cargando datos: {}", sanitize(err)),
                    Style::default().fg(theme.error),
                ),
                Span::raw("  Pulsa "),
                Span::styled("r", Style::default().fg(theme.accent)),
                Span::raw(" para reintentar."),
            ]),
            theme,
        );
        return;
    }

    if state.store.filtered().is_empty() {
        let text = if state.store.invoices().is_empty() && state.store.meta().busy {
            "Cargando facturas…"
        } else if state.store.invoices().is_empty() {
            "No hay facturas."
        } else {
            "Sin resultados para los filtros actuales."
        };
        render_message(
            frame,
            layout[2],
            Line::from(Span::styled(text, Style::default().fg(theme.dim))),
            theme,
        );
        return;
    }

    render_table(frame, layout[2], state, theme);
}

fn render_filters(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let filters = state.store.filters();
    let query = if state.searching {
        format!("{}▏", sanitize(&state.search_input))
    } else if filters.query.is_empty() {
        "—".to_string()
    } else {
        sanitize(&filters.query)
    };
    let query_style = if state.searching {
        Style::default().fg(theme.accent)
    } else {
        Style::default().fg(theme.text)
    };

    let line = Line::from(vec![
        Span::styled("Buscar", Style::default().fg(theme.dim)),
        Span::raw(": "),
        Span::styled(query, query_style),
        Span::raw("   "),
        Span::styled("Estado", Style::default().fg(theme.dim)),
        Span::raw(format!(": {}   ", filters.status.label())),
        Span::styled("Método", Style::default().fg(theme.dim)),
        Span::raw(format!(": {}   ", sanitize(filters.method.label()))),
        Span::styled(
            format!("{} / {}", state.store.filtered().len(), state.store.invoices().len()),
            Style::default().fg(theme.dim),
        ),
    ]);

    let border = if state.searching {
        theme.border_focused
    } else {
        theme.border
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title(" Filtros ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_message(frame: &mut Frame<'_>, area: Rect, line: Line<'_>, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .title(" Facturas ");
    frame.render_widget(
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .block(block),
        area,
    );
}

fn render_table(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let rows = state
        .store
        .filtered()
        .iter()
        .enumerate()
        .map(|(index, invoice)| invoice_row(state, index, invoice, theme))
        .collect::<Vec<_>>();

    let header = Row::new(HEADERS.map(|title| {
        Cell::from(title).style(Style::default().fg(theme.dim).add_modifier(Modifier::BOLD))
    }));

    let widths = [
        Constraint::Min(14),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(18),
        Constraint::Length(10),
        Constraint::Length(11),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.border))
                .title(" Facturas "),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("» ");

    let mut table_state = TableState::default();
    table_state.select(Some(state.selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn invoice_row<'a>(state: &AppState, index: usize, invoice: &Invoice, theme: &Theme) -> Row<'a> {
    let selected = index == state.selected;
    let focus = |column: Column| {
        if selected && state.column == column {
            Style::default().fg(theme.accent).add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        }
    };

    let amount = editable_text(state, invoice, Field::Amount);
    let method = editable_text(state, invoice, Field::Method);

    let badge = match invoice.status(state.today) {
        PaymentStatus::Paid => Span::styled(
            PaymentStatus::Paid.label(),
            Style::default().fg(theme.positive),
        ),
        PaymentStatus::Pending => Span::styled(
            PaymentStatus::Pending.label(),
            Style::default().fg(theme.warning),
        ),
    };

    let button = if state.paying.contains(&invoice.row) {
        "⏳"
    } else {
        "Registrar"
    };

    Row::new(vec![
        Cell::from(sanitize(&invoice.name)),
        Cell::from(sanitize(&invoice.reference)),
        Cell::from(amount).style(focus(Column::Amount)),
        Cell::from(method).style(focus(Column::Method)),
        Cell::from(sanitize(&invoice.last_paid)),
        Cell::from(Line::from(badge)),
        Cell::from(button).style(focus(Column::Register)),
    ])
    .style(Style::default().fg(theme.text))
}

/// Text of an editable cell: the live editor, then a pending save, then the
/// stored value.
fn editable_text(state: &AppState, invoice: &Invoice, field: Field) -> String {
    if let Some(editor) = &state.editor
        && editor.row() == invoice.row
        && editor.field() == field
        && editor.is_editing()
    {
        return format!("{}▏", sanitize(&editor.text()));
    }
    if let Some(pending) = state.saving.get(&(invoice.row, field)) {
        return sanitize(pending);
    }
    let value = match field {
        Field::Amount => CellValue::Amount(invoice.amount),
        Field::Method => CellValue::Method(invoice.method.clone()),
    };
    sanitize(&value.display(state.currency))
}
