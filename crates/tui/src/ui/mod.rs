pub mod components;
pub mod keymap;
pub mod screens;

mod terminal;
mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph},
};

use crate::app::AppState;

use components::hints::{common, hint_separator, hints_to_spans};

pub use terminal::{AppTerminal as Terminal, restore_terminal, setup_terminal};
pub use theme::Theme;

pub fn render(frame: &mut Frame<'_>, state: &AppState) {
    let theme = Theme::default();
    let area = frame.area();
    frame.render_widget(
        Block::default().style(Style::default().bg(theme.background)),
        area,
    );

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Info bar
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Bottom bar
        ])
        .split(area);

    render_info_bar(frame, layout[0], state, &theme);
    screens::invoices::render(frame, layout[1], state, &theme);
    render_bottom_bar(frame, layout[2], state, &theme);

    screens::stats::render(frame, area, state, &theme);
    components::toast::render(frame, area, state.toast.as_ref(), &theme);
}

fn render_info_bar(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let meta = state.store.meta();
    let loaded = meta
        .last_loaded_at
        .map(|at| at.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    let mut line = vec![
        Span::styled(
            sanitize(&state.app_name),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" v{}", state.version), Style::default().fg(theme.dim)),
        Span::raw("  "),
        Span::styled("Hoy", Style::default().fg(theme.dim)),
        Span::raw(format!(": {}  ", state.today.format("%d/%m/%Y"))),
        Span::styled("Actualizado", Style::default().fg(theme.dim)),
        Span::raw(format!(": {loaded}  ")),
    ];

    if meta.busy {
        line.push(Span::styled("⟳ Cargando…", Style::default().fg(theme.warning)));
    } else if !meta.last_error.is_empty() {
        line.push(Span::styled("ERR", Style::default().fg(theme.error)));
    } else {
        line.push(Span::styled("OK", Style::default().fg(theme.positive)));
    }

    frame.render_widget(Paragraph::new(Line::from(line)), area);
}

fn render_bottom_bar(frame: &mut Frame<'_>, area: Rect, state: &AppState, theme: &Theme) {
    let context = if state.stats_modal.is_some() {
        common::stats_modal()
    } else if state.editor.is_some() {
        common::editing()
    } else if state.searching {
        common::searching()
    } else {
        common::table()
    };

    let mut parts = hints_to_spans(&context, theme);
    parts.push(hint_separator(theme));
    parts.extend(hints_to_spans(&common::quit(), theme));

    frame.render_widget(Paragraph::new(Line::from(parts)), area);
}

/// Replaces control characters (escape sequences included) before backend
/// text reaches the terminal.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|ch| if ch.is_control() { '\u{fffd}' } else { ch })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, HashSet},
        sync::Arc,
        time::{Duration, Instant},
    };

    use api_types::{
        RawAmount,
        stats::{MethodTotal, Statistics},
    };
    use chrono::NaiveDate;
    use engine::{CellEditor, CellValue, Currency, Field, Invoice, Money};
    use ratatui::{Terminal, backend::TestBackend, buffer::Buffer};

    use super::*;
    use crate::{
        app::{Column, StatsModal, StatsTab, ToastLevel, ToastState},
        cache::{LocalCache, MemoryCache},
        config::CacheConfig,
        store::{Emit, Store},
    };

    fn invoice(row: i64, name: &str, amount: i64, last_paid: &str, method: &str) -> Invoice {
        Invoice {
            row,
            name: name.to_string(),
            reference: format!("REF-{row}"),
            amount: Money::new(amount),
            last_paid: last_paid.to_string(),
            method: method.to_string(),
        }
    }

    fn state_with(invoices: Vec<Invoice>) -> AppState {
        let cache = LocalCache::new(
            Arc::new(MemoryCache::new(Duration::from_secs(60))),
            &CacheConfig {
                enabled: false,
                ..CacheConfig::default()
            },
        );
        let mut store = Store::new(cache);
        store.set_filtered(invoices.clone(), Emit::Silent);
        store.set_invoices(invoices, Emit::Silent);
        AppState {
            app_name: "Facturas Hogar".to_string(),
            version: "0.1.0",
            currency: Currency::Cop,
            today: NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            pending_preview: 2,
            store,
            selected: 0,
            column: Column::Amount,
            editor: None,
            searching: false,
            search_input: String::new(),
            saving: HashMap::new(),
            paying: HashSet::new(),
            stats_modal: None,
            toast: None,
            load_error: None,
        }
    }

    fn household() -> Vec<Invoice> {
        vec![
            invoice(1, "Agua", 50_000, "3/5/2024", ""),
            invoice(2, "Luz", 120_000, "2/4/2024", "Nequi"),
            invoice(3, "Gas", 30_000, "", "Nequi"),
        ]
    }

    fn draw(state: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 32)).unwrap();
        terminal.draw(|frame| render(frame, state)).unwrap();
        buffer_text(terminal.backend().buffer())
    }

    fn buffer_text(buffer: &Buffer) -> String {
        let area = buffer.area;
        let mut out = String::new();
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn sanitize_replaces_control_characters() {
        assert_eq!(sanitize("Agua\u{1b}[31m"), "Agua\u{fffd}[31m");
        assert_eq!(sanitize("Luz\r\nGas"), "Luz\u{fffd}\u{fffd}Gas");
        assert_eq!(sanitize("Método ñ"), "Método ñ");
    }

    #[test]
    fn table_shows_badges_amounts_and_kpis() {
        let text = draw(&state_with(household()));
        assert!(text.contains("Facturas Hogar"));
        assert!(text.contains("Agua"));
        assert!(text.contains("Pagado"));
        assert!(text.contains("Pendiente"));
        assert!(text.contains("$\u{a0}120.000"));
        assert!(text.contains("1 / 3"));
        assert!(text.contains("Nequi"));
        assert!(text.contains("vs mes anterior"));
        assert!(text.contains("Registrar"));
    }

    #[test]
    fn saving_and_paying_rows_show_pending_text() {
        let mut state = state_with(household());
        state
            .saving
            .insert((1, Field::Amount), "$\u{a0}75.000".to_string());
        state.paying.insert(2);
        let text = draw(&state);
        assert!(text.contains("$\u{a0}75.000"));
        assert!(text.contains("⏳"));
    }

    #[test]
    fn editor_shows_raw_digits() {
        let mut state = state_with(household());
        let mut editor = CellEditor::new(1, CellValue::Amount(Money::new(50_000)), Currency::Cop);
        editor.begin();
        state.editor = Some(editor);
        let text = draw(&state);
        assert!(text.contains("50000▏"));
    }

    #[test]
    fn empty_and_error_states() {
        let mut state = state_with(Vec::new());
        assert!(draw(&state).contains("No hay facturas."));

        state.store.set_invoices(household(), Emit::Silent);
        state.store.set_filtered(Vec::new(), Emit::Silent);
        assert!(draw(&state).contains("Sin resultados para los filtros actuales."));

        state.load_error = Some("HTTP 500".to_string());
        assert!(draw(&state).contains("Error cargando datos: HTTP 500"));
    }

    #[test]
    fn busy_indicator_and_toast() {
        let mut state = state_with(household());
        state.store.set_busy(true, Emit::Silent);
        state.toast = Some(ToastState {
            message: "Pago registrado ✅".to_string(),
            level: ToastLevel::Success,
            expires_at: Instant::now() + Duration::from_secs(3),
        });
        let text = draw(&state);
        assert!(text.contains("Cargando…"));
        assert!(text.contains("Pago registrado"));
    }

    #[test]
    fn stats_modal_loading_then_placeholders() {
        let mut state = state_with(household());
        state.stats_modal = Some(StatsModal {
            tab: StatsTab::Summary,
            loading: true,
            error: None,
        });
        assert!(draw(&state).contains("Cargando estadísticas…"));

        state.stats_modal = Some(StatsModal {
            tab: StatsTab::Summary,
            loading: false,
            error: None,
        });
        state.store.set_stats(
            Statistics {
                total_registros: Some(7),
                ..Statistics::default()
            },
            Emit::Silent,
        );
        let text = draw(&state);
        assert!(text.contains("Registros"));
        assert!(text.contains('7'));
        assert!(text.contains("—"));
    }

    #[test]
    fn stats_methods_tab_and_error() {
        let mut state = state_with(household());
        state.store.set_stats(
            Statistics {
                by_metodo: Some(vec![MethodTotal {
                    metodo: Some("Nequi".to_string()),
                    total: Some(RawAmount::Int(150_000)),
                }]),
                ..Statistics::default()
            },
            Emit::Silent,
        );
        state.stats_modal = Some(StatsModal {
            tab: StatsTab::Methods,
            loading: false,
            error: None,
        });
        assert!(draw(&state).contains("$\u{a0}150.000"));

        state.stats_modal = Some(StatsModal {
            tab: StatsTab::Methods,
            loading: false,
            error: Some("No se pudieron cargar estadísticas".to_string()),
        });
        assert!(draw(&state).contains("No se pudieron cargar estadísticas"));
    }

    #[test]
    fn pending_tab_truncates_to_preview() {
        let mut state = state_with(vec![
            invoice(1, "Agua", 1, "", ""),
            invoice(2, "Luz", 2, "", ""),
            invoice(3, "Gas", 3, "", ""),
            invoice(4, "Net", 4, "3/5/2024", ""),
        ]);
        state.stats_modal = Some(StatsModal {
            tab: StatsTab::Pending,
            loading: false,
            error: None,
        });
        let text = draw(&state);
        assert!(text.contains("Pendientes este mes: 3"));
        assert!(text.contains("Mostrando hasta 2 de 3."));
    }
}
