use ratatui::{style::Style, text::Span};

use crate::ui::theme::Theme;

/// A keyboard hint consisting of a key and its action.
#[derive(Debug, Clone)]
pub struct KeyHint {
    pub key: &'static str,
    pub action: &'static str,
}

impl KeyHint {
    pub const fn new(key: &'static str, action: &'static str) -> Self {
        Self { key, action }
    }
}

/// Converts a list of key hints into styled spans for rendering.
pub fn hints_to_spans(hints: &[KeyHint], theme: &Theme) -> Vec<Span<'static>> {
    let mut spans = Vec::new();

    for (i, hint) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled(hint.key, Style::default().fg(theme.accent)));
        spans.push(Span::raw(format!(" {}", hint.action)));
    }

    spans
}

pub fn hint_separator(theme: &Theme) -> Span<'static> {
    Span::styled("  │  ", Style::default().fg(theme.border))
}

/// Hint groups per input mode.
pub mod common {
    use super::KeyHint;

    pub fn table() -> Vec<KeyHint> {
        vec![
            KeyHint::new("↑↓", "fila"),
            KeyHint::new("←→", "columna"),
            KeyHint::new("Enter", "editar"),
            KeyHint::new("p", "pagar"),
            KeyHint::new("/", "buscar"),
            KeyHint::new("e", "estado"),
            KeyHint::new("m", "método"),
            KeyHint::new("c", "limpiar"),
            KeyHint::new("r", "recargar"),
            KeyHint::new("i", "estadísticas"),
        ]
    }

    pub fn editing() -> Vec<KeyHint> {
        vec![KeyHint::new("Enter", "guardar"), KeyHint::new("Esc", "cancelar")]
    }

    pub fn searching() -> Vec<KeyHint> {
        vec![KeyHint::new("Enter", "aplicar"), KeyHint::new("Esc", "cerrar")]
    }

    pub fn stats_modal() -> Vec<KeyHint> {
        vec![
            KeyHint::new("←→", "pestaña"),
            KeyHint::new("1-5", "ir a"),
            KeyHint::new("Esc", "cerrar"),
        ]
    }

    pub fn quit() -> Vec<KeyHint> {
        vec![KeyHint::new("q", "salir")]
    }
}
