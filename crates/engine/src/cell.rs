//! Finite-state machine for the two inline-editable invoice cells.
//!
//! A cell is either showing its formatted value (`Display`) or being edited
//! (`Editing`). Entering edit mode snapshots the raw value; leaving it
//! compares the typed text with the snapshot and decides whether a write is
//! needed. The machine knows nothing about the UI toolkit that drives it.

use crate::{Currency, Money, money::only_digits};

/// Placeholder shown for an empty payment method.
pub const EMPTY_METHOD: &str = "—";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Amount,
    Method,
}

/// Value held by an editable cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellValue {
    Amount(Money),
    Method(String),
}

impl CellValue {
    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            Self::Amount(_) => Field::Amount,
            Self::Method(_) => Field::Method,
        }
    }

    /// Text shown while editing: bare digits, or the trimmed method.
    #[must_use]
    pub fn raw(&self) -> String {
        match self {
            Self::Amount(amount) => amount.units().to_string(),
            Self::Method(method) => method.trim().to_string(),
        }
    }

    /// Text shown outside edit mode.
    #[must_use]
    pub fn display(&self, currency: Currency) -> String {
        match self {
            Self::Amount(amount) => amount.format(currency),
            Self::Method(method) if method.trim().is_empty() => EMPTY_METHOD.to_string(),
            Self::Method(method) => method.trim().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CellState {
    Display,
    Editing { text: String },
}

/// Outcome of leaving edit mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Commit {
    /// Nothing to write: show `display` (the snapshot, formatted).
    Revert { display: String },
    /// The value changed and must be written to `row`.
    Save { row: i64, value: CellValue },
}

/// One editable cell of one invoice row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellEditor {
    row: i64,
    snapshot: CellValue,
    state: CellState,
    currency: Currency,
}

impl CellEditor {
    #[must_use]
    pub fn new(row: i64, value: CellValue, currency: Currency) -> Self {
        Self {
            row,
            snapshot: value,
            state: CellState::Display,
            currency,
        }
    }

    #[must_use]
    pub fn row(&self) -> i64 {
        self.row
    }

    #[must_use]
    pub fn field(&self) -> Field {
        self.snapshot.field()
    }

    #[must_use]
    pub fn state(&self) -> &CellState {
        &self.state
    }

    #[must_use]
    pub fn is_editing(&self) -> bool {
        matches!(self.state, CellState::Editing { .. })
    }

    #[must_use]
    pub fn snapshot(&self) -> &CellValue {
        &self.snapshot
    }

    /// Visible text in the current state.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.state {
            CellState::Display => self.snapshot.display(self.currency),
            CellState::Editing { text } => text.clone(),
        }
    }

    /// Focus: switch to the raw value of the snapshot.
    pub fn begin(&mut self) {
        if self.is_editing() {
            return;
        }
        self.state = CellState::Editing {
            text: self.snapshot.raw(),
        };
    }

    /// Appends typed text. Amount cells keep digits only.
    pub fn input(&mut self, typed: &str) {
        let field = self.field();
        let CellState::Editing { text } = &mut self.state else {
            return;
        };
        match field {
            Field::Amount => text.push_str(&only_digits(typed)),
            Field::Method => text.extend(typed.chars().filter(|ch| !ch.is_control())),
        }
    }

    pub fn backspace(&mut self) {
        if let CellState::Editing { text } = &mut self.state {
            text.pop();
        }
    }

    /// Escape: put the snapshot back, then leave edit mode (never a write).
    pub fn cancel(&mut self) -> Commit {
        if let CellState::Editing { text } = &mut self.state {
            *text = self.snapshot.raw();
        }
        self.commit()
    }

    /// Loss of focus: compare with the snapshot and go back to `Display`.
    pub fn commit(&mut self) -> Commit {
        let state = std::mem::replace(&mut self.state, CellState::Display);
        let CellState::Editing { text } = state else {
            return self.revert();
        };

        let next = match self.snapshot {
            CellValue::Amount(original) => match Money::parse_digits(&text) {
                Some(amount) if amount != original => CellValue::Amount(amount),
                _ => return self.revert(),
            },
            CellValue::Method(ref original) => {
                let typed = text.trim();
                if typed == original.trim() {
                    return self.revert();
                }
                CellValue::Method(typed.to_string())
            }
        };

        Commit::Save {
            row: self.row,
            value: next,
        }
    }

    fn revert(&self) -> Commit {
        Commit::Revert {
            display: self.snapshot.display(self.currency),
        }
    }
}
