/// Currency used to display invoice amounts.
///
/// The household tracker is mono-currency (Colombian pesos), but the engine
/// keeps the currency explicit so formatting rules live in one place.
///
/// Amounts are whole currency units: `50000` formats as `$ 50.000`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Currency {
    #[default]
    Cop,
}

impl Currency {
    /// Symbol placed before the amount.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Currency::Cop => "$",
        }
    }

    /// Thousands separator of the display locale (es-CO).
    #[must_use]
    pub const fn group_separator(self) -> char {
        match self {
            Currency::Cop => '.',
        }
    }
}
