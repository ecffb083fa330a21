//! Wire types of the spreadsheet backend.
//!
//! The backend is loose about types (amounts arrive as numbers or as
//! pre-formatted strings, optional fields may be missing or `null`), so most
//! fields are deserialized leniently: a value of an unexpected type becomes
//! `None` instead of failing the whole payload.

use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};

/// Deserializes an optional field, mapping any type mismatch to `None`.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Amount as sent by the backend: a JSON number or a formatted string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Int(i64),
    Float(f64),
    Text(String),
}

pub mod action {
    /// Query actions understood by the backend.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Action {
        List,
        Register { row: i64 },
        SetAmount { row: i64, amount: i64 },
        SetMethod { row: i64, method: String },
        Stats,
    }

    impl Action {
        #[must_use]
        pub fn name(&self) -> &'static str {
            match self {
                Self::List => "listar",
                Self::Register { .. } => "registrar",
                Self::SetAmount { .. } => "editar",
                Self::SetMethod { .. } => "editarMetodo",
                Self::Stats => "stats",
            }
        }

        /// Query parameters for this action, `action` first.
        #[must_use]
        pub fn query(&self) -> Vec<(&'static str, String)> {
            let mut params = vec![("action", self.name().to_string())];
            match self {
                Self::List | Self::Stats => {}
                Self::Register { row } => params.push(("row", row.to_string())),
                Self::SetAmount { row, amount } => {
                    params.push(("row", row.to_string()));
                    params.push(("valor", amount.to_string()));
                }
                Self::SetMethod { row, method } => {
                    params.push(("row", row.to_string()));
                    params.push(("metodo", method.clone()));
                }
            }
            params
        }

        /// Returns `true` for actions that change data on the backend.
        #[must_use]
        pub fn is_mutation(&self) -> bool {
            matches!(
                self,
                Self::Register { .. } | Self::SetAmount { .. } | Self::SetMethod { .. }
            )
        }
    }
}

pub mod envelope {
    use super::*;

    /// The `{ok, error}` wrapper every backend response may carry.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct Envelope<T> {
        #[serde(default, deserialize_with = "lenient")]
        pub ok: Option<bool>,
        #[serde(default, deserialize_with = "lenient")]
        pub error: Option<String>,
        #[serde(flatten)]
        pub payload: T,
    }

    impl<T> Envelope<T> {
        /// Fails only on an explicit `ok: false`; a missing flag counts as success.
        pub fn into_result(self, fallback: &str) -> Result<T, String> {
            if self.ok == Some(false) {
                let message = self
                    .error
                    .filter(|msg| !msg.trim().is_empty())
                    .unwrap_or_else(|| fallback.to_string());
                return Err(message);
            }
            Ok(self.payload)
        }
    }

    /// Payload of acknowledgement-only responses.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct Ack {}
}

pub mod invoice {
    use super::*;

    /// One invoice row as returned by `listar`.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct InvoiceRow {
        #[serde(deserialize_with = "row_id")]
        pub row: i64,
        #[serde(default, deserialize_with = "lenient")]
        pub nombre: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        pub referencia: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        pub valor: Option<RawAmount>,
        #[serde(default, deserialize_with = "lenient")]
        pub ultimo: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        pub metodo: Option<String>,
    }

    /// Wrapped list form `{rows: [...]}`.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct RowsWrapper {
        pub rows: Vec<InvoiceRow>,
    }

    /// Row ids arrive as numbers, sometimes as numeric strings.
    fn row_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RowId {
            Int(i64),
            Float(f64),
            Text(String),
        }

        match RowId::deserialize(deserializer)? {
            RowId::Int(n) => Ok(n),
            RowId::Float(f) if f.fract() == 0.0 => Ok(f as i64),
            RowId::Float(f) => Err(serde::de::Error::custom(format!("invalid row id: {f}"))),
            RowId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid row id: {s}"))),
        }
    }
}

pub mod payment {
    use super::*;

    /// Payload of `registrar`.
    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    pub struct PaymentRegistered {
        #[serde(default, deserialize_with = "lenient")]
        pub fecha: Option<String>,
    }
}

pub mod stats {
    use super::*;

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    pub struct MethodTotal {
        #[serde(default, deserialize_with = "lenient")]
        pub metodo: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        pub total: Option<RawAmount>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    pub struct MonthTotal {
        #[serde(default, deserialize_with = "lenient")]
        pub mes: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        pub total: Option<RawAmount>,
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    pub struct TopInvoice {
        #[serde(default, deserialize_with = "lenient")]
        pub nombre: Option<String>,
        #[serde(default, deserialize_with = "lenient")]
        pub total: Option<RawAmount>,
    }

    /// Aggregates computed by the backend. Every field is optional.
    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Statistics {
        #[serde(default, deserialize_with = "lenient")]
        pub total_registros: Option<i64>,
        #[serde(default, deserialize_with = "lenient")]
        pub total_pagado: Option<RawAmount>,
        #[serde(default, deserialize_with = "lenient")]
        pub pagos_este_mes: Option<i64>,
        #[serde(default, deserialize_with = "lenient")]
        pub total_este_mes: Option<RawAmount>,
        #[serde(default, deserialize_with = "lenient")]
        pub by_metodo: Option<Vec<MethodTotal>>,
        #[serde(default, deserialize_with = "lenient")]
        pub by_mes: Option<Vec<MonthTotal>>,
        #[serde(default, deserialize_with = "lenient")]
        pub top_facturas: Option<Vec<TopInvoice>>,
    }
}
