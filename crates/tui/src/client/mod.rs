use api_types::{
    RawAmount,
    action::Action,
    envelope::{Ack, Envelope},
    invoice::InvoiceRow,
    payment::PaymentRegistered,
    stats::Statistics,
};
use engine::{Invoice, Money};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::cache::LocalCache;

/// Attempts per request: the first try plus one retry.
pub const MAX_ATTEMPTS: usize = 2;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Network failure, non-2xx status or undecodable body, after the retry.
    #[error("{0}")]
    Transport(String),
    /// The backend answered `ok: false`.
    #[error("{0}")]
    Remote(String),
    /// The backend answered with a shape the client does not understand.
    #[error("{0}")]
    Format(String),
}

#[derive(Debug, Clone)]
pub struct Client {
    endpoint: Url,
    http: reqwest::Client,
    cache: LocalCache,
}

impl Client {
    pub fn new(endpoint: Url, cache: LocalCache) -> Self {
        Self {
            endpoint,
            http: reqwest::Client::new(),
            cache,
        }
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    /// Every invoice, from the cache when fresh.
    pub async fn list(&self) -> Result<Vec<Invoice>, ClientError> {
        if let Some(cached) = self.cache.invoices() {
            return Ok(cached);
        }

        let json = self.fetch(&Action::List).await?;
        let invoices: Vec<Invoice> = parse_rows(json)?.into_iter().map(normalize).collect();
        self.cache.store_invoices(&invoices);
        Ok(invoices)
    }

    /// Marks `row` paid today; returns the date recorded by the backend.
    pub async fn register_payment(&self, row: i64) -> Result<String, ClientError> {
        let payload: PaymentRegistered = self
            .mutate(Action::Register { row }, "Error al registrar pago")
            .await?;
        Ok(payload.fecha.unwrap_or_default())
    }

    pub async fn set_amount(&self, row: i64, amount: Money) -> Result<(), ClientError> {
        let action = Action::SetAmount {
            row,
            amount: amount.units(),
        };
        self.mutate::<Ack>(action, "Error al editar valor").await?;
        Ok(())
    }

    pub async fn set_method(&self, row: i64, method: &str) -> Result<(), ClientError> {
        let action = Action::SetMethod {
            row,
            method: method.to_string(),
        };
        self.mutate::<Ack>(action, "Error al editar método").await?;
        Ok(())
    }

    pub async fn stats(&self) -> Result<Statistics, ClientError> {
        if let Some(cached) = self.cache.stats() {
            return Ok(cached);
        }

        let json = self.fetch(&Action::Stats).await?;
        let stats = unwrap_envelope::<Statistics>(json, "No se pudieron cargar estadísticas")?;
        self.cache.store_stats(&stats);
        Ok(stats)
    }

    async fn mutate<T>(&self, action: Action, fallback: &str) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let json = self.fetch(&action).await?;
        // Invalidated once the server answered, even on `ok: false`.
        self.cache.forget_invoices();
        unwrap_envelope(json, fallback)
    }

    async fn fetch(&self, action: &Action) -> Result<Value, ClientError> {
        let mut last_error = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            tracing::debug!(action = action.name(), attempt, "backend request");
            match self.fetch_once(action).await {
                Ok(json) => return Ok(json),
                Err(err) => {
                    tracing::debug!(action = action.name(), attempt, "request failed: {err}");
                    last_error = err;
                }
            }
        }
        tracing::error!(action = action.name(), "giving up: {last_error}");
        Err(ClientError::Transport(last_error))
    }

    async fn fetch_once(&self, action: &Action) -> Result<Value, String> {
        let res = self
            .http
            .get(self.endpoint.clone())
            .query(&action.query())
            .send()
            .await
            .map_err(|err| err.to_string())?;

        let status = res.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }
        res.json::<Value>().await.map_err(|err| err.to_string())
    }
}

fn unwrap_envelope<T: DeserializeOwned>(json: Value, fallback: &str) -> Result<T, ClientError> {
    if json.is_null() {
        return Err(ClientError::Remote(fallback.to_string()));
    }
    let envelope: Envelope<T> = serde_json::from_value(json)
        .map_err(|err| ClientError::Format(format!("{fallback}: {err}")))?;
    envelope.into_result(fallback).map_err(ClientError::Remote)
}

/// Accepts a bare array or `{rows: [...]}`; `{ok: false}` is a remote error.
fn parse_rows(json: Value) -> Result<Vec<InvoiceRow>, ClientError> {
    let unexpected = |detail: String| {
        ClientError::Format(format!("Formato inesperado (listar){detail}"))
    };
    let rows = match json {
        Value::Array(rows) => Value::Array(rows),
        Value::Object(map) if map.get("ok") == Some(&Value::Bool(false)) => {
            let message = map
                .get("error")
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .unwrap_or("Error cargando facturas");
            return Err(ClientError::Remote(message.to_string()));
        }
        Value::Object(mut map) => match map.remove("rows") {
            Some(rows) if rows.is_array() => rows,
            _ => return Err(unexpected(String::new())),
        },
        _ => return Err(unexpected(String::new())),
    };
    serde_json::from_value(rows).map_err(|err| unexpected(format!(": {err}")))
}

/// Amount of a loosely typed backend value: digits of a string, integer part
/// of a number, zero when absent or unparseable.
pub fn money_from(raw: Option<&RawAmount>) -> Money {
    match raw {
        Some(RawAmount::Int(units)) => Money::new(*units),
        Some(RawAmount::Float(value)) if value.is_finite() => Money::new(value.trunc() as i64),
        Some(RawAmount::Text(text)) => Money::parse_digits(text).unwrap_or_default(),
        _ => Money::ZERO,
    }
}

fn normalize(row: InvoiceRow) -> Invoice {
    Invoice {
        row: row.row,
        name: row.nombre.unwrap_or_default(),
        reference: row.referencia.unwrap_or_default(),
        amount: money_from(row.valor.as_ref()),
        last_paid: row.ultimo.unwrap_or_default(),
        method: row.metodo.unwrap_or_default().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use axum::{
        Json, Router,
        extract::Query,
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
    };
    use serde_json::json;

    use super::*;
    use crate::testing::{memory_cache, spawn_backend};

    fn counting<F>(hits: Arc<AtomicUsize>, reply: F) -> Router
    where
        F: Fn(usize, HashMap<String, String>) -> Response + Clone + Send + Sync + 'static,
    {
        Router::new().route(
            "/exec",
            get(move |Query(params): Query<HashMap<String, String>>| {
                let hits = hits.clone();
                let reply = reply.clone();
                async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                    reply(n, params)
                }
            }),
        )
    }

    #[tokio::test]
    async fn list_normalizes_rows_and_fills_cache() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_backend(counting(hits.clone(), |_, params| {
            assert_eq!(params.get("action").map(String::as_str), Some("listar"));
            Json(json!([
                {"row": 2, "nombre": "Agua", "referencia": "A-1", "valor": "50.000",
                 "ultimo": "3/5/2024", "metodo": " Nequi "},
                {"row": 3, "nombre": "Luz", "valor": 120000.7}
            ]))
            .into_response()
        }))
        .await;
        let client = Client::new(url, memory_cache());

        let list = client.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].amount, Money::new(50_000));
        assert_eq!(list[0].method, "Nequi");
        assert_eq!(list[1].amount, Money::new(120_000));
        assert_eq!(list[1].last_paid, "");

        let again = client.list().await.unwrap();
        assert_eq!(again, list);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn list_accepts_rows_wrapper_and_rejects_other_shapes() {
        let url = spawn_backend(counting(Arc::default(), |_, _| {
            Json(json!({"rows": [{"row": "9", "nombre": "Gas"}]})).into_response()
        }))
        .await;
        let list = Client::new(url, memory_cache()).list().await.unwrap();
        assert_eq!(list[0].row, 9);

        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_backend(counting(hits.clone(), |_, _| {
            Json(json!({"ok": true, "data": []})).into_response()
        }))
        .await;
        let err = Client::new(url, memory_cache()).list().await.unwrap_err();
        assert!(matches!(err, ClientError::Format(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn list_error_envelope_keeps_server_message() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_backend(counting(hits.clone(), |_, _| {
            Json(json!({"ok": false, "error": "hoja bloqueada"})).into_response()
        }))
        .await;
        let cache = memory_cache();
        let err = Client::new(url, cache.clone()).list().await.unwrap_err();
        assert!(matches!(&err, ClientError::Remote(msg) if msg == "hoja bloqueada"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(cache.invoices().is_none());

        let url = spawn_backend(counting(Arc::default(), |_, _| {
            Json(json!({"ok": false, "error": ""})).into_response()
        }))
        .await;
        let err = Client::new(url, memory_cache()).list().await.unwrap_err();
        assert_eq!(err.to_string(), "Error cargando facturas");
    }

    #[tokio::test]
    async fn transport_failure_is_retried_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_backend(counting(hits.clone(), |n, _| {
            if n == 1 {
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            } else {
                Json(json!([])).into_response()
            }
        }))
        .await;
        assert!(Client::new(url, memory_cache()).list().await.unwrap().is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_backend(counting(hits.clone(), |_, _| {
            (StatusCode::BAD_GATEWAY, "nope").into_response()
        }))
        .await;
        let err = Client::new(url, memory_cache()).stats().await.unwrap_err();
        assert!(matches!(&err, ClientError::Transport(msg) if msg == "HTTP 502"));
        assert_eq!(hits.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn remote_error_is_not_retried_and_invalidates_list() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_backend(counting(hits.clone(), |_, params| {
            assert_eq!(params.get("action").map(String::as_str), Some("editar"));
            assert_eq!(params.get("row").map(String::as_str), Some("4"));
            assert_eq!(params.get("valor").map(String::as_str), Some("75000"));
            Json(json!({"ok": false, "error": "locked"})).into_response()
        }))
        .await;
        let cache = memory_cache();
        cache.store_invoices(&[]);
        let client = Client::new(url, cache.clone());

        let err = client.set_amount(4, Money::new(75_000)).await.unwrap_err();
        assert!(matches!(&err, ClientError::Remote(msg) if msg == "locked"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(cache.invoices().is_none());
    }

    #[tokio::test]
    async fn remote_error_without_message_uses_fallback() {
        let url = spawn_backend(counting(Arc::default(), |_, _| {
            Json(json!({"ok": false})).into_response()
        }))
        .await;
        let err = Client::new(url, memory_cache())
            .set_method(1, "Nequi")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Error al editar método");
    }

    #[tokio::test]
    async fn register_payment_returns_date() {
        let url = spawn_backend(counting(Arc::default(), |_, params| {
            assert_eq!(params.get("action").map(String::as_str), Some("registrar"));
            assert_eq!(params.get("row").map(String::as_str), Some("7"));
            Json(json!({"ok": true, "fecha": "10/6/2024"})).into_response()
        }))
        .await;
        let fecha = Client::new(url, memory_cache())
            .register_payment(7)
            .await
            .unwrap();
        assert_eq!(fecha, "10/6/2024");
    }

    #[tokio::test]
    async fn stats_are_cached_after_success() {
        let hits = Arc::new(AtomicUsize::new(0));
        let url = spawn_backend(counting(hits.clone(), |_, _| {
            Json(json!({"ok": true, "totalRegistros": 5, "byMetodo": "broken"})).into_response()
        }))
        .await;
        let client = Client::new(url, memory_cache());
        let stats = client.stats().await.unwrap();
        assert_eq!(stats.total_registros, Some(5));
        assert!(stats.by_metodo.is_none());

        client.stats().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn money_from_handles_every_shape() {
        assert_eq!(money_from(None), Money::ZERO);
        assert_eq!(money_from(Some(&RawAmount::Int(9))), Money::new(9));
        assert_eq!(money_from(Some(&RawAmount::Float(9.9))), Money::new(9));
        assert_eq!(
            money_from(Some(&RawAmount::Text("$ 1.200".to_string()))),
            Money::new(1_200)
        );
        assert_eq!(money_from(Some(&RawAmount::Text("n/a".to_string()))), Money::ZERO);
    }
}
