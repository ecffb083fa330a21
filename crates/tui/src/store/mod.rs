//! Single source of truth for the screen, with typed publish/subscribe.
//!
//! The orchestrator owns the [`Store`]; listeners receive the topic and a
//! read-only view of the state and may only react (send an event, log),
//! never mutate. A failing listener is logged and the others still run.

use api_types::stats::Statistics;
use chrono::{DateTime, Utc};
use engine::{Filters, FiltersPatch, Invoice, Money};

use crate::cache::LocalCache;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    Invoices,
    Filtered,
    Stats,
    Filters,
    Busy,
    Error,
    Reset,
    Hydrated,
}

/// Whether a setter notifies listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Emit {
    Publish,
    Silent,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Meta {
    pub last_loaded_at: Option<DateTime<Utc>>,
    pub last_stats_at: Option<DateTime<Utc>>,
    pub busy: bool,
    pub last_error: String,
    pub version: u32,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            last_loaded_at: None,
            last_stats_at: None,
            busy: false,
            last_error: String::new(),
            version: 1,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct State {
    pub invoices: Vec<Invoice>,
    pub filtered: Vec<Invoice>,
    pub stats: Option<Statistics>,
    pub filters: Filters,
    pub meta: Meta,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type ListenerResult = Result<(), String>;

type Callback = Box<dyn FnMut(Topic, &State) -> ListenerResult>;

struct Subscription {
    id: ListenerId,
    /// `None` listens to every topic.
    topic: Option<Topic>,
    once: bool,
    callback: Callback,
}

pub struct Store {
    state: State,
    cache: LocalCache,
    listeners: Vec<Subscription>,
    next_id: u64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Store {
    pub fn new(cache: LocalCache) -> Self {
        Self {
            state: State::default(),
            cache,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    pub fn on<F>(&mut self, topic: Topic, callback: F) -> ListenerId
    where
        F: FnMut(Topic, &State) -> ListenerResult + 'static,
    {
        self.subscribe(Some(topic), false, Box::new(callback))
    }

    /// Listens to every topic.
    pub fn on_any<F>(&mut self, callback: F) -> ListenerId
    where
        F: FnMut(Topic, &State) -> ListenerResult + 'static,
    {
        self.subscribe(None, false, Box::new(callback))
    }

    /// Listens to the next publication of `topic` only.
    pub fn once<F>(&mut self, topic: Topic, callback: F) -> ListenerId
    where
        F: FnMut(Topic, &State) -> ListenerResult + 'static,
    {
        self.subscribe(Some(topic), true, Box::new(callback))
    }

    /// Removes a listener; returns `false` if it was already gone.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|sub| sub.id != id);
        self.listeners.len() != before
    }

    fn subscribe(&mut self, topic: Option<Topic>, once: bool, callback: Callback) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(Subscription {
            id,
            topic,
            once,
            callback,
        });
        id
    }

    fn publish(&mut self, topic: Topic) {
        let mut fired = Vec::new();
        // Exact listeners first, then wildcards.
        for wildcard in [false, true] {
            for sub in self.listeners.iter_mut() {
                let matches = match sub.topic {
                    Some(t) => !wildcard && t == topic,
                    None => wildcard,
                };
                if !matches {
                    continue;
                }
                if let Err(err) = (sub.callback)(topic, &self.state) {
                    tracing::warn!(?topic, "store listener failed: {err}");
                }
                if sub.once {
                    fired.push(sub.id);
                }
            }
        }
        if !fired.is_empty() {
            self.listeners.retain(|sub| !fired.contains(&sub.id));
        }
    }

    fn emit(&mut self, topic: Topic, emit: Emit) {
        if emit == Emit::Publish {
            self.publish(topic);
        }
    }

    pub fn invoices(&self) -> &[Invoice] {
        &self.state.invoices
    }

    pub fn filtered(&self) -> &[Invoice] {
        &self.state.filtered
    }

    pub fn stats(&self) -> Option<&Statistics> {
        self.state.stats.as_ref()
    }

    pub fn filters(&self) -> &Filters {
        &self.state.filters
    }

    pub fn meta(&self) -> &Meta {
        &self.state.meta
    }

    pub fn set_invoices(&mut self, invoices: Vec<Invoice>, emit: Emit) {
        self.state.invoices = invoices;
        self.state.meta.last_loaded_at = Some(Utc::now());
        // An identical cached entry keeps its write time and TTL.
        if self.cache.invoices().as_deref() != Some(self.state.invoices.as_slice()) {
            self.cache.store_invoices(&self.state.invoices);
        }
        self.emit(Topic::Invoices, emit);
    }

    pub fn set_filtered(&mut self, filtered: Vec<Invoice>, emit: Emit) {
        self.state.filtered = filtered;
        self.emit(Topic::Filtered, emit);
    }

    pub fn set_stats(&mut self, stats: Statistics, emit: Emit) {
        self.cache.store_stats(&stats);
        self.state.stats = Some(stats);
        self.state.meta.last_stats_at = Some(Utc::now());
        self.emit(Topic::Stats, emit);
    }

    /// Shallow merge of `patch` into the current filters.
    pub fn set_filters(&mut self, patch: FiltersPatch, emit: Emit) -> &Filters {
        self.state.filters.merge(patch);
        self.emit(Topic::Filters, emit);
        &self.state.filters
    }

    pub fn set_busy(&mut self, busy: bool, emit: Emit) {
        self.state.meta.busy = busy;
        self.emit(Topic::Busy, emit);
    }

    pub fn set_error(&mut self, message: impl Into<String>, emit: Emit) {
        self.state.meta.last_error = message.into();
        self.emit(Topic::Error, emit);
    }

    /// Sets the amount of `row` in both lists. Returns `false` for an unknown row.
    pub fn patch_amount(&mut self, row: i64, amount: Money, emit: Emit) -> bool {
        self.patch_row(row, emit, |invoice| invoice.amount = amount)
    }

    pub fn patch_method(&mut self, row: i64, method: &str, emit: Emit) -> bool {
        let method = method.trim().to_string();
        self.patch_row(row, emit, move |invoice| invoice.method = method.clone())
    }

    pub fn patch_last_paid(&mut self, row: i64, date: &str, emit: Emit) -> bool {
        self.patch_row(row, emit, |invoice| invoice.last_paid = date.to_string())
    }

    fn patch_row<F>(&mut self, row: i64, emit: Emit, mut apply: F) -> bool
    where
        F: FnMut(&mut Invoice),
    {
        let mut found = false;
        for invoice in self
            .state
            .invoices
            .iter_mut()
            .chain(self.state.filtered.iter_mut())
            .filter(|invoice| invoice.row == row)
        {
            apply(invoice);
            found = true;
        }
        if found {
            self.emit(Topic::Invoices, emit);
        }
        found
    }

    /// Back to defaults; the cached entries go too unless `keep_cache`.
    pub fn reset(&mut self, keep_cache: bool) {
        tracing::debug!(
            version = self.state.meta.version,
            snapshot = ?self.snapshot(),
            "store reset"
        );
        self.state = State::default();
        if !keep_cache {
            self.cache.clear_all();
        }
        self.publish(Topic::Reset);
    }

    /// Loads cached invoices and statistics without publishing them one by
    /// one; a single [`Topic::Hydrated`] follows when anything was found.
    pub fn hydrate_from_cache(&mut self) -> bool {
        let invoices = self.cache.invoices().filter(|list| !list.is_empty());
        let stats = self.cache.stats();
        let found = invoices.is_some() || stats.is_some();

        if let Some(invoices) = invoices {
            tracing::debug!(count = invoices.len(), "hydrated invoices from cache");
            self.state.filtered = invoices.clone();
            self.state.invoices = invoices;
        }
        if let Some(stats) = stats {
            tracing::debug!("hydrated statistics from cache");
            self.state.stats = Some(stats);
        }
        if found {
            self.publish(Topic::Hydrated);
        }
        found
    }

    /// Owned deep copy of the whole state.
    pub fn snapshot(&self) -> State {
        self.state.clone()
    }

    pub fn extract_methods(&self) -> Vec<String> {
        engine::extract_methods(&self.state.invoices)
    }
}
