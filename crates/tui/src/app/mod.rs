use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant},
};

use api_types::stats::Statistics;
use chrono::NaiveDate;
use chrono_tz::Tz;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use engine::{
    CellEditor, CellValue, Commit, Currency, Field, FiltersPatch, Invoice, MethodFilter, Money,
};
use tokio::sync::mpsc;

use crate::{
    cache::LocalCache,
    client::{Client, ClientError},
    config::{self, AppConfig},
    error::{AppError, Result},
    store::{Emit, Store, Topic},
    ui::{
        self,
        keymap::{AppAction, map_key},
    },
};

/// Result of a background call, applied on the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    ListLoaded {
        token: u64,
        result: std::result::Result<Vec<Invoice>, ClientError>,
    },
    StatsLoaded(std::result::Result<Statistics, ClientError>),
    AmountSaved {
        row: i64,
        amount: Money,
        result: std::result::Result<(), ClientError>,
    },
    MethodSaved {
        row: i64,
        method: String,
        result: std::result::Result<(), ClientError>,
    },
    PaymentRegistered {
        row: i64,
        result: std::result::Result<String, ClientError>,
    },
    /// Raised by the store's error listener.
    StoreError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct ToastState {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

/// Table column the cursor is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Amount,
    Method,
    Register,
}

impl Column {
    fn next(self) -> Self {
        match self {
            Self::Amount => Self::Method,
            Self::Method => Self::Register,
            Self::Register => Self::Amount,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Amount => Self::Register,
            Self::Method => Self::Amount,
            Self::Register => Self::Method,
        }
    }

    fn field(self) -> Option<Field> {
        match self {
            Self::Amount => Some(Field::Amount),
            Self::Method => Some(Field::Method),
            Self::Register => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsTab {
    Summary,
    Methods,
    Months,
    Top,
    Pending,
}

impl StatsTab {
    pub const ALL: [StatsTab; 5] = [
        Self::Summary,
        Self::Methods,
        Self::Months,
        Self::Top,
        Self::Pending,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Summary => "Resumen",
            Self::Methods => "Métodos",
            Self::Months => "Meses",
            Self::Top => "Top",
            Self::Pending => "Pendientes",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|tab| *tab == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone)]
pub struct StatsModal {
    pub tab: StatsTab,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct AppState {
    pub app_name: String,
    pub version: &'static str,
    pub currency: Currency,
    pub today: NaiveDate,
    pub pending_preview: usize,
    pub store: Store,
    pub selected: usize,
    pub column: Column,
    pub editor: Option<CellEditor>,
    pub searching: bool,
    pub search_input: String,
    /// Cell text shown while a save is in flight.
    pub saving: HashMap<(i64, Field), String>,
    /// Rows whose payment is being registered.
    pub paying: HashSet<i64>,
    pub stats_modal: Option<StatsModal>,
    pub toast: Option<ToastState>,
    /// Set when the latest refresh failed.
    pub load_error: Option<String>,
}

impl AppState {
    pub fn selected_invoice(&self) -> Option<&Invoice> {
        self.store.filtered().get(self.selected)
    }

    fn clamp_selection(&mut self) {
        let len = self.store.filtered().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}

pub struct App {
    client: Client,
    tz: Tz,
    debounce: Duration,
    toast_ttl: Duration,
    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,
    refresh_token: u64,
    refresh_in_flight: bool,
    search_deadline: Option<Instant>,
    pub state: AppState,
    should_quit: bool,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let cache = LocalCache::from_config(&config.cache);
        tracing::debug!(
            enabled = cache.is_enabled(),
            path = %config.cache.path.display(),
            "local cache"
        );
        let client = Client::new(config.endpoint()?, cache);
        Self::with_client(&config, client)
    }

    pub fn with_client(config: &AppConfig, client: Client) -> Result<Self> {
        let tz = config.tz()?;
        let (tx, rx) = mpsc::unbounded_channel();

        let mut store = Store::new(client.cache().clone());
        let errors = tx.clone();
        store.on(Topic::Error, move |_, state| {
            if state.meta.last_error.is_empty() {
                return Ok(());
            }
            errors
                .send(AppEvent::StoreError(state.meta.last_error.clone()))
                .map_err(|err| err.to_string())
        });
        store.once(Topic::Invoices, |_, state| {
            tracing::info!(count = state.invoices.len(), "first invoice list applied");
            Ok(())
        });
        store.on_any(|topic, state| {
            tracing::trace!(?topic, busy = state.meta.busy, "store event");
            Ok(())
        });
        let hydrated = store.hydrate_from_cache();

        let state = AppState {
            app_name: config.app_name.clone(),
            version: env!("CARGO_PKG_VERSION"),
            currency: Currency::default(),
            today: config::today_in(tz),
            pending_preview: config.pending_preview,
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
        };

        let mut app = Self {
            client,
            tz,
            debounce: Duration::from_millis(config.debounce_ms),
            toast_ttl: Duration::from_millis(config.toast_ms),
            tx,
            rx,
            refresh_token: 0,
            refresh_in_flight: false,
            search_deadline: None,
            state,
            should_quit: false,
        };
        if hydrated {
            app.toast(ToastLevel::Info, "Mostrando datos guardados…");
        }
        Ok(app)
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut terminal = ui::setup_terminal()?;
        let result = self.event_loop(&mut terminal).await;
        ui::restore_terminal(&mut terminal)?;
        result
    }

    async fn event_loop(&mut self, terminal: &mut ui::Terminal) -> Result<()> {
        let tick_rate = Duration::from_millis(50);
        self.refresh();

        while !self.should_quit {
            self.state.today = config::today_in(self.tz);
            terminal
                .draw(|frame| ui::render(frame, &self.state))
                .map_err(|err| AppError::Terminal(err.to_string()))?;

            if event::poll(tick_rate)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key);
            }

            while let Ok(event) = self.rx.try_recv() {
                self.handle_event(event);
            }
            self.tick(Instant::now());
        }

        Ok(())
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Waits for the next background result.
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }

    /// Applies timers: debounced search and toast expiry.
    pub fn tick(&mut self, now: Instant) {
        if self.search_deadline.is_some_and(|deadline| now >= deadline) {
            self.search_deadline = None;
            self.apply_query();
        }
        if self.state.toast.as_ref().is_some_and(|toast| now >= toast.expires_at) {
            self.state.toast = None;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let action = map_key(key);
        if action == AppAction::Quit {
            self.should_quit = true;
            return;
        }

        if self.state.stats_modal.is_some() {
            self.handle_stats_key(action);
        } else if self.state.editor.is_some() {
            self.handle_edit_key(action);
        } else if self.state.searching {
            self.handle_search_key(action);
        } else {
            self.handle_table_key(action);
        }
    }

    fn handle_table_key(&mut self, action: AppAction) {
        match action {
            AppAction::Up => self.move_selection(-1),
            AppAction::Down => self.move_selection(1),
            AppAction::Left | AppAction::PrevField => self.state.column = self.state.column.prev(),
            AppAction::Right | AppAction::NextField => {
                self.state.column = self.state.column.next();
            }
            AppAction::Submit => match self.state.column {
                Column::Register => self.register_selected(),
                column => self.begin_edit(column),
            },
            AppAction::Input(ch) => match ch {
                'q' => self.should_quit = true,
                'j' => self.move_selection(1),
                'k' => self.move_selection(-1),
                '/' => {
                    self.state.searching = true;
                    self.state.search_input = self.state.store.filters().query.clone();
                }
                'e' => {
                    let status = self.state.store.filters().status.next();
                    self.update_filters(FiltersPatch {
                        status: Some(status),
                        ..FiltersPatch::default()
                    });
                }
                'm' => {
                    let method = self.next_method_filter();
                    self.update_filters(FiltersPatch {
                        method: Some(method),
                        ..FiltersPatch::default()
                    });
                }
                'c' => self.clear_filters(),
                'r' => self.refresh(),
                'R' => self.hard_refresh(),
                'p' => self.register_selected(),
                'i' | 'S' => self.open_stats(),
                _ => {}
            },
            AppAction::Cancel
            | AppAction::Backspace
            | AppAction::Quit
            | AppAction::None => {}
        }
    }

    fn handle_search_key(&mut self, action: AppAction) {
        match action {
            AppAction::Input(ch) => {
                self.state.search_input.push(ch);
                self.schedule_query();
            }
            AppAction::Backspace => {
                self.state.search_input.pop();
                self.schedule_query();
            }
            AppAction::Submit | AppAction::Cancel => {
                self.state.searching = false;
                self.search_deadline = None;
                self.apply_query();
            }
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, action: AppAction) {
        let Some(editor) = self.state.editor.as_mut() else {
            return;
        };
        match action {
            AppAction::Input(ch) => editor.input(ch.encode_utf8(&mut [0; 4])),
            AppAction::Backspace => editor.backspace(),
            AppAction::Submit => {
                let commit = editor.commit();
                self.finish_edit(commit);
            }
            AppAction::Cancel => {
                let commit = editor.cancel();
                self.finish_edit(commit);
            }
            // Leaving the cell commits it.
            AppAction::Up | AppAction::Down | AppAction::Left | AppAction::Right
            | AppAction::NextField | AppAction::PrevField => {
                let commit = editor.commit();
                self.finish_edit(commit);
                self.handle_table_key(action);
            }
            AppAction::Quit | AppAction::None => {}
        }
    }

    fn handle_stats_key(&mut self, action: AppAction) {
        let Some(modal) = self.state.stats_modal.as_mut() else {
            return;
        };
        match action {
            AppAction::Cancel => self.state.stats_modal = None,
            AppAction::Right | AppAction::NextField => modal.tab = modal.tab.next(),
            AppAction::Left | AppAction::PrevField => modal.tab = modal.tab.prev(),
            AppAction::Input(ch) => {
                if let Some(tab) = ch
                    .to_digit(10)
                    .and_then(|n| StatsTab::ALL.get((n as usize).wrapping_sub(1)))
                {
                    modal.tab = *tab;
                }
            }
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.state.store.filtered().len();
        if len == 0 {
            return;
        }
        self.state.selected = self
            .state
            .selected
            .saturating_add_signed(delta)
            .min(len - 1);
    }

    fn toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.state.toast = Some(ToastState {
            message: message.into(),
            level,
            expires_at: Instant::now() + self.toast_ttl,
        });
    }

    fn sync_busy(&mut self) {
        let loading_stats = self
            .state
            .stats_modal
            .as_ref()
            .is_some_and(|modal| modal.loading);
        let busy = self.refresh_in_flight || loading_stats;
        if self.state.store.meta().busy != busy {
            self.state.store.set_busy(busy, Emit::Publish);
        }
    }

    // Filters

    fn schedule_query(&mut self) {
        self.search_deadline = Some(Instant::now() + self.debounce);
    }

    fn apply_query(&mut self) {
        let query = self.state.search_input.trim().to_string();
        self.update_filters(FiltersPatch {
            query: Some(query),
            ..FiltersPatch::default()
        });
    }

    fn update_filters(&mut self, patch: FiltersPatch) {
        self.state.store.set_filters(patch, Emit::Publish);
        self.apply_filters();
    }

    fn clear_filters(&mut self) {
        self.state.search_input.clear();
        self.search_deadline = None;
        self.update_filters(FiltersPatch::clear());
    }

    fn apply_filters(&mut self) {
        let store = &self.state.store;
        let filtered = engine::filter(store.invoices(), store.filters(), self.state.today);
        self.state.store.set_filtered(filtered, Emit::Publish);
        self.state.clamp_selection();
    }

    /// `Todos`, then each known method in order, then back to `Todos`.
    fn next_method_filter(&self) -> MethodFilter {
        let methods = self.state.store.extract_methods();
        match &self.state.store.filters().method {
            MethodFilter::All => methods
                .into_iter()
                .next()
                .map_or(MethodFilter::All, MethodFilter::Exact),
            MethodFilter::Exact(current) => {
                let position = methods.iter().position(|method| method == current);
                match position {
                    Some(index) => methods
                        .get(index + 1)
                        .cloned()
                        .map_or(MethodFilter::All, MethodFilter::Exact),
                    None => MethodFilter::All,
                }
            }
        }
    }

    // Refresh

    /// Reloads the list; only the latest call may touch the state.
    pub fn refresh(&mut self) {
        self.refresh_token += 1;
        let token = self.refresh_token;
        self.refresh_in_flight = true;
        self.sync_busy();

        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client.list().await;
            let _ = tx.send(AppEvent::ListLoaded { token, result });
        });
    }

    fn hard_refresh(&mut self) {
        self.state.store.reset(false);
        self.state.search_input.clear();
        self.state.load_error = None;
        self.state.selected = 0;
        self.refresh();
    }

    fn on_list_loaded(
        &mut self,
        token: u64,
        result: std::result::Result<Vec<Invoice>, ClientError>,
    ) {
        if token != self.refresh_token {
            tracing::debug!(token, latest = self.refresh_token, "stale refresh dropped");
            return;
        }

        match result {
            Ok(invoices) => {
                tracing::debug!(count = invoices.len(), "invoices loaded");
                self.state.load_error = None;
                self.state.store.set_error("", Emit::Silent);
                self.state.store.set_invoices(invoices, Emit::Publish);
                self.apply_filters();
            }
            Err(err) => {
                tracing::error!("refresh failed: {err}");
                self.state.store.set_filtered(Vec::new(), Emit::Publish);
                self.state.selected = 0;
                self.state.load_error = Some(err.to_string());
                self.state
                    .store
                    .set_error(format!("Error cargando: {err}"), Emit::Publish);
            }
        }

        self.refresh_in_flight = false;
        self.sync_busy();
    }

    // Stats

    fn open_stats(&mut self) {
        self.state.stats_modal = Some(StatsModal {
            tab: StatsTab::Summary,
            loading: true,
            error: None,
        });
        self.sync_busy();

        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client.stats().await;
            let _ = tx.send(AppEvent::StatsLoaded(result));
        });
    }

    fn on_stats_loaded(&mut self, result: std::result::Result<Statistics, ClientError>) {
        let failure = match result {
            Ok(stats) => {
                self.state.store.set_stats(stats, Emit::Publish);
                None
            }
            Err(err) => {
                tracing::error!("stats failed: {err}");
                Some(err.to_string())
            }
        };
        if let Some(modal) = self.state.stats_modal.as_mut() {
            modal.loading = false;
            modal.error = failure;
        }
        self.sync_busy();
    }

    // Inline edits

    fn begin_edit(&mut self, column: Column) {
        let Some(field) = column.field() else {
            return;
        };
        let Some(invoice) = self.state.selected_invoice() else {
            return;
        };
        if self.state.saving.contains_key(&(invoice.row, field)) {
            return;
        }
        let value = match field {
            Field::Amount => CellValue::Amount(invoice.amount),
            Field::Method => CellValue::Method(invoice.method.clone()),
        };
        let mut editor = CellEditor::new(invoice.row, value, self.state.currency);
        editor.begin();
        self.state.editor = Some(editor);
    }

    fn finish_edit(&mut self, commit: Commit) {
        self.state.editor = None;
        let Commit::Save { row, value } = commit else {
            return;
        };

        self.state
            .saving
            .insert((row, value.field()), value.display(self.state.currency));

        let client = self.client.clone();
        let tx = self.tx.clone();
        match value {
            CellValue::Amount(amount) => {
                tokio::spawn(async move {
                    let result = client.set_amount(row, amount).await;
                    let _ = tx.send(AppEvent::AmountSaved {
                        row,
                        amount,
                        result,
                    });
                });
            }
            CellValue::Method(method) => {
                tokio::spawn(async move {
                    let result = client.set_method(row, &method).await;
                    let _ = tx.send(AppEvent::MethodSaved {
                        row,
                        method,
                        result,
                    });
                });
            }
        }
    }

    // Payments

    fn register_selected(&mut self) {
        let Some(row) = self.state.selected_invoice().map(|invoice| invoice.row) else {
            return;
        };
        if !self.state.paying.insert(row) {
            return;
        }

        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client.register_payment(row).await;
            let _ = tx.send(AppEvent::PaymentRegistered { row, result });
        });
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::ListLoaded { token, result } => self.on_list_loaded(token, result),
            AppEvent::StatsLoaded(result) => self.on_stats_loaded(result),
            AppEvent::AmountSaved {
                row,
                amount,
                result,
            } => {
                self.state.saving.remove(&(row, Field::Amount));
                match result {
                    Ok(()) => {
                        self.state.store.patch_amount(row, amount, Emit::Publish);
                        self.apply_filters();
                        self.toast(ToastLevel::Success, "Valor actualizado 💰");
                    }
                    Err(err) => {
                        tracing::error!(row, "amount update failed: {err}");
                        self.toast(ToastLevel::Error, format!("Error al editar valor: {err}"));
                    }
                }
            }
            AppEvent::MethodSaved {
                row,
                method,
                result,
            } => {
                self.state.saving.remove(&(row, Field::Method));
                match result {
                    Ok(()) => {
                        self.state.store.patch_method(row, &method, Emit::Publish);
                        self.apply_filters();
                        self.toast(ToastLevel::Success, "Método actualizado 💳");
                    }
                    Err(err) => {
                        tracing::error!(row, "method update failed: {err}");
                        self.toast(ToastLevel::Error, format!("Error al editar método: {err}"));
                    }
                }
            }
            AppEvent::PaymentRegistered { row, result } => {
                self.state.paying.remove(&row);
                match result {
                    Ok(date) => {
                        self.state.store.patch_last_paid(row, &date, Emit::Publish);
                        self.apply_filters();
                        self.toast(ToastLevel::Success, "Pago registrado ✅");
                        self.refresh();
                    }
                    Err(err) => {
                        tracing::error!(row, "payment failed: {err}");
                        self.toast(ToastLevel::Error, format!("Error al registrar: {err}"));
                    }
                }
            }
            AppEvent::StoreError(message) => self.toast(ToastLevel::Error, message),
        }
    }
}
