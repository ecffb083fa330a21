use std::path::PathBuf;

use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::Parser;
use reqwest::Url;
use serde::Deserialize;

use crate::error::{AppError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/facturas_tui.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Web-app endpoint every action is sent to.
    pub script_url: String,
    pub app_name: String,
    pub debounce_ms: u64,
    pub toast_ms: u64,
    /// Rows listed in the "Pendientes" tab of the stats modal.
    pub pending_preview: usize,
    /// IANA timezone used to decide which month "today" is.
    pub timezone: String,
    pub log_level: String,
    pub log_file: PathBuf,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub ttl_secs: u64,
    pub invoices_key: String,
    pub stats_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            script_url: String::new(),
            app_name: "Facturas Hogar".to_string(),
            debounce_ms: 180,
            toast_ms: 3200,
            pending_preview: 12,
            timezone: "America/Bogota".to_string(),
            log_level: "info".to_string(),
            log_file: PathBuf::from("facturas_tui.log"),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("config/facturas_cache.json"),
            ttl_secs: 300,
            invoices_key: "facturas_hogar_cache_v1".to_string(),
            stats_key: "facturas_hogar_stats_cache_v1".to_string(),
        }
    }
}

impl AppConfig {
    /// Parsed endpoint; fails on an empty or malformed `script_url`.
    pub fn endpoint(&self) -> Result<Url> {
        let raw = self.script_url.trim();
        if raw.is_empty() {
            return Err(AppError::Setting {
                name: "script_url",
                reason: "missing".to_string(),
            });
        }
        Url::parse(raw).map_err(|err| AppError::Setting {
            name: "script_url",
            reason: err.to_string(),
        })
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|err| AppError::Setting {
            name: "timezone",
            reason: err.to_string(),
        })
    }

    fn validate(&self) -> Result<()> {
        self.endpoint()?;
        self.tz()?;
        Ok(())
    }
}

/// Current calendar date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}

#[derive(Debug, Default, Parser)]
#[command(name = "facturas_tui", version)]
pub struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override the backend web-app URL.
    #[arg(long)]
    script_url: Option<String>,
    /// Override timezone (IANA name).
    #[arg(long)]
    timezone: Option<String>,
    /// Disable the local read cache.
    #[arg(long)]
    no_cache: bool,
    /// Override the log file path.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

pub fn load() -> Result<AppConfig> {
    load_from(Args::parse())
}

pub fn load_from(args: Args) -> Result<AppConfig> {
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(
        config::Environment::with_prefix("FACTURAS_TUI")
            .prefix_separator("_")
            .separator("__"),
    );
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(script_url) = args.script_url {
        settings.script_url = script_url;
    }
    if let Some(timezone) = args.timezone {
        settings.timezone = timezone;
    }
    if args.no_cache {
        settings.cache.enabled = false;
    }
    if let Some(log_file) = args.log_file {
        settings.log_file = log_file;
    }

    settings.validate()?;
    Ok(settings)
}
