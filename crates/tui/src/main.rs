mod app;
mod cache;
mod client;
mod config;
mod error;
mod logging;
mod store;
#[cfg(test)]
mod testing;
mod ui;

use crate::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load()?;
    logging::init(&config)?;
    tracing::info!(endpoint = %config.script_url, "starting {}", config.app_name);

    let mut app = app::App::new(config)?;
    let result = app.run().await;
    if let Err(err) = &result {
        tracing::error!("terminated with error: {err}");
    }
    result
}
