//! Helpers shared by the async tests.

use std::{sync::Arc, time::Duration};

use axum::Router;
use reqwest::Url;

use crate::{
    cache::{LocalCache, MemoryCache},
    config::CacheConfig,
};

/// Serves `router` on an ephemeral local port; returns the `/exec` URL.
pub async fn spawn_backend(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            tracing::error!("mock backend failed: {err}");
        }
    });
    Url::parse(&format!("http://{addr}/exec")).unwrap()
}

pub fn memory_cache() -> LocalCache {
    LocalCache::new(
        Arc::new(MemoryCache::new(Duration::from_secs(300))),
        &CacheConfig::default(),
    )
}
