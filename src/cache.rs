//! Process-wide webhook credential cache.
//!
//! Credentials are `user:pass` strings, one per enabled vendor
//! account plus an optional operator-wide override. The set is
//! populated lazily from the store and dropped by `invalidate()`
//! whenever any account's webhook configuration changes; the next
//! `get()` re-reads a fresh copy.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::store::Store;

/// Credential cache service object shared by the web handlers.
#[derive(Clone)]
pub struct CredentialCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    store: Store,
    credentials_override: Option<String>,
    cached: RwLock<Option<Vec<String>>>,
}

impl CredentialCache {
    pub fn new(store: Store, credentials_override: Option<String>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store,
                credentials_override,
                cached: RwLock::new(None),
            }),
        }
    }

    /// Current credential set, populating the cache on first use.
    pub async fn get(&self) -> Result<Vec<String>, sqlx::Error> {
        {
            let cached = self.inner.cached.read().await;
            if let Some(credentials) = cached.as_ref() {
                return Ok(credentials.clone());
            }
        }

        let mut cached = self.inner.cached.write().await;

        // Double-check after acquiring write lock
        if let Some(credentials) = cached.as_ref() {
            return Ok(credentials.clone());
        }

        let credentials = self.load().await?;
        info!(count = credentials.len(), "credential_cache_populated");

        *cached = Some(credentials.clone());
        Ok(credentials)
    }

    /// Drop the cached set so the next `get()` recomputes it.
    pub async fn invalidate(&self) {
        let mut cached = self.inner.cached.write().await;
        *cached = None;
        debug!("credential_cache_invalidated");
    }

    async fn load(&self) -> Result<Vec<String>, sqlx::Error> {
        let accounts = self.inner.store.list_enabled_vendor_accounts().await?;

        let mut credentials: Vec<String> = accounts
            .into_iter()
            .filter(|a| a.api_key.is_some())
            .filter_map(|a| a.webhook_credentials)
            .collect();

        if let Some(override_value) = &self.inner.credentials_override {
            credentials.push(override_value.clone());
        }

        Ok(credentials)
    }
}
