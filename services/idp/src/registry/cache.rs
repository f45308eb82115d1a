//! Short-lived read-through cache in front of a registry.
//!
//! Only hits are cached. Misses and errors always go to the inner registry,
//! so a newly registered client is visible immediately and an outage is
//! never papered over by a stale negative answer.

use super::{ClientRecord, ClientRegistry, RegistryError};
use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::trace;

struct Entry {
    record: ClientRecord,
    inserted: Instant,
}

/// LRU + TTL cache wrapping another registry.
pub struct CachedClientRegistry<R> {
    inner: R,
    ttl: Duration,
    entries: Mutex<LruCache<String, Entry>>,
}

impl<R: ClientRegistry> CachedClientRegistry<R> {
    /// Wrap `inner`, keeping at most `capacity` records for `ttl` each.
    #[must_use]
    pub fn new(inner: R, capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Drop every cached record.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

#[async_trait]
impl<R: ClientRegistry> ClientRegistry for CachedClientRegistry<R> {
    async fn lookup(&self, client_id: &str) -> Result<Option<ClientRecord>, RegistryError> {
        {
            let mut entries = self.entries.lock().await;
            match entries.get(client_id) {
                Some(entry) if entry.inserted.elapsed() < self.ttl => {
                    trace!(client_id, "registry cache hit");
                    return Ok(Some(entry.record.clone()));
                }
                Some(_) => {
                    entries.pop(client_id);
                }
                None => {}
            }
        }

        let found = self.inner.lookup(client_id).await?;
        if let Some(record) = &found {
            self.entries.lock().await.put(
                client_id.to_string(),
                Entry {
                    record: record.clone(),
                    inserted: Instant::now(),
                },
            );
        }
        Ok(found)
    }
}
