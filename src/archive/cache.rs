//! Read-Mostly Catalog Cache
//!
//! MENU, GETCHANNELS, GETMETADATA and STATUS all walk the full channel or
//! instrument list. Those lists change rarely, so they are kept here for a
//! short TTL instead of being fetched from the archive on every request.
//!
//! Expiry is lazy: a stale listing is refetched by the first request that
//! notices it. A TTL of zero disables caching.

use crate::archive::backend::{Archive, ArchiveResult};
use crate::archive::pool::ArchivePool;
use crate::archive::types::{Channel, Instrument};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::trace;

/// A cached listing with its expiry time.
#[derive(Debug)]
struct Entry<T> {
    value: Arc<Vec<T>>,
    expires_at: Instant,
}

impl<T> Entry<T> {
    #[inline]
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// One cached listing.
#[derive(Debug)]
struct Slot<T> {
    entry: RwLock<Option<Entry<T>>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            entry: RwLock::new(None),
        }
    }

    fn get(&self) -> Option<Arc<Vec<T>>> {
        let guard = self.entry.read().ok()?;
        guard
            .as_ref()
            .filter(|e| !e.is_expired())
            .map(|e| Arc::clone(&e.value))
    }

    fn put(&self, value: Arc<Vec<T>>, ttl: Duration) {
        if let Ok(mut guard) = self.entry.write() {
            *guard = Some(Entry {
                value,
                expires_at: Instant::now() + ttl,
            });
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.entry.write() {
            *guard = None;
        }
    }
}

/// Channel and instrument listings shared by all connections.
#[derive(Debug)]
pub struct CatalogCache {
    ttl: Duration,
    channels: Slot<Channel>,
    channels_with_metadata: Slot<Channel>,
    instruments: Slot<Instrument>,
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            channels: Slot::new(),
            channels_with_metadata: Slot::new(),
            instruments: Slot::new(),
        }
    }

    /// Every channel, from the cache when fresh.
    pub async fn channels(
        &self,
        pool: &ArchivePool,
        with_metadata: bool,
    ) -> ArchiveResult<Arc<Vec<Channel>>> {
        let slot = if with_metadata {
            &self.channels_with_metadata
        } else {
            &self.channels
        };

        if let Some(hit) = slot.get() {
            trace!(with_metadata, "Channel listing served from cache");
            return Ok(hit);
        }

        let fresh = {
            let archive = pool.acquire().await?;
            Arc::new(archive.list_channels(with_metadata).await?)
        };
        if !self.ttl.is_zero() {
            slot.put(Arc::clone(&fresh), self.ttl);
        }
        Ok(fresh)
    }

    /// Every instrument, from the cache when fresh.
    pub async fn instruments(&self, pool: &ArchivePool) -> ArchiveResult<Arc<Vec<Instrument>>> {
        if let Some(hit) = self.instruments.get() {
            trace!("Instrument listing served from cache");
            return Ok(hit);
        }

        let fresh = {
            let archive = pool.acquire().await?;
            Arc::new(archive.list_instruments().await?)
        };
        if !self.ttl.is_zero() {
            self.instruments.put(Arc::clone(&fresh), self.ttl);
        }
        Ok(fresh)
    }

    /// Drops all cached listings.
    pub fn invalidate(&self) {
        self.channels.clear();
        self.channels_with_metadata.clear();
        self.instruments.clear();
    }
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::memory::InMemoryArchive;
    use crate::archive::types::Scnl;

    fn setup() -> (Arc<InMemoryArchive>, ArchivePool) {
        let archive = Arc::new(InMemoryArchive::new());
        archive
            .add_channel(Scnl::new("AKV", "EHZ", "AV", None))
            .unwrap();
        let pool = ArchivePool::new(archive.clone(), 2);
        (archive, pool)
    }

    #[tokio::test]
    async fn test_listing_is_cached() {
        let (archive, pool) = setup();
        let cache = CatalogCache::new(Duration::from_secs(60));

        let first = cache.channels(&pool, false).await.unwrap();
        let second = cache.channels(&pool, false).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(archive.query_count(), 1);

        // The metadata variant is cached separately
        cache.channels(&pool, true).await.unwrap();
        assert_eq!(archive.query_count(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_refetches() {
        let (archive, pool) = setup();
        let cache = CatalogCache::new(Duration::from_secs(60));

        cache.instruments(&pool).await.unwrap();
        cache.instruments(&pool).await.unwrap();
        assert_eq!(archive.query_count(), 1);

        cache.invalidate();
        cache.instruments(&pool).await.unwrap();
        assert_eq!(archive.query_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let (archive, pool) = setup();
        let cache = CatalogCache::new(Duration::ZERO);

        cache.channels(&pool, false).await.unwrap();
        cache.channels(&pool, false).await.unwrap();
        assert_eq!(archive.query_count(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let (archive, pool) = setup();
        let cache = CatalogCache::new(Duration::from_millis(20));

        cache.channels(&pool, false).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.channels(&pool, false).await.unwrap();
        assert_eq!(archive.query_count(), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let (archive, pool) = setup();
        let cache = CatalogCache::new(Duration::from_secs(60));

        archive.set_available(false);
        assert!(cache.channels(&pool, false).await.is_err());
        archive.set_available(true);
        assert_eq!(cache.channels(&pool, false).await.unwrap().len(), 1);
    }
}
