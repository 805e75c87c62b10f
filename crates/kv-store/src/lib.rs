// kv-store: a transactional-per-key abstraction over the durable,
// cross-instance store used for client records, message queues, the
// controller record, and change notifications (spec §4.A).
//
// No atomic multi-key operations are provided or required — every write in
// this system touches exactly one key. The store is assumed eventually
// consistent across instances with sub-second visibility; correctness of
// the layers built on top derives from heartbeat rejection, notification-id
// dedup, and TTL-based expiry rather than from distributed locking.

mod key;
pub mod memory;
#[cfg(feature = "redis-backend")]
pub mod redis_backend;

pub use key::Key;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("kv store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to (de)serialize value: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type KvResult<T> = Result<T, KvError>;

/// A single `(key, value)` pair as returned by `list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: Vec<u8>,
}

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &Key) -> KvResult<Option<Vec<u8>>>;

    /// Overwriting a key resets its TTL; `ttl = None` means no expiry.
    async fn set(&self, key: &Key, value: Vec<u8>, ttl: Option<Duration>) -> KvResult<()>;

    async fn delete(&self, key: &Key) -> KvResult<()>;

    /// All live entries whose key has `prefix` as a segment-wise prefix,
    /// returned in ascending key order (callers rely on this for ULID FIFO
    /// ordering within a single recipient's message queue).
    async fn list(&self, prefix: &Key) -> KvResult<Vec<Entry>>;
}

/// Convenience helpers for JSON-addressable values, layered over the raw
/// byte-oriented `KvStore` so call sites never hand-roll serialization.
#[async_trait]
pub trait KvStoreExt: KvStore {
    async fn get_json<T: DeserializeOwned>(&self, key: &Key) -> KvResult<Option<T>> {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize + Sync>(
        &self,
        key: &Key,
        value: &T,
        ttl: Option<Duration>,
    ) -> KvResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, bytes, ttl).await
    }

    async fn list_json<T: DeserializeOwned>(&self, prefix: &Key) -> KvResult<Vec<(Key, T)>> {
        let entries = self.list(prefix).await?;
        entries
            .into_iter()
            .map(|e| Ok((e.key, serde_json::from_slice(&e.value)?)))
            .collect()
    }
}

impl<T: KvStore + ?Sized> KvStoreExt for T {}
