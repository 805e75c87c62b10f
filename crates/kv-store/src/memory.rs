use crate::{Entry, Key, KvResult, KvStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

struct Record {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Record {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Single-instance, in-process `KvStore`. Used for local/dev deployments
/// (`KV_BACKEND=memory`) and for fast unit tests of the registry,
/// leadership service, and reaper without a real Redis.
#[derive(Clone, Default)]
pub struct MemoryKvStore {
    inner: Arc<RwLock<BTreeMap<Key, Record>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &Key) -> KvResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let mut map = self.inner.write().await;
        match map.get(key) {
            Some(record) if record.is_expired(now) => {
                map.remove(key);
                Ok(None)
            }
            Some(record) => Ok(Some(record.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &Key, value: Vec<u8>, ttl: Option<Duration>) -> KvResult<()> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        self.inner
            .write()
            .await
            .insert(key.clone(), Record { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &Key) -> KvResult<()> {
        self.inner.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &Key) -> KvResult<Vec<Entry>> {
        let now = Instant::now();
        let mut map = self.inner.write().await;
        let expired: Vec<Key> = map
            .iter()
            .filter(|(k, r)| prefix.is_prefix_of(k) && r.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for k in expired {
            map.remove(&k);
        }
        Ok(map
            .iter()
            .filter(|(k, _)| prefix.is_prefix_of(k))
            .map(|(k, r)| Entry {
                key: k.clone(),
                value: r.value.clone(),
            })
            .collect())
    }
}
