use crate::{Entry, Key, KvError, KvResult, KvStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Cross-instance `KvStore` backed by Redis. `SET ... PX` provides per-key
/// TTL; `list(prefix)` uses `SCAN MATCH "<prefix>/*"` followed by `MGET`,
/// then sorts the matched keys client-side so ULID ordering is preserved —
/// `SCAN` itself makes no ordering guarantee.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(url: &str) -> KvResult<Self> {
        let client = redis::Client::open(url).map_err(|e| KvError::Unavailable(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| KvError::Unavailable(e.to_string()))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &Key) -> KvResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn
            .get(key.wire())
            .await
            .map_err(|e| KvError::Unavailable(e.to_string()))?;
        Ok(value)
    }

    async fn set(&self, key: &Key, value: Vec<u8>, ttl: Option<Duration>) -> KvResult<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(d) => {
                let millis = d.as_millis().max(1) as u64;
                let _: () = conn
                    .set_ex(key.wire(), value, millis.div_ceil(1000).max(1))
                    .await
                    .map_err(|e| KvError::Unavailable(e.to_string()))?;
            }
            None => {
                let _: () = conn
                    .set(key.wire(), value)
                    .await
                    .map_err(|e| KvError::Unavailable(e.to_string()))?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &Key) -> KvResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(key.wire())
            .await
            .map_err(|e| KvError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn list(&self, prefix: &Key) -> KvResult<Vec<Entry>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}/*", prefix.wire());
        let mut matched: Vec<String> = Vec::new();
        let mut iter: redis::AsyncIter<String> = conn
            .scan_match(pattern)
            .await
            .map_err(|e| KvError::Unavailable(e.to_string()))?;
        use futures_util::StreamExt;
        while let Some(key) = iter.next().await {
            matched.push(key);
        }
        drop(iter);
        matched.sort();

        if matched.is_empty() {
            return Ok(Vec::new());
        }
        let values: Vec<Option<Vec<u8>>> = conn
            .mget(&matched)
            .await
            .map_err(|e| KvError::Unavailable(e.to_string()))?;
        Ok(matched
            .into_iter()
            .zip(values)
            .filter_map(|(k, v)| v.map(|v| Entry { key: Key::from_wire(&k), value: v }))
            .collect())
    }
}
