//! Client Registry (spec §4.B): register/unregister, reconnection
//! accounting, and the controller-facing synth listing.

use crate::deliver::notify_controllers;
use crate::keys;
use crate::state::AppState;
use kv_store::{KvStore, KvStoreExt};
use serde::{Deserialize, Serialize};
use signal_protocol::{ClientListEntry, ClientType};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: String,
    pub instance_id: String,
    /// Monotonic wall-clock of the *first* registration; preserved across
    /// reconnects (invariant 4 in spec §3).
    pub connection_timestamp: i64,
    pub last_seen: i64,
    pub reconnection_count: u32,
    pub last_reconnect_time: Option<i64>,
    pub is_controller: bool,
}

impl ClientRecord {
    pub fn client_type(&self) -> Option<ClientType> {
        ClientType::from_id(&self.id)
    }
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

pub enum RegisterOutcome {
    Fresh(ClientRecord),
    Reconnected(ClientRecord),
}

impl RegisterOutcome {
    pub fn record(&self) -> &ClientRecord {
        match self {
            Self::Fresh(r) | Self::Reconnected(r) => r,
        }
    }

    pub fn is_reconnection(&self) -> bool {
        matches!(self, Self::Reconnected(_))
    }
}

/// Registers (or re-registers) a client id. If an active local socket
/// already exists under this id, the caller is responsible for closing it
/// with code 1000/"Replaced" and waiting briefly before this runs, per
/// spec §4.B — that part lives in `router.rs` since it touches the
/// socket map, which this module does not own.
pub async fn register(
    state: &AppState,
    id: &str,
    client_declared_reconnect: bool,
) -> Result<RegisterOutcome, kv_store::KvError> {
    let is_controller = id.starts_with("controller-");
    let now = now_millis();
    let key = keys::client_record(id);

    let prior: Option<ClientRecord> = state.kv.get_json(&key).await?;

    let (record, outcome_is_reconnect) = match prior {
        Some(mut prior) => {
            prior.instance_id = state.instance_id.clone();
            prior.last_seen = now;
            prior.reconnection_count += 1;
            prior.last_reconnect_time = Some(now);
            (prior, true)
        }
        None => {
            let record = ClientRecord {
                id: id.to_owned(),
                instance_id: state.instance_id.clone(),
                connection_timestamp: now,
                last_seen: now,
                reconnection_count: 0,
                last_reconnect_time: None,
                is_controller,
            };
            (record, false)
        }
    };
    let _ = client_declared_reconnect; // treated as reconnecting regardless, per spec §4.B

    state
        .kv
        .set_json(&key, &record, Some(state.settings.client_ttl))
        .await?;

    if is_controller {
        state
            .kv
            .set_json(
                &keys::controller_directory_entry(id),
                &record,
                Some(state.settings.client_ttl),
            )
            .await?;
    } else {
        let verb = if outcome_is_reconnect {
            "client-reconnected"
        } else {
            "client-connected"
        };
        notify_controllers(state, verb, &record).await;
    }

    if outcome_is_reconnect {
        state.metrics.reconnections.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    } else {
        state.metrics.registrations.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    info!(client_id = %id, reconnect = outcome_is_reconnect, "client registered");

    Ok(if outcome_is_reconnect {
        RegisterOutcome::Reconnected(record)
    } else {
        RegisterOutcome::Fresh(record)
    })
}

pub async fn refresh_last_seen(state: &AppState, id: &str) -> Result<(), kv_store::KvError> {
    let key = keys::client_record(id);
    if let Some(mut record) = state.kv.get_json::<ClientRecord>(&key).await? {
        record.last_seen = now_millis();
        state
            .kv
            .set_json(&key, &record, Some(state.settings.client_ttl))
            .await?;
    }
    Ok(())
}

pub async fn unregister(state: &AppState, id: &str) -> Result<(), kv_store::KvError> {
    let key = keys::client_record(id);
    let record: Option<ClientRecord> = state.kv.get_json(&key).await?;
    state.kv.delete(&key).await?;

    if id.starts_with("controller-") {
        state.kv.delete(&keys::controller_directory_entry(id)).await?;
    } else if let Some(record) = record {
        notify_controllers(state, "client-disconnected", &record).await;
    }

    info!(client_id = %id, "client unregistered");
    Ok(())
}

/// Enumerates synth records for controllers (spec §4.B). Does not itself
/// evict anyone — that's the reaper's job exclusively.
pub async fn list_synths(state: &AppState) -> Result<Vec<ClientListEntry>, kv_store::KvError> {
    let entries = state.kv.list_json::<ClientRecord>(&keys::clients_prefix()).await?;
    let claimed = state.claimed_synth_ids().await;
    let local = state.local_socket_ids().await;

    Ok(entries
        .into_iter()
        .filter_map(|(_, record)| {
            if record.is_controller {
                return None;
            }
            Some(ClientListEntry {
                id: record.id.clone(),
                connected: local.contains(&record.id),
                last_seen: record.last_seen,
                reconnection_count: record.reconnection_count,
                claimed: claimed.contains(&record.id),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use std::sync::Arc;

    fn test_state() -> AppState {
        AppState::new(
            Arc::new(kv_store::memory::MemoryKvStore::new()),
            "test-instance".to_owned(),
            crate::config::Settings::default(),
        )
    }

    #[tokio::test]
    async fn first_register_is_fresh_and_stamps_connection_timestamp() {
        let state = test_state();
        let outcome = register(&state, "synth-1", false).await.unwrap();
        assert!(!outcome.is_reconnection());
        assert_eq!(outcome.record().reconnection_count, 0);
    }

    #[tokio::test]
    async fn second_register_is_reconnect_and_preserves_connection_timestamp() {
        let state = test_state();
        let first = register(&state, "synth-1", false).await.unwrap();
        let first_ts = first.record().connection_timestamp;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = register(&state, "synth-1", false).await.unwrap();

        assert!(second.is_reconnection());
        assert_eq!(second.record().connection_timestamp, first_ts);
        assert_eq!(second.record().reconnection_count, 1);
    }

    #[tokio::test]
    async fn unregister_removes_record() {
        let state = test_state();
        register(&state, "synth-1", false).await.unwrap();
        unregister(&state, "synth-1").await.unwrap();
        let key = keys::client_record("synth-1");
        assert!(state.kv.get_json::<ClientRecord>(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_synths_skips_controllers() {
        let state = test_state();
        register(&state, "synth-1", false).await.unwrap();
        register(&state, "controller-1", false).await.unwrap();
        let listing = list_synths(&state).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, "synth-1");
    }
}
