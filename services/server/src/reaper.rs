//! Reaper (spec §4.E): evicts synth clients that have gone quiet past the
//! grace period, but never one currently claimed by an active controller's
//! WebRTC map — a claimed synth is mid-call and may legitimately go quiet
//! on the signaling channel while audio keeps flowing peer-to-peer.

use crate::deliver::notify_controllers;
use crate::keys;
use crate::registry::{now_millis, ClientRecord};
use crate::state::AppState;
use kv_store::{KvStore, KvStoreExt};
use std::sync::atomic::Ordering;
use tracing::{debug, info};

/// One sweep: lists every synth record, skips claimed ids and ids still
/// inside the grace period (measured from `connection_timestamp`, per the
/// open-question decision recorded in the expanded spec), and evicts the
/// rest.
pub async fn sweep(state: &AppState) -> Result<usize, kv_store::KvError> {
    state.metrics.reaper_sweeps.fetch_add(1, Ordering::Relaxed);

    let entries = state.kv.list_json::<ClientRecord>(&keys::clients_prefix()).await?;
    let claimed = state.claimed_synth_ids().await;
    let now = now_millis();
    let grace_ms = state.settings.grace_period.as_millis() as i64;

    let mut evicted = 0usize;
    for (_, record) in entries {
        if record.is_controller {
            continue;
        }
        if claimed.contains(&record.id) {
            debug!(client_id = %record.id, "reaper skipping claimed synth");
            continue;
        }
        let age_since_connect = now - record.connection_timestamp;
        if age_since_connect < grace_ms {
            continue;
        }

        state.kv.delete(&keys::client_record(&record.id)).await?;
        state.detach_local_socket(&record.id).await;
        notify_controllers(state, "client-disconnected", &record).await;
        state.metrics.reaper_evictions.fetch_add(1, Ordering::Relaxed);
        evicted += 1;
        info!(client_id = %record.id, "reaper evicted stale synth");
    }

    Ok(evicted)
}

/// Runs forever on a fixed interval; intended to be spawned once per
/// instance (spec §4.E — the sweep itself is safe to run redundantly on
/// every instance since eviction is idempotent).
pub async fn run_periodic_sweeper(state: AppState) {
    let mut interval = tokio::time::interval(state.settings.poll_interval);
    loop {
        interval.tick().await;
        if let Err(e) = sweep(&state).await {
            tracing::warn!(error = %e, "reaper sweep failed");
        }
    }
}

/// Schedules a one-shot sweep after `delay`, used by the router to trigger
/// an early pass around controller-activate / controller-connections events
/// (spec §4.C, §4.E) without waiting for the next periodic tick.
pub fn schedule_sweep_after(state: AppState, delay: std::time::Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = sweep(&state).await {
            tracing::warn!(error = %e, "scheduled reaper sweep failed");
        }
    });
}
