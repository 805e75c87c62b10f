//! Cross-cutting delivery: local-vs-queued dispatch (spec §4.C) and the
//! controller broadcast helper used by the registry and reaper. Kept
//! separate from `registry`/`leadership`/`reaper` so none of those modules
//! need to depend on each other.

use crate::keys;
use crate::registry::ClientRecord;
use crate::state::{send_frame, AppState};
use kv_store::{KvError, KvStoreExt};
use signal_protocol::{ClientListEntry, ClientFrame};
use std::sync::atomic::Ordering;
use tracing::warn;
use ulid::Ulid;

/// Delivers `frame` to `target_id` locally if a socket is attached on this
/// instance, otherwise queues it through the KV store for the owning
/// instance's poller to pick up (spec §4.C).
pub async fn deliver_or_queue(
    state: &AppState,
    target_id: &str,
    frame: &ClientFrame,
) -> Result<(), KvError> {
    if let Some(sink) = state.local_sink(target_id).await {
        match send_frame(&sink, frame).await {
            Ok(()) => {
                state.metrics.messages_delivered_local.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
            Err(e) => {
                warn!(target = %target_id, error = %e, "local send failed, falling back to queue");
            }
        }
    }
    queue_message(state, target_id, frame).await
}

pub async fn queue_message(
    state: &AppState,
    target_id: &str,
    frame: &ClientFrame,
) -> Result<(), KvError> {
    let ulid = Ulid::new().to_string();
    let key = keys::queued_message(target_id, &ulid);
    state
        .kv
        .set_json(&key, frame, Some(state.settings.queue_ttl))
        .await?;
    state.metrics.messages_queued.fetch_add(1, Ordering::Relaxed);
    Ok(())
}

/// Sends a `client-connected` / `client-reconnected` / `client-disconnected`
/// notification to every controller known to the directory, local or not
/// (spec §4.B, §4.E).
pub async fn notify_controllers(state: &AppState, verb: &str, record: &ClientRecord) {
    let entry = ClientListEntry {
        id: record.id.clone(),
        connected: verb != "client-disconnected",
        last_seen: record.last_seen,
        reconnection_count: record.reconnection_count,
        claimed: false,
    };
    let frame = match verb {
        "client-connected" => ClientFrame::ClientConnected {
            client: Some(entry),
            client_id: Some(record.id.clone()),
        },
        "client-reconnected" => ClientFrame::ClientReconnected {
            client: Some(entry),
            client_id: Some(record.id.clone()),
        },
        "client-disconnected" => ClientFrame::ClientDisconnected {
            client: Some(entry),
            client_id: Some(record.id.clone()),
        },
        other => {
            warn!(verb = other, "unknown notification verb, dropping");
            return;
        }
    };

    let controllers = match state.kv.list_json::<ClientRecord>(&keys::controllers_prefix()).await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "failed to list controllers for notification");
            return;
        }
    };

    for (_, controller) in controllers {
        if let Err(e) = deliver_or_queue(state, &controller.id, &frame).await {
            warn!(controller = %controller.id, error = %e, "failed to notify controller");
        }
    }
}
