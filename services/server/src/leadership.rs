//! Leadership Service (spec §4.D): a single active-controller record with
//! heartbeat expiry, plus change-notification publication and the
//! per-instance poller that turns those notifications into broadcasts.

use crate::keys;
use crate::registry::now_millis;
use crate::state::{send_frame, AppState};
use kv_store::{KvError, KvStore, KvStoreExt};
use serde::{Deserialize, Serialize};
use signal_protocol::ClientFrame;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerRecord {
    pub id: String,
    pub timestamp: i64,
    pub instance_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeNotification {
    pub controller_id: Option<String>,
    pub notification_id: String,
    pub timestamp: i64,
}

pub struct SetActiveOutcome {
    pub changed: bool,
    pub current: Option<String>,
    /// Present only when `changed` is true — the notification this call
    /// published, so the caller can broadcast it immediately without
    /// waiting for the poller and mark it as already processed locally.
    pub notification: Option<ChangeNotification>,
}

/// Reads the controller record, applying heartbeat-timeout expiry
/// (spec §3, §4.D). Expiry deletes the record and publishes a null
/// notification as a side effect of the read.
pub async fn get_active_record(state: &AppState) -> Result<Option<ControllerRecord>, KvError> {
    let key = keys::active_controller();
    let record: Option<ControllerRecord> = state.kv.get_json(&key).await?;
    let Some(record) = record else {
        return Ok(None);
    };

    let now = now_millis();
    let age = Duration::from_millis((now - record.timestamp).max(0) as u64);
    if age > state.settings.heartbeat_timeout {
        state.kv.delete(&key).await?;
        publish_notification(state, None).await?;
        info!(controller_id = %record.id, "leadership expired on read");
        return Ok(None);
    }
    Ok(Some(record))
}

pub async fn get_active_id(state: &AppState) -> Result<Option<String>, KvError> {
    Ok(get_active_record(state).await?.map(|r| r.id))
}

/// `isHeartbeat` distinguishes a `controller-heartbeat`/heartbeat-lock
/// request (which must never seize leadership from another controller)
/// from an explicit `controller-activate` (which may preempt).
pub async fn set_active(
    state: &AppState,
    id: &str,
    is_heartbeat: bool,
) -> Result<SetActiveOutcome, KvError> {
    let current = get_active_record(state).await?;
    let now = now_millis();

    match current {
        Some(rec) if rec.id == id => {
            let updated = ControllerRecord {
                id: rec.id.clone(),
                timestamp: now,
                instance_id: state.instance_id.clone(),
            };
            state.kv.set_json(&keys::active_controller(), &updated, None).await?;
            if !is_heartbeat {
                info!(controller_id = %id, "leadership re-asserted by current leader");
            }
            Ok(SetActiveOutcome {
                changed: false,
                current: Some(rec.id),
                notification: None,
            })
        }
        Some(rec) if is_heartbeat => {
            warn!(
                attempted_by = %id,
                current_leader = %rec.id,
                "non-leader heartbeat rejected"
            );
            Ok(SetActiveOutcome {
                changed: false,
                current: Some(rec.id),
                notification: None,
            })
        }
        _ => {
            let updated = ControllerRecord {
                id: id.to_owned(),
                timestamp: now,
                instance_id: state.instance_id.clone(),
            };
            state.kv.set_json(&keys::active_controller(), &updated, None).await?;
            let notification = publish_notification(state, Some(id.to_owned())).await?;
            state.metrics.leadership_changes.fetch_add(1, Ordering::Relaxed);
            info!(controller_id = %id, "leadership acquired");
            Ok(SetActiveOutcome {
                changed: true,
                current: Some(id.to_owned()),
                notification: Some(notification),
            })
        }
    }
}

/// Permitted only if `id` is the current leader. Returns the published
/// notification so the caller can mark it processed locally before
/// broadcasting, the same way `set_active` does via `SetActiveOutcome`.
pub async fn clear(state: &AppState, id: &str) -> Result<Option<ChangeNotification>, KvError> {
    match get_active_record(state).await? {
        Some(rec) if rec.id == id => {
            state.kv.delete(&keys::active_controller()).await?;
            let notification = publish_notification(state, None).await?;
            info!(controller_id = %id, "leadership cleared");
            Ok(Some(notification))
        }
        _ => Ok(None),
    }
}

/// Administrative: deletes unconditionally and publishes null.
pub async fn force_reset(state: &AppState) -> Result<ChangeNotification, KvError> {
    state.kv.delete(&keys::active_controller()).await?;
    let notification = publish_notification(state, None).await?;
    info!("leadership force-reset");
    Ok(notification)
}

async fn publish_notification(
    state: &AppState,
    controller_id: Option<String>,
) -> Result<ChangeNotification, KvError> {
    let notification = ChangeNotification {
        controller_id,
        notification_id: Uuid::new_v4().to_string(),
        timestamp: now_millis(),
    };
    state
        .kv
        .set_json(&keys::change_notification(), &notification, None)
        .await?;
    Ok(notification)
}

/// Broadcasts `active-controller{controllerId, timestamp}` to every
/// locally-attached synth, falling back to the queue on send failure
/// (spec §4.D). Used both by the poller and by the immediate broadcast a
/// `controller-activate`/`controller-deactivate` handler performs on its
/// own instance.
pub async fn broadcast_active_controller(
    state: &AppState,
    controller_id: Option<String>,
    timestamp: i64,
) {
    let frame = ClientFrame::ActiveController {
        controller_id: controller_id.clone(),
        timestamp,
    };
    for (synth_id, sink) in state.local_synth_sockets().await {
        if send_frame(&sink, &frame).await.is_err() {
            if let Err(e) = crate::deliver::queue_message(state, &synth_id, &frame).await {
                warn!(synth_id = %synth_id, error = %e, "failed to queue active-controller notification");
            }
        }
    }
}

/// Runs forever; intended to be spawned once per instance. Polls the single
/// change-notification key and broadcasts on every new, non-stale id.
pub async fn run_notification_poller(state: AppState) {
    let mut interval = tokio::time::interval(state.settings.notification_poll_interval);
    loop {
        interval.tick().await;
        if let Err(e) = poll_once(&state).await {
            warn!(error = %e, "notification poll failed");
        }
    }
}

async fn poll_once(state: &AppState) -> Result<(), KvError> {
    let notification: Option<ChangeNotification> =
        state.kv.get_json(&keys::change_notification()).await?;
    let Some(notification) = notification else {
        return Ok(());
    };

    let already_processed = state.last_processed_notification().await.as_deref()
        == Some(notification.notification_id.as_str());
    if already_processed {
        return Ok(());
    }

    let now = now_millis();
    let age = Duration::from_millis((now - notification.timestamp).max(0) as u64);
    if age > state.settings.notification_staleness {
        // Stale replay after restart — not a user-visible error (spec §7).
        state
            .set_last_processed_notification(notification.notification_id)
            .await;
        return Ok(());
    }

    broadcast_active_controller(state, notification.controller_id.clone(), notification.timestamp)
        .await;
    state
        .set_last_processed_notification(notification.notification_id)
        .await;
    Ok(())
}
