//! Message Router (spec §4.C): the per-WebSocket session loop, inbound verb
//! dispatch, and the per-socket outbound polling task that drains queued
//! messages into an attached synth or controller.

use crate::leadership::{broadcast_active_controller, get_active_id, get_active_record, set_active};
use crate::reaper;
use crate::registry::{self, now_millis};
use crate::state::{send_frame, AppState, Sink};
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use kv_store::{KvStore, KvStoreExt};
use signal_protocol::{ClientFrame, ClientType};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const REPLACED_CLOSE_WAIT: Duration = Duration::from_millis(100);

pub async fn signal_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink_raw, mut stream) = socket.split();
    let sink: Sink = Arc::new(Mutex::new(sink_raw));
    let mut client_id: Option<String> = None;

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => handle_frame(&state, &sink, &mut client_id, frame).await,
                Err(e) => {
                    state.metrics.dropped_frames.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    debug!(error = %e, "dropping unparseable frame")
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_)) => {}
            Err(e) => {
                warn!(error = %e, "websocket error, closing session");
                break;
            }
        }
    }

    if let Some(id) = client_id {
        state.detach_local_socket(&id).await;
        if let Err(e) = registry::unregister(&state, &id).await {
            warn!(client_id = %id, error = %e, "unregister on disconnect failed");
        }
    }
}

async fn handle_frame(state: &AppState, sink: &Sink, client_id: &mut Option<String>, frame: ClientFrame) {
    let result = match frame {
        ClientFrame::Register { id, is_reconnect, timestamp, .. } => {
            handle_register(state, sink, client_id, id, is_reconnect, timestamp).await
        }
        ClientFrame::Heartbeat { timestamp } => handle_heartbeat(state, sink, client_id, timestamp).await,
        ClientFrame::ControllerHeartbeat { .. } => handle_controller_heartbeat(state, sink, client_id).await,
        ClientFrame::ControllerActivate { id } => handle_controller_activate(state, sink, client_id, id).await,
        ClientFrame::ControllerDeactivate {} => handle_controller_deactivate(state, sink, client_id).await,
        ClientFrame::ControllerConnections { connections } => {
            handle_controller_connections(state, client_id, connections).await
        }
        ClientFrame::RequestActiveController {} => handle_request_active_controller(state, sink).await,
        ClientFrame::Offer { .. } | ClientFrame::Answer { .. } | ClientFrame::IceCandidate { .. } => {
            handle_signaling(state, client_id, frame).await
        }
        other => {
            debug!(?other, "ignoring server-only or unsupported inbound verb");
            Ok(())
        }
    };

    if let Err(e) = result {
        warn!(error = %e, "frame handling failed");
    }
}

async fn handle_register(
    state: &AppState,
    sink: &Sink,
    client_id: &mut Option<String>,
    id: String,
    is_reconnect: bool,
    timestamp: Option<i64>,
) -> Result<(), kv_store::KvError> {
    if let Some(prior) = state.take_local_socket(&id).await {
        let close = Message::Close(Some(CloseFrame {
            code: 1000,
            reason: "Replaced".into(),
        }));
        let _ = prior.lock().await.send(close).await;
        tokio::time::sleep(REPLACED_CLOSE_WAIT).await;
    }

    let _ = timestamp; // connectionTimestamp is stamped server-side, not client-supplied
    let outcome = registry::register(state, &id, is_reconnect).await?;

    let poll_task = spawn_outbound_poller(state.clone(), id.clone(), sink.clone());
    state.attach_local_socket(&id, sink.clone(), poll_task).await;
    *client_id = Some(id.clone());

    let record = outcome.record();
    let confirmed = ClientFrame::RegistrationConfirmed {
        id: id.clone(),
        reconnection_count: record.reconnection_count,
        timestamp: now_millis(),
        is_reconnection: outcome.is_reconnection(),
    };
    send_frame(sink, &confirmed).await.ok();

    match ClientType::from_id(&id) {
        Some(ClientType::Synth) => {
            if let Some(active) = get_active_record(state).await? {
                let frame = ClientFrame::ActiveController {
                    controller_id: Some(active.id),
                    timestamp: active.timestamp,
                };
                send_frame(sink, &frame).await.ok();
            }
        }
        Some(ClientType::Controller) => {
            let clients = registry::list_synths(state).await?;
            send_frame(sink, &ClientFrame::ClientList { clients }).await.ok();
        }
        None => {}
    }

    info!(client_id = %id, "session registered");
    Ok(())
}

async fn handle_heartbeat(
    state: &AppState,
    sink: &Sink,
    client_id: &Option<String>,
    timestamp: i64,
) -> Result<(), kv_store::KvError> {
    let Some(id) = client_id else { return Ok(()) };
    registry::refresh_last_seen(state, id).await?;
    send_frame(sink, &ClientFrame::HeartbeatAck { timestamp }).await.ok();
    Ok(())
}

async fn handle_controller_heartbeat(
    state: &AppState,
    sink: &Sink,
    client_id: &Option<String>,
) -> Result<(), kv_store::KvError> {
    let Some(id) = client_id else { return Ok(()) };
    registry::refresh_last_seen(state, id).await?;
    let clients = registry::list_synths(state).await?;
    send_frame(sink, &ClientFrame::ClientList { clients }).await.ok();
    Ok(())
}

async fn handle_controller_activate(
    state: &AppState,
    sink: &Sink,
    client_id: &Option<String>,
    explicit_id: Option<String>,
) -> Result<(), kv_store::KvError> {
    let Some(id) = client_id else { return Ok(()) };
    let target = explicit_id.as_deref().unwrap_or(id);
    let outcome = set_active(state, target, false).await?;

    if outcome.changed {
        let notification = outcome.notification.expect("changed implies a published notification");
        broadcast_active_controller(state, notification.controller_id.clone(), notification.timestamp).await;
        state
            .set_last_processed_notification(notification.notification_id)
            .await;
    }

    state.note_activation_seen(now_millis()).await;

    let clients = registry::list_synths(state).await?;
    send_frame(sink, &ClientFrame::ClientList { clients }).await.ok();

    reaper::schedule_sweep_after(state.clone(), state.settings.grace_period);
    Ok(())
}

async fn handle_controller_deactivate(
    state: &AppState,
    _sink: &Sink,
    client_id: &Option<String>,
) -> Result<(), kv_store::KvError> {
    let Some(id) = client_id else { return Ok(()) };
    if let Some(notification) = crate::leadership::clear(state, id).await? {
        let frame = ClientFrame::ActiveController {
            controller_id: None,
            timestamp: notification.timestamp,
        };
        for (synth_id, sink) in state.local_synth_sockets().await {
            if send_frame(&sink, &frame).await.is_err() {
                let _ = crate::deliver::queue_message(state, &synth_id, &frame).await;
            }
        }
        state
            .set_last_processed_notification(notification.notification_id)
            .await;
    }
    Ok(())
}

async fn handle_controller_connections(
    state: &AppState,
    client_id: &Option<String>,
    connections: Vec<String>,
) -> Result<(), kv_store::KvError> {
    let Some(id) = client_id else { return Ok(()) };
    state.update_webrtc_map(id, connections).await;

    let now = now_millis();
    let half_grace = state.settings.grace_period.as_millis() as i64 / 2;
    if state
        .millis_since_activation_seen(now)
        .await
        .is_some_and(|age| age > half_grace)
    {
        reaper::schedule_sweep_after(state.clone(), Duration::ZERO);
    }
    Ok(())
}

async fn handle_request_active_controller(state: &AppState, sink: &Sink) -> Result<(), kv_store::KvError> {
    let active = get_active_id(state).await?;
    let timestamp = now_millis();
    let frame = ClientFrame::ActiveController {
        controller_id: active,
        timestamp,
    };
    send_frame(sink, &frame).await.ok();
    Ok(())
}

async fn handle_signaling(
    state: &AppState,
    client_id: &Option<String>,
    mut frame: ClientFrame,
) -> Result<(), kv_store::KvError> {
    let Some(source_id) = client_id else { return Ok(()) };
    let Some(target) = frame.signaling_target().map(str::to_owned) else {
        return Ok(());
    };
    frame.stamp_source(source_id);
    crate::deliver::deliver_or_queue(state, &target, &frame).await
}

/// Drains this socket's queue once per tick, in key order, deleting each
/// entry as it is sent (spec §4.C). Best-effort: a send failure drops the
/// rest of this tick's batch rather than retrying, since the socket is
/// presumed dead and will be cleaned up by its recv loop.
fn spawn_outbound_poller(state: AppState, id: String, sink: Sink) -> tokio::task::AbortHandle {
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.settings.poll_interval);
        loop {
            interval.tick().await;
            let prefix = crate::keys::messages_prefix(&id);
            let entries = match state.kv.list_json::<ClientFrame>(&prefix).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(client_id = %id, error = %e, "failed to list queued messages");
                    continue;
                }
            };
            for (key, frame) in entries {
                if send_frame(&sink, &frame).await.is_err() {
                    break;
                }
                let _ = state.kv.delete(&key).await;
                state.metrics.messages_delivered_from_queue.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }
    });
    handle.abort_handle()
}
