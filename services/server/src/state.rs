use crate::config::Settings;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use signal_protocol::ClientFrame;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::AbortHandle;

pub type Sink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

struct LocalSocket {
    sink: Sink,
    poll_task: AbortHandle,
}

/// Per-instance counters surfaced at `/metrics` (spec §6 ambient addition).
#[derive(Default)]
pub struct Metrics {
    pub registrations: AtomicU64,
    pub reconnections: AtomicU64,
    pub messages_queued: AtomicU64,
    pub messages_delivered_local: AtomicU64,
    pub messages_delivered_from_queue: AtomicU64,
    pub reaper_sweeps: AtomicU64,
    pub reaper_evictions: AtomicU64,
    pub leadership_changes: AtomicU64,
    pub dropped_frames: AtomicU64,
}

impl Metrics {
    pub fn render(&self) -> String {
        let m = |name: &str, v: u64| format!("synth_core_{name} {v}\n");
        let mut out = String::new();
        out.push_str(&m("registrations_total", self.registrations.load(Ordering::Relaxed)));
        out.push_str(&m("reconnections_total", self.reconnections.load(Ordering::Relaxed)));
        out.push_str(&m("messages_queued_total", self.messages_queued.load(Ordering::Relaxed)));
        out.push_str(&m(
            "messages_delivered_local_total",
            self.messages_delivered_local.load(Ordering::Relaxed),
        ));
        out.push_str(&m(
            "messages_delivered_from_queue_total",
            self.messages_delivered_from_queue.load(Ordering::Relaxed),
        ));
        out.push_str(&m("reaper_sweeps_total", self.reaper_sweeps.load(Ordering::Relaxed)));
        out.push_str(&m("reaper_evictions_total", self.reaper_evictions.load(Ordering::Relaxed)));
        out.push_str(&m(
            "leadership_changes_total",
            self.leadership_changes.load(Ordering::Relaxed),
        ));
        out.push_str(&m("dropped_frames_total", self.dropped_frames.load(Ordering::Relaxed)));
        out
    }
}

#[derive(Clone)]
pub struct AppState {
    pub kv: Arc<dyn kv_store::KvStore>,
    pub instance_id: String,
    pub settings: Settings,
    pub metrics: Arc<Metrics>,
    local_sockets: Arc<RwLock<HashMap<String, LocalSocket>>>,
    active_webrtc_map: Arc<RwLock<HashMap<String, HashSet<String>>>>,
    last_processed_notification_id: Arc<RwLock<Option<String>>>,
    /// Per-instance view of when this instance last saw the active
    /// controller's activation — used only to gate the half-grace reaper
    /// trigger (spec §4.C); not persisted, not replicated.
    activation_seen_at: Arc<RwLock<Option<i64>>>,
}

impl AppState {
    pub fn new(kv: Arc<dyn kv_store::KvStore>, instance_id: String, settings: Settings) -> Self {
        Self {
            kv,
            instance_id,
            settings,
            metrics: Arc::new(Metrics::default()),
            local_sockets: Arc::new(RwLock::new(HashMap::new())),
            active_webrtc_map: Arc::new(RwLock::new(HashMap::new())),
            last_processed_notification_id: Arc::new(RwLock::new(None)),
            activation_seen_at: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn attach_local_socket(&self, id: &str, sink: Sink, poll_task: AbortHandle) {
        let mut map = self.local_sockets.write().await;
        if let Some(prev) = map.insert(id.to_owned(), LocalSocket { sink, poll_task }) {
            prev.poll_task.abort();
        }
    }

    /// Closes and removes any existing local socket under `id`, returning
    /// its sink so the caller can send the 1000/"Replaced" close frame.
    pub async fn take_local_socket(&self, id: &str) -> Option<Sink> {
        let mut map = self.local_sockets.write().await;
        map.remove(id).map(|prev| {
            prev.poll_task.abort();
            prev.sink
        })
    }

    pub async fn detach_local_socket(&self, id: &str) {
        if let Some(prev) = self.local_sockets.write().await.remove(id) {
            prev.poll_task.abort();
        }
    }

    pub async fn local_socket_ids(&self) -> HashSet<String> {
        self.local_sockets.read().await.keys().cloned().collect()
    }

    pub async fn local_synth_sockets(&self) -> Vec<(String, Sink)> {
        self.local_sockets
            .read()
            .await
            .iter()
            .filter(|(id, _)| id.starts_with("synth-"))
            .map(|(id, s)| (id.clone(), s.sink.clone()))
            .collect()
    }

    pub async fn local_sink(&self, id: &str) -> Option<Sink> {
        self.local_sockets.read().await.get(id).map(|s| s.sink.clone())
    }

    pub async fn update_webrtc_map(&self, controller_id: &str, synths: Vec<String>) {
        self.active_webrtc_map
            .write()
            .await
            .insert(controller_id.to_owned(), synths.into_iter().collect());
    }

    pub async fn claimed_synth_ids(&self) -> HashSet<String> {
        self.active_webrtc_map
            .read()
            .await
            .values()
            .flat_map(|set| set.iter().cloned())
            .collect()
    }

    pub async fn last_processed_notification(&self) -> Option<String> {
        self.last_processed_notification_id.read().await.clone()
    }

    pub async fn set_last_processed_notification(&self, id: String) {
        *self.last_processed_notification_id.write().await = Some(id);
    }

    pub async fn note_activation_seen(&self, now_millis: i64) {
        *self.activation_seen_at.write().await = Some(now_millis);
    }

    pub async fn millis_since_activation_seen(&self, now_millis: i64) -> Option<i64> {
        self.activation_seen_at.read().await.map(|t| now_millis - t)
    }
}

pub async fn send_frame(sink: &Sink, frame: &ClientFrame) -> Result<(), axum::Error> {
    use futures_util::SinkExt;
    let json = serde_json::to_string(frame).expect("ClientFrame always serializes");
    sink.lock().await.send(Message::Text(json)).await
}
