use server::config::Settings;
use server::state::AppState;
use std::sync::Arc;
use std::time::Duration;

/// Boots a full `build_router` instance (including the leadership poller and
/// reaper sweeper) on an ephemeral port, backed by an in-memory KV store.
pub struct TestServer {
    pub addr: std::net::SocketAddr,
    pub state: AppState,
}

impl TestServer {
    pub async fn start(settings: Settings) -> Self {
        let kv = Arc::new(kv_store::memory::MemoryKvStore::new());
        let instance_id = format!("test-{}", uuid::Uuid::new_v4());
        let state = AppState::new(kv, instance_id, settings);

        tokio::spawn(server::leadership::run_notification_poller(state.clone()));
        tokio::spawn(server::reaper::run_periodic_sweeper(state.clone()));

        let router = server::build_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        // give the listener a moment to start accepting.
        tokio::time::sleep(Duration::from_millis(20)).await;
        Self { addr, state }
    }

    /// A second "instance" sharing the same KV store but its own in-process
    /// socket map and leadership poller — this is how cross-instance
    /// delivery is exercised without standing up a real second process.
    pub async fn start_peer(&self, settings: Settings) -> Self {
        let instance_id = format!("test-{}", uuid::Uuid::new_v4());
        let state = AppState::new(self.state.kv.clone(), instance_id, settings);

        tokio::spawn(server::leadership::run_notification_poller(state.clone()));
        tokio::spawn(server::reaper::run_periodic_sweeper(state.clone()));

        let router = server::build_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        Self { addr, state }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/signal", self.addr)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub fn fast_settings() -> Settings {
    Settings {
        client_ttl: Duration::from_secs(60),
        queue_ttl: Duration::from_secs(30),
        heartbeat_timeout: Duration::from_millis(300),
        grace_period: Duration::from_millis(150),
        notification_staleness: Duration::from_secs(30),
        poll_interval: Duration::from_millis(30),
        notification_poll_interval: Duration::from_millis(30),
    }
}
