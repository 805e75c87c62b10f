use server::config::Settings;
use server::state::AppState;
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let instance_id = env::var("INSTANCE_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());
    let settings = Settings::from_env();

    let kv = build_kv_store().await;
    let state = AppState::new(kv, instance_id.clone(), settings);

    tokio::spawn(server::leadership::run_notification_poller(state.clone()));
    tokio::spawn(server::reaper::run_periodic_sweeper(state.clone()));

    let router = server::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind");
    info!(addr = %bind_addr, instance_id = %instance_id, "server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
    info!("server shut down gracefully");
}

async fn build_kv_store() -> Arc<dyn kv_store::KvStore> {
    let backend = env::var("KV_BACKEND").unwrap_or_else(|_| "memory".to_owned());
    match backend.as_str() {
        #[cfg(feature = "redis-backend")]
        "redis" => {
            let url = env::var("REDIS_URL").expect("REDIS_URL must be set when KV_BACKEND=redis");
            info!("connecting to redis kv backend...");
            let store = kv_store::redis_backend::RedisKvStore::connect(&url)
                .await
                .expect("failed to connect to redis");
            Arc::new(store)
        }
        #[cfg(not(feature = "redis-backend"))]
        "redis" => {
            panic!("KV_BACKEND=redis requires the redis-backend feature");
        }
        "memory" => Arc::new(kv_store::memory::MemoryKvStore::new()),
        other => panic!("unknown KV_BACKEND: {other}"),
    }
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
