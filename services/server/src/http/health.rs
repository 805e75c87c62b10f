use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use kv_store::{Key, KvStore};

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness additionally round-trips the KV store on a throwaway key so a
/// broken backing store fails readiness without also failing liveness.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let probe_key = Key::new(["_readyz-probe", state.instance_id.as_str()]);
    let probe = async {
        state.kv.set(&probe_key, b"1".to_vec(), None).await?;
        state.kv.get(&probe_key).await
    }
    .await;

    match probe {
        Ok(_) => (StatusCode::OK, "ok").into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
