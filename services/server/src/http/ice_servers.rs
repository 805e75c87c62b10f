use crate::http::response::HttpResponse;
use axum::{response::IntoResponse, Json};
use signal_protocol::IceServersResponse;

/// `ICE_SERVERS_JSON` may hold a JSON array of RTCIceServer objects (a TURN
/// deployment's credentials); absent that, a public STUN server is returned
/// so local development still has a working ICE configuration.
pub async fn get_ice_servers() -> HttpResponse {
    let ice_servers = std::env::var("ICE_SERVERS_JSON")
        .ok()
        .and_then(|raw| serde_json::from_str::<Vec<serde_json::Value>>(&raw).ok())
        .unwrap_or_else(|| vec![serde_json::json!({ "urls": "stun:stun.l.google.com:19302" })]);

    Json(IceServersResponse { ice_servers }).into_response()
}
