use crate::http::response::{internal_error, HttpResponse};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use kv_store::KvStoreExt;
use signal_protocol::{ClientIdRequest, ClientIdResponse, ClientType};
use uuid::Uuid;

/// Mints a fresh client id as `<type>-<uuid-v4>` (spec §9 open question #3:
/// widened from the source's short random suffix to avoid collisions) and
/// reserves it under the client TTL so a slow client still finds its record
/// present when it connects and registers.
pub async fn post_client_id(
    State(state): State<AppState>,
    Json(body): Json<ClientIdRequest>,
) -> HttpResponse {
    let id = format!("{}{}", body.client_type.prefix(), Uuid::new_v4());

    let record = crate::registry::ClientRecord {
        id: id.clone(),
        instance_id: state.instance_id.clone(),
        connection_timestamp: crate::registry::now_millis(),
        last_seen: crate::registry::now_millis(),
        reconnection_count: 0,
        last_reconnect_time: None,
        is_controller: matches!(body.client_type, ClientType::Controller),
    };

    if let Err(e) = state
        .kv
        .set_json(
            &crate::keys::client_record(&id),
            &record,
            Some(state.settings.client_ttl),
        )
        .await
    {
        return internal_error(e).into_response();
    }

    Json(ClientIdResponse {
        success: true,
        client_id: id,
        client_type: body.client_type,
    })
    .into_response()
}
