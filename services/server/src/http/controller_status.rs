use crate::http::response::{internal_error, HttpResponse};
use crate::leadership::get_active_record;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use signal_protocol::ControllerStatusResponse;

pub async fn get_controller_status(State(state): State<AppState>) -> HttpResponse {
    match get_active_record(&state).await {
        Ok(record) => Json(ControllerStatusResponse {
            active_controller: record.as_ref().map(|r| r.id.clone()),
            timestamp: record.map(|r| r.timestamp),
            timeout_ms: state.settings.heartbeat_timeout.as_millis() as u64,
        })
        .into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}
