use crate::auth::SessionGate;
use crate::http::response::{bad_request, internal_error, HttpResponse};
use crate::leadership::{self, get_active_record};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use signal_protocol::{
    ControllerLockHealthReport, ControllerLockRequest, ControllerLockResponse,
    ControllerLockStatusResponse,
};
use std::collections::HashMap;

pub async fn post_controller_lock(
    _session: SessionGate,
    State(state): State<AppState>,
    Json(body): Json<ControllerLockRequest>,
) -> HttpResponse {
    let outcome = match leadership::set_active(&state, &body.controller_id, body.heartbeat).await {
        Ok(outcome) => outcome,
        Err(e) => return internal_error(e).into_response(),
    };

    if outcome.changed {
        let notification = outcome
            .notification
            .clone()
            .expect("changed implies a published notification");
        leadership::broadcast_active_controller(
            &state,
            notification.controller_id.clone(),
            notification.timestamp,
        )
        .await;
        state
            .set_last_processed_notification(notification.notification_id)
            .await;
    }

    Json(ControllerLockResponse {
        is_active: outcome.current.as_deref() == Some(body.controller_id.as_str()),
        active_controller: outcome.current,
        changed: outcome.changed,
        timeout_ms: state.settings.heartbeat_timeout.as_millis() as u64,
    })
    .into_response()
}

pub async fn get_controller_lock(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> HttpResponse {
    if params.get("health").map(String::as_str) == Some("check") {
        return get_health_report(&state).await;
    }

    let record = match get_active_record(&state).await {
        Ok(r) => r,
        Err(e) => return internal_error(e).into_response(),
    };
    let owner_query = params.get("controllerId");
    let is_owner = match (&record, owner_query) {
        (Some(r), Some(q)) => &r.id == q,
        _ => false,
    };
    let remaining_time_ms = record.as_ref().map(|r| {
        let elapsed = crate::registry::now_millis() - r.timestamp;
        (state.settings.heartbeat_timeout.as_millis() as i64 - elapsed).max(0)
    });

    Json(ControllerLockStatusResponse {
        locked: record.is_some(),
        is_owner,
        active_controller: record.map(|r| r.id),
        remaining_time_ms,
    })
    .into_response()
}

async fn get_health_report(state: &AppState) -> HttpResponse {
    let mut notes = Vec::new();
    let record = match get_active_record(state).await {
        Ok(r) => r,
        Err(e) => return internal_error(e).into_response(),
    };

    if record.is_none() {
        notes.push("no active controller".to_owned());
    }

    Json(ControllerLockHealthReport {
        consistent: true,
        active_controller: record.map(|r| r.id),
        notes,
    })
    .into_response()
}

pub async fn delete_controller_lock(
    _session: SessionGate,
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> HttpResponse {
    let Some(controller_id) = params.get("controllerId") else {
        return bad_request("controllerId query parameter is required").into_response();
    };

    match leadership::clear(&state, controller_id).await {
        Ok(Some(notification)) => {
            leadership::broadcast_active_controller(&state, None, notification.timestamp).await;
            state
                .set_last_processed_notification(notification.notification_id)
                .await;
            Json(serde_json::json!({ "success": true, "released": true })).into_response()
        }
        Ok(None) => Json(serde_json::json!({ "success": true, "released": false })).into_response(),
        Err(e) => internal_error(e).into_response(),
    }
}
