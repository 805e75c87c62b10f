use crate::auth::query_flag;
use crate::http::response::{internal_error, unauthorized, HttpResponse};
use crate::leadership::{broadcast_active_controller, force_reset};
use crate::state::AppState;
use axum::{
    extract::{RawQuery, State},
    response::IntoResponse,
    Json,
};

/// `GET /controller/clear?admin_mode=true` unconditionally resets leadership
/// (spec §6); any other query is rejected the same as a missing session.
pub async fn get_controller_clear(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> HttpResponse {
    if !query_flag(query.as_deref(), "admin_mode", "true") {
        return unauthorized("admin_mode=true is required").into_response();
    }

    let notification = match force_reset(&state).await {
        Ok(notification) => notification,
        Err(e) => return internal_error(e).into_response(),
    };
    broadcast_active_controller(&state, None, notification.timestamp).await;
    state
        .set_last_processed_notification(notification.notification_id)
        .await;

    Json(serde_json::json!({ "success": true })).into_response()
}
