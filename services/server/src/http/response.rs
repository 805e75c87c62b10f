use axum::{http::StatusCode, response::Response, Json};
use signal_protocol::HttpErrorEnvelope;
use std::fmt::Display;

pub type HttpResponse = Response;

fn json_error(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    use axum::response::IntoResponse;
    (status, Json(HttpErrorEnvelope::new(message))).into_response()
}

pub fn unauthorized(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::UNAUTHORIZED, message)
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::BAD_REQUEST, message)
}

pub fn not_found(message: impl Into<String>) -> HttpResponse {
    json_error(StatusCode::NOT_FOUND, message)
}

pub fn internal_error(err: impl Display) -> HttpResponse {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
