//! HTTP session authentication is an externally-owned concern (spec §6
//! Non-goals): this module is the seam a deployment plugs real session/cookie
//! validation into, not a full auth system. The extractor below only checks
//! that *some* session credential was presented, mirroring the teacher's
//! bearer-token gate in shape without inventing a token issuance/validation
//! backend the spec never asked for.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
};

use crate::http::response::{unauthorized, HttpResponse};

pub struct SessionGate;

impl<S> FromRequestParts<S> for SessionGate
where
    S: Send + Sync,
{
    type Rejection = HttpResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let has_session =
            parts.headers.contains_key("authorization") || parts.headers.contains_key("cookie");
        if has_session {
            Ok(SessionGate)
        } else {
            Err(unauthorized("missing session credential"))
        }
    }
}

/// `GET /controller/clear?admin_mode=true` and `GET /controller/lock?health=check`
/// both gate on raw query flags rather than the session extractor (spec §6).
pub fn query_flag(query: Option<&str>, flag: &str, expected: &str) -> bool {
    let Some(query) = query else { return false };
    query
        .split('&')
        .any(|pair| pair == format!("{flag}={expected}"))
}
