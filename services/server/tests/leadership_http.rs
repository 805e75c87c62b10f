mod common;

use common::{fast_settings, TestServer};
use signal_protocol::{ControllerLockRequest, ControllerLockResponse, ControllerStatusResponse};
use std::time::Duration;

/// Scenario 6 from spec §8: a non-leader's heartbeat lock request is
/// rejected without changing the leadership record.
#[tokio::test]
async fn non_leader_heartbeat_lock_is_rejected() {
    let server = TestServer::start(fast_settings()).await;
    let client = reqwest::Client::new();

    let activate: ControllerLockResponse = client
        .post(server.http_url("/controller/lock"))
        .header("authorization", "Bearer test")
        .json(&ControllerLockRequest {
            controller_id: "controller-c1".to_owned(),
            heartbeat: false,
        })
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(activate.changed);
    assert!(activate.is_active);

    let rejected: ControllerLockResponse = client
        .post(server.http_url("/controller/lock"))
        .header("authorization", "Bearer test")
        .json(&ControllerLockRequest {
            controller_id: "controller-c2".to_owned(),
            heartbeat: true,
        })
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(!rejected.changed);
    assert!(!rejected.is_active);
    assert_eq!(rejected.active_controller.as_deref(), Some("controller-c1"));
}

#[tokio::test]
async fn missing_session_credential_is_unauthorized() {
    let server = TestServer::start(fast_settings()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.http_url("/controller/lock"))
        .json(&ControllerLockRequest {
            controller_id: "controller-c1".to_owned(),
            heartbeat: false,
        })
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

/// Scenario 3 from spec §8: an expired leader's status read returns null
/// and the active controller field clears.
#[tokio::test]
async fn leadership_expires_after_heartbeat_timeout() {
    let server = TestServer::start(fast_settings()).await;
    let client = reqwest::Client::new();

    client
        .post(server.http_url("/controller/lock"))
        .header("authorization", "Bearer test")
        .json(&ControllerLockRequest {
            controller_id: "controller-x".to_owned(),
            heartbeat: false,
        })
        .send()
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    let status: ControllerStatusResponse = client
        .get(server.http_url("/controller/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status.active_controller, None);
}
