mod common;

use common::{fast_settings, TestServer};
use signal_protocol::{ClientIdRequest, ClientIdResponse, ClientType, IceServersResponse};

#[tokio::test]
async fn client_id_mints_a_prefixed_uuid() {
    let server = TestServer::start(fast_settings()).await;
    let client = reqwest::Client::new();

    let response: ClientIdResponse = client
        .post(server.http_url("/client-id"))
        .json(&ClientIdRequest {
            client_type: ClientType::Synth,
        })
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(response.success);
    assert_eq!(response.client_type, ClientType::Synth);
    assert!(response.client_id.starts_with("synth-"));
    assert_eq!(response.client_id.len(), "synth-".len() + 36);
}

#[tokio::test]
async fn ice_servers_falls_back_to_stun_when_unconfigured() {
    let server = TestServer::start(fast_settings()).await;
    let client = reqwest::Client::new();

    let response: IceServersResponse = client
        .get(server.http_url("/ice-servers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(!response.ice_servers.is_empty());
}

#[tokio::test]
async fn unmatched_route_returns_404() {
    let server = TestServer::start(fast_settings()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(server.http_url("/this-route-does-not-exist"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
