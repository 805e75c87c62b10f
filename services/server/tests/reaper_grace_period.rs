mod common;

use common::{fast_settings, TestServer};
use kv_store::KvStoreExt;
use server::keys;
use signal_protocol::ClientFrame;
use std::time::Duration;
use test_support::MockSignalClient;

/// Scenario 4 from spec §8: a synth that never gets claimed by a controller
/// survives the grace period but is eventually reaped once it elapses.
#[tokio::test]
async fn reaper_skips_grace_period_then_evicts() {
    let server = TestServer::start(fast_settings()).await;

    let mut synth = MockSignalClient::connect(&server.ws_url()).await.unwrap();
    synth
        .send(&ClientFrame::Register {
            id: "synth-y".to_owned(),
            client_type: None,
            is_reconnect: false,
            timestamp: None,
        })
        .await
        .unwrap();
    synth.recv().await.unwrap();

    // Still inside the grace period (150ms): the record must survive.
    tokio::time::sleep(Duration::from_millis(60)).await;
    let present = server
        .state
        .kv
        .get_json::<server::registry::ClientRecord>(&keys::client_record("synth-y"))
        .await
        .unwrap();
    assert!(present.is_some(), "synth must survive inside the grace period");

    // Well past the grace period and several sweep ticks later, it's reaped.
    tokio::time::sleep(Duration::from_millis(400)).await;
    let evicted = server
        .state
        .kv
        .get_json::<server::registry::ClientRecord>(&keys::client_record("synth-y"))
        .await
        .unwrap();
    assert!(evicted.is_none(), "synth should be reaped after the grace period elapses");
}

#[tokio::test]
async fn reaper_never_evicts_a_claimed_synth() {
    let server = TestServer::start(fast_settings()).await;

    let mut synth = MockSignalClient::connect(&server.ws_url()).await.unwrap();
    synth
        .send(&ClientFrame::Register {
            id: "synth-claimed".to_owned(),
            client_type: None,
            is_reconnect: false,
            timestamp: None,
        })
        .await
        .unwrap();
    synth.recv().await.unwrap();

    server
        .state
        .update_webrtc_map("controller-holder", vec!["synth-claimed".to_owned()])
        .await;

    tokio::time::sleep(Duration::from_millis(400)).await;

    let still_present = server
        .state
        .kv
        .get_json::<server::registry::ClientRecord>(&keys::client_record("synth-claimed"))
        .await
        .unwrap();
    assert!(still_present.is_some(), "a claimed synth must never be reaped");
}
