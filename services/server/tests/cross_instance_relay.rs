mod common;

use common::{fast_settings, TestServer};
use signal_protocol::ClientFrame;
use std::time::Duration;
use test_support::MockSignalClient;

/// Two "instances" (separate routers, separate local socket maps) sharing
/// one KV store: an offer addressed to a peer attached on the other
/// instance must be queued and picked up by that instance's poller rather
/// than dropped.
#[tokio::test]
async fn offer_delivered_across_instances_via_queue() {
    let primary = TestServer::start(fast_settings()).await;
    let secondary = primary.start_peer(fast_settings()).await;

    let mut synth = MockSignalClient::connect(&secondary.ws_url()).await.unwrap();
    synth
        .send(&ClientFrame::Register {
            id: "synth-remote".to_owned(),
            client_type: None,
            is_reconnect: false,
            timestamp: None,
        })
        .await
        .unwrap();
    synth.recv().await.unwrap();

    let mut controller = MockSignalClient::connect(&primary.ws_url()).await.unwrap();
    controller
        .send(&ClientFrame::Register {
            id: "controller-relay".to_owned(),
            client_type: None,
            is_reconnect: false,
            timestamp: None,
        })
        .await
        .unwrap();
    controller.recv().await.unwrap();

    controller
        .send(&ClientFrame::Offer {
            target: "synth-remote".to_owned(),
            data: serde_json::json!({"sdp": "v=0"}),
            source: None,
        })
        .await
        .unwrap();

    let relayed = synth
        .recv_matching(Duration::from_secs(2), |f| matches!(f, ClientFrame::Offer { .. }))
        .await
        .unwrap();

    match relayed {
        ClientFrame::Offer { source, target, .. } => {
            assert_eq!(source.as_deref(), Some("controller-relay"));
            assert_eq!(target, "synth-remote");
        }
        _ => unreachable!(),
    }
}
