mod common;

use common::{fast_settings, TestServer};
use signal_protocol::ClientFrame;
use std::time::Duration;
use test_support::MockSignalClient;

/// Scenario 1 from spec §8: a controller registers then activates; every
/// previously-registered synth must receive `active-controller` promptly.
#[tokio::test]
async fn activation_path_notifies_attached_synths() {
    let server = TestServer::start(fast_settings()).await;

    let mut synth = MockSignalClient::connect(&server.ws_url()).await.unwrap();
    synth
        .send(&ClientFrame::Register {
            id: "synth-1".to_owned(),
            client_type: None,
            is_reconnect: false,
            timestamp: None,
        })
        .await
        .unwrap();
    let confirmed = synth.recv().await.unwrap();
    assert!(matches!(confirmed, ClientFrame::RegistrationConfirmed { .. }));

    let mut controller = MockSignalClient::connect(&server.ws_url()).await.unwrap();
    controller
        .send(&ClientFrame::Register {
            id: "controller-abc".to_owned(),
            client_type: None,
            is_reconnect: false,
            timestamp: None,
        })
        .await
        .unwrap();
    let confirmed = controller.recv().await.unwrap();
    assert!(matches!(confirmed, ClientFrame::RegistrationConfirmed { .. }));

    controller
        .send(&ClientFrame::ControllerActivate {
            id: Some("controller-abc".to_owned()),
        })
        .await
        .unwrap();

    let active = synth
        .recv_matching(Duration::from_secs(2), |f| {
            matches!(f, ClientFrame::ActiveController { controller_id: Some(_), .. })
        })
        .await
        .unwrap();

    match active {
        ClientFrame::ActiveController { controller_id, .. } => {
            assert_eq!(controller_id.as_deref(), Some("controller-abc"));
        }
        _ => unreachable!(),
    }
}
