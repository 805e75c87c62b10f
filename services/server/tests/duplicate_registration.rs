mod common;

use common::{fast_settings, TestServer};
use signal_protocol::ClientFrame;
use test_support::MockSignalClient;

/// Scenario 5 from spec §8: a second registration under the same id closes
/// the first socket with 1000/"Replaced" and the registry record shows the
/// reconnection accounting, not a fresh record.
#[tokio::test]
async fn duplicate_id_replaces_prior_socket() {
    let server = TestServer::start(fast_settings()).await;

    let mut first = MockSignalClient::connect(&server.ws_url()).await.unwrap();
    first
        .send(&ClientFrame::Register {
            id: "synth-z".to_owned(),
            client_type: None,
            is_reconnect: false,
            timestamp: None,
        })
        .await
        .unwrap();
    assert!(matches!(first.recv().await.unwrap(), ClientFrame::RegistrationConfirmed { .. }));

    let mut second = MockSignalClient::connect(&server.ws_url()).await.unwrap();
    second
        .send(&ClientFrame::Register {
            id: "synth-z".to_owned(),
            client_type: None,
            is_reconnect: true,
            timestamp: None,
        })
        .await
        .unwrap();

    let confirmed = second.recv().await.unwrap();
    match confirmed {
        ClientFrame::RegistrationConfirmed {
            reconnection_count,
            is_reconnection,
            ..
        } => {
            assert!(is_reconnection);
            assert_eq!(reconnection_count, 1);
        }
        other => panic!("expected registration-confirmed, got {other:?}"),
    }

    // The first socket's connection is closed by the server.
    let closed = first.recv().await;
    assert!(closed.is_err(), "first socket should observe a close, got {closed:?}");
}
