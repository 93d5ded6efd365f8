use meshroom_client::{MeshEvent, NegotiationState};
use meshroom_core::PeerId;

use crate::integration::init_tracing;
use crate::utils::{MockConnector, TestPeer};

#[tokio::test]
async fn test_rejected_offer_leaves_session_idle() {
    init_tracing();

    let connector = MockConnector::new();
    connector.reject_remote_descriptions();
    let mut b = TestPeer::joined_with("b", connector).await;
    let a = PeerId::from("a");

    b.offer_from(&a).await.unwrap();

    assert_eq!(b.state_of(&a), Some(NegotiationState::Idle));
    assert_eq!(b.signaling.count("answer"), 0);
    // not stuck: a fresh offer gets through the guards again
    b.offer_from(&a).await.unwrap();
    assert_eq!(b.state_of(&a), Some(NegotiationState::Idle));
}

#[tokio::test]
async fn test_rejected_answer_keeps_offer_sent() {
    init_tracing();

    let connector = MockConnector::new();
    connector.reject_remote_descriptions();
    let mut a = TestPeer::joined_with("a", connector).await;
    let b = PeerId::from("b");

    a.peer_joined(&b).await.unwrap();
    a.answer_from(&b).await.unwrap();

    assert_eq!(a.state_of(&b), Some(NegotiationState::OfferSent));
    let session = a.orchestrator.registry().get(&b).unwrap();
    assert!(!session.has_remote_description());
}

#[tokio::test]
async fn test_failed_connection_setup_drops_the_session() {
    init_tracing();

    let connector = MockConnector::new();
    connector.fail_connections();
    let mut a = TestPeer::joined_with("a", connector).await;
    let b = PeerId::from("b");

    a.peer_joined(&b).await.unwrap();

    assert!(a.orchestrator.registry().get(&b).is_none());
    assert_eq!(a.signaling.count("offer"), 0);
    assert_eq!(
        a.drain_events(),
        vec![MeshEvent::PeerJoined(b.clone()), MeshEvent::PeerLeft(b)]
    );
}
