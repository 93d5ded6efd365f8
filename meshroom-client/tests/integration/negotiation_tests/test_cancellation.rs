use meshroom_client::NegotiationState;
use meshroom_core::{PeerId, SignalMessage};

use crate::integration::{init_tracing, wait_until};
use crate::utils::TestPeer;

#[tokio::test]
async fn test_leave_while_offer_is_in_flight_discards_the_result() {
    init_tracing();

    let mut a = TestPeer::joined("a").await;
    let b = PeerId::from("b");

    a.orchestrator
        .dispatch(SignalMessage::UserJoined { user_id: b.clone() })
        .unwrap();
    a.orchestrator
        .dispatch(SignalMessage::UserLeft { user_id: b.clone() })
        .unwrap();
    a.orchestrator.settle().await;

    assert!(a.orchestrator.registry().get(&b).is_none());
    assert!(
        a.drain_outbox().iter().all(|m| m.kind() != "offer"),
        "offer for a departed peer must not be sent"
    );
    let link = a.connector.link_for(&b).unwrap();
    assert!(wait_until(|| link.is_closed(), 1000).await);
}

#[tokio::test]
async fn test_rejoin_gets_a_fresh_session() {
    init_tracing();

    let mut a = TestPeer::joined("a").await;
    let b = PeerId::from("b");

    a.orchestrator
        .dispatch(SignalMessage::UserJoined { user_id: b.clone() })
        .unwrap();
    a.orchestrator
        .dispatch(SignalMessage::UserLeft { user_id: b.clone() })
        .unwrap();
    a.peer_joined(&b).await.unwrap();

    assert_eq!(a.state_of(&b), Some(NegotiationState::OfferSent));
    assert_eq!(a.connector.link_count(), 2);
    let offers: Vec<_> = a
        .drain_outbox()
        .into_iter()
        .filter(|m| m.kind() == "offer")
        .collect();
    assert_eq!(offers.len(), 1);

    // the answer applies to the new incarnation
    a.answer_from(&b).await.unwrap();
    assert_eq!(a.state_of(&b), Some(NegotiationState::Stable));
}

#[tokio::test]
async fn test_shutdown_leaves_room_and_closes_sessions() {
    init_tracing();

    let mut a = TestPeer::joined("a").await;
    let b = PeerId::from("b");
    let c = PeerId::from("c");
    a.peer_joined(&b).await.unwrap();
    a.peer_joined(&c).await.unwrap();
    a.drain_outbox();

    a.orchestrator.shutdown().await;

    assert!(a.orchestrator.registry().is_empty());
    let sent = a.drain_outbox();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind(), "leave");
    for peer in [&b, &c] {
        let link = a.connector.link_for(peer).unwrap();
        assert!(wait_until(|| link.is_closed(), 1000).await);
    }
}
