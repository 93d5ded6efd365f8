use meshroom_client::{MeshEvent, NegotiationState, Role, TransportEvent};
use meshroom_core::{PeerId, SignalMessage};

use crate::integration::init_tracing;
use crate::utils::{MockConnector, TestPeer, candidate, pump};

#[tokio::test]
async fn test_existing_member_offers_and_newcomer_answers() {
    init_tracing();

    let connector_a = MockConnector::new();
    let connector_b = MockConnector::new();
    connector_a.defer_connections();
    connector_b.defer_connections();
    let mut a = TestPeer::joined_with("a", connector_a).await;
    let mut b = TestPeer::joined_with("b", connector_b).await;
    let (id_a, id_b) = (a.id.clone(), b.id.clone());

    // relay tells the member already present that b joined
    a.peer_joined(&id_b).await.expect("join accepted");
    assert_eq!(a.state_of(&id_b), Some(NegotiationState::OfferSent));
    let sent = a.drain_outbox();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind(), "offer");
    assert_eq!(sent[0].recipient(), Some(&id_b));

    // b only learns about a through the offer
    b.receive_from(&id_a, sent[0].clone()).await.expect("offer accepted");
    assert_eq!(b.state_of(&id_a), Some(NegotiationState::AnswerSent));
    let session = b.orchestrator.registry().get(&id_a).unwrap();
    assert_eq!(session.role(), Some(Role::Answerer));
    let answers = b.drain_outbox();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].kind(), "answer");
    assert_eq!(answers[0].recipient(), Some(&id_a));

    a.receive_from(&id_b, answers[0].clone()).await.expect("answer accepted");
    assert_eq!(a.state_of(&id_b), Some(NegotiationState::Stable));

    // the answerer reaches Stable once its connection reports in
    let link = b.connector.link_for(&id_a).unwrap();
    link.emit(TransportEvent::Connected(link.tag.clone()))
        .await;
    b.orchestrator.settle().await;
    assert_eq!(b.state_of(&id_a), Some(NegotiationState::Stable));

    assert!(b.drain_events().contains(&MeshEvent::PeerJoined(id_a.clone())));
}

#[tokio::test]
async fn test_back_to_back_orchestrators_reach_stable() {
    init_tracing();

    let mut peers = vec![TestPeer::joined("a").await, TestPeer::joined("b").await];
    let id_a = peers[0].id.clone();
    let id_b = peers[1].id.clone();

    peers[0].peer_joined(&id_b).await.unwrap();
    let delivered = pump(&mut peers).await;
    assert!(delivered >= 2, "offer and answer must cross the relay");

    assert_eq!(peers[0].state_of(&id_b), Some(NegotiationState::Stable));
    assert_eq!(peers[1].state_of(&id_a), Some(NegotiationState::Stable));
    assert_eq!(peers[0].orchestrator.connected_count(), 1);
    assert_eq!(peers[1].orchestrator.connected_count(), 1);

    assert!(peers[0].drain_events().contains(&MeshEvent::PeerConnected(id_b)));
    assert!(peers[1].drain_events().contains(&MeshEvent::PeerConnected(id_a)));
}

#[tokio::test]
async fn test_three_members_form_a_full_mesh() {
    init_tracing();

    let mut peers = vec![
        TestPeer::joined("a").await,
        TestPeer::joined("b").await,
        TestPeer::joined("c").await,
    ];
    let ids: Vec<PeerId> = peers.iter().map(|p| p.id.clone()).collect();

    // b joins a room holding a; then c joins a room holding a and b
    peers[0].peer_joined(&ids[1]).await.unwrap();
    pump(&mut peers).await;
    peers[0].peer_joined(&ids[2]).await.unwrap();
    peers[1].peer_joined(&ids[2]).await.unwrap();
    pump(&mut peers).await;

    for (i, peer) in peers.iter().enumerate() {
        assert_eq!(peer.orchestrator.registry().len(), 2, "peer {i}");
        assert_eq!(peer.orchestrator.connected_count(), 2, "peer {i}");
        for (j, other) in ids.iter().enumerate() {
            if i != j {
                assert_eq!(peer.state_of(other), Some(NegotiationState::Stable));
            }
        }
    }

    // the newest member never offered
    assert_eq!(peers[2].signaling.count("offer"), 0);
    assert_eq!(peers[2].signaling.count("answer"), 2);
}

#[tokio::test]
async fn test_local_candidates_are_sent_to_their_peer() {
    init_tracing();

    let mut a = TestPeer::joined("a").await;
    let id_b = PeerId::from("b");
    a.peer_joined(&id_b).await.unwrap();
    a.drain_outbox();

    let link = a.connector.link_for(&id_b).unwrap();
    link.emit(TransportEvent::CandidateGenerated(
        link.tag.clone(),
        candidate(7),
    ))
    .await;
    a.orchestrator.settle().await;

    let sent = a.drain_outbox();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        SignalMessage::Candidate {
            candidate: c,
            to,
            room_id,
            ..
        } => {
            assert_eq!(c, &candidate(7));
            assert_eq!(to.as_ref(), Some(&id_b));
            assert_eq!(room_id.as_ref().map(|r| r.as_str()), Some("room1"));
        }
        other => panic!("expected candidate, got {other:?}"),
    }
}
