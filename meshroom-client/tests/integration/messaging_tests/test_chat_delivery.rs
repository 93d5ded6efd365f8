use meshroom_client::MeshEvent;
use meshroom_core::PeerId;

use crate::integration::init_tracing;
use crate::utils::TestPeer;

#[tokio::test]
async fn test_received_frames_reach_the_view_in_order() {
    init_tracing();

    let mut a = TestPeer::joined("a").await;
    let b = PeerId::from("b");
    a.peer_joined(&b).await.unwrap();
    a.answer_from(&b).await.unwrap();
    a.drain_events();

    let link = a.connector.link_for(&b).unwrap();
    link.receive(br#"{"message":"first","username":"Fox"}"#).await;
    link.receive(b"definitely not json").await;
    link.receive(br#"{"message":"second","username":"Fox"}"#).await;
    a.orchestrator.settle().await;

    let chats: Vec<_> = a
        .drain_events()
        .into_iter()
        .filter_map(|e| match e {
            MeshEvent::Chat(record) => Some(record),
            _ => None,
        })
        .collect();
    assert_eq!(chats.len(), 2);
    assert_eq!(chats[0].text, "first");
    assert_eq!(chats[1].text, "second");
    assert!(chats.iter().all(|r| r.sender == "Fox" && !r.from_me));
    assert!(chats.iter().all(|r| r.peer_id.as_ref() == Some(&b)));
    assert!(chats[0].received_at <= chats[1].received_at);
}

#[tokio::test]
async fn test_frames_from_a_closed_session_are_dropped() {
    init_tracing();

    let mut a = TestPeer::joined("a").await;
    let b = PeerId::from("b");
    a.peer_joined(&b).await.unwrap();
    a.answer_from(&b).await.unwrap();
    let link = a.connector.link_for(&b).unwrap();
    a.peer_left(&b).await.unwrap();
    a.drain_events();

    link.receive(br#"{"message":"late","username":"Fox"}"#).await;
    a.orchestrator.settle().await;

    assert!(a.drain_events().is_empty());
}
