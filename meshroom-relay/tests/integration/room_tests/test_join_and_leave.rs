use anyhow::Result;
use meshroom_core::SignalMessage;
use meshroom_relay::RelayConfig;

use crate::integration::init_tracing;
use crate::utils::{WsClient, start_relay};

#[tokio::test]
async fn test_clients_get_distinct_ids() -> Result<()> {
    init_tracing();
    let url = start_relay(RelayConfig::default()).await;

    let a = WsClient::connect(&url).await?;
    let b = WsClient::connect(&url).await?;

    assert!(!a.id.is_empty());
    assert_ne!(a.id, b.id);
    Ok(())
}

#[tokio::test]
async fn test_join_announces_newcomer_to_members() -> Result<()> {
    init_tracing();
    let url = start_relay(RelayConfig::default()).await;
    let mut a = WsClient::connect(&url).await?;
    let mut b = WsClient::connect(&url).await?;
    let mut c = WsClient::connect(&url).await?;

    a.join("room1").await?;
    b.join("room1").await?;
    assert_eq!(
        a.next().await?,
        SignalMessage::UserJoined {
            user_id: b.id.clone()
        }
    );

    c.join("room1").await?;
    assert_eq!(
        a.next().await?,
        SignalMessage::UserJoined {
            user_id: c.id.clone()
        }
    );
    assert_eq!(
        b.next().await?,
        SignalMessage::UserJoined {
            user_id: c.id.clone()
        }
    );
    assert!(c.is_quiet().await, "newcomer is not told about members by default");
    Ok(())
}

#[tokio::test]
async fn test_announce_existing_tells_newcomer() -> Result<()> {
    init_tracing();
    let url = start_relay(RelayConfig {
        announce_existing: true,
        ..RelayConfig::default()
    })
    .await;
    let mut a = WsClient::connect(&url).await?;
    let mut b = WsClient::connect(&url).await?;

    a.join("room1").await?;
    b.join("room1").await?;

    assert_eq!(
        b.next().await?,
        SignalMessage::UserJoined {
            user_id: a.id.clone()
        }
    );
    assert_eq!(
        a.next().await?,
        SignalMessage::UserJoined {
            user_id: b.id.clone()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_leave_notifies_remaining_members() -> Result<()> {
    init_tracing();
    let url = start_relay(RelayConfig::default()).await;
    let mut a = WsClient::connect(&url).await?;
    let mut b = WsClient::connect(&url).await?;

    a.join("room1").await?;
    b.join("room1").await?;
    a.next().await?;

    b.leave("room1").await?;
    assert_eq!(
        a.next().await?,
        SignalMessage::UserLeft {
            user_id: b.id.clone()
        }
    );

    // Rejoining after leaving is announced again.
    b.join("room1").await?;
    assert_eq!(
        a.next().await?,
        SignalMessage::UserJoined {
            user_id: b.id.clone()
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_rooms_are_isolated() -> Result<()> {
    init_tracing();
    let url = start_relay(RelayConfig::default()).await;
    let mut a = WsClient::connect(&url).await?;
    let mut b = WsClient::connect(&url).await?;

    a.join("room1").await?;
    b.join("room2").await?;

    assert!(a.is_quiet().await);
    assert!(b.is_quiet().await);
    Ok(())
}
