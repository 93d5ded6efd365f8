use crate::error::TransportError;
use crate::signaling::{SignalingEvent, SignalingOutput};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use meshroom_core::SignalMessage;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Websocket connection to the relay.
///
/// Writes go through an unbounded queue drained by a dedicated task, so
/// `send_signal` never waits on the socket. Inbound frames are forwarded as
/// [`SignalingEvent`]s; the stream always starts with `Opened` and ends with
/// `Closed`.
#[derive(Clone)]
pub struct WsSignaling {
    outbound: mpsc::UnboundedSender<Message>,
}

impl WsSignaling {
    pub async fn connect(
        url: &str,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<SignalingEvent>), TransportError> {
        let (socket, _) = connect_async(url).await?;
        info!("Connected to relay at {}", url);

        let (mut sender, mut receiver) = socket.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));

        event_tx
            .send(SignalingEvent::Opened)
            .await
            .map_err(|_| TransportError::Closed)?;

        tokio::spawn(async move {
            let mut send_task = tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    if sender.send(msg).await.is_err() {
                        break;
                    }
                }
                let _ = sender.close().await;
            });

            let mut recv_task = tokio::spawn({
                let events = event_tx.clone();

                async move {
                    while let Some(frame) = receiver.next().await {
                        match frame {
                            Ok(Message::Text(text)) => {
                                debug!("Relay IN: {}", text.as_str());
                                let event = SignalingEvent::Message(text.as_str().to_owned());
                                if events.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Ok(Message::Close(_)) => break,
                            Ok(_) => {}
                            Err(e) => {
                                warn!("Relay read failed: {}", e);
                                break;
                            }
                        }
                    }
                }
            });

            tokio::select! {
                _ = (&mut send_task) => recv_task.abort(),
                _ = (&mut recv_task) => send_task.abort(),
            };

            let _ = event_tx.send(SignalingEvent::Closed).await;
            info!("Relay connection closed");
        });

        Ok((Self { outbound: tx }, event_rx))
    }
}

#[async_trait]
impl SignalingOutput for WsSignaling {
    async fn send_signal(&self, msg: SignalMessage) -> Result<(), TransportError> {
        let json = msg.encode()?;
        debug!("Relay OUT: {}", json);
        self.outbound
            .send(Message::Text(json.into()))
            .map_err(|_| TransportError::Closed)
    }
}
