// Location topic over STOMP on a WebSocket
use crate::application::error::{ApiError, ApiResult};
use crate::application::location_feed::{LocationFeed, Subscription};
use crate::infrastructure::stomp::{Command, Frame};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const SUBSCRIPTION_ID: &str = "sub-0";
const BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct StompWebSocketFeed {
    url: String,
    host: String,
}

impl StompWebSocketFeed {
    pub fn new(url: String) -> Self {
        let host = url
            .split("://")
            .nth(1)
            .and_then(|rest| rest.split(['/', ':']).next())
            .unwrap_or("localhost")
            .to_string();
        Self { url, host }
    }
}

#[async_trait]
impl LocationFeed for StompWebSocketFeed {
    async fn subscribe(&self, topic: &str) -> ApiResult<Subscription> {
        tracing::info!("Connecting to {}", self.url);
        let (socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let (mut sink, mut stream) = socket.split();

        send(&mut sink, Frame::connect(&self.host)).await?;
        await_connected(&mut stream).await?;
        send(&mut sink, Frame::subscribe(SUBSCRIPTION_ID, topic)).await?;
        tracing::info!("Subscribed to {}", topic);

        let (tx, rx) = mpsc::channel(BUFFER);
        let (close_tx, close_rx) = oneshot::channel();
        tokio::spawn(pump(sink, stream, tx, close_rx));

        Ok(Subscription::new(rx, close_tx))
    }
}

async fn send(sink: &mut SplitSink<Socket, Message>, frame: Frame) -> ApiResult<()> {
    sink.send(Message::Text(frame.encode()))
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))
}

async fn await_connected(stream: &mut SplitStream<Socket>) -> ApiResult<()> {
    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => return Err(ApiError::Transport(e.to_string())),
        };
        match Frame::decode(&text) {
            Ok(Some(frame)) if frame.command == Command::Connected => return Ok(()),
            Ok(Some(frame)) if frame.command == Command::Error => {
                let message = frame.header("message").unwrap_or("STOMP error").to_string();
                return Err(ApiError::Transport(message));
            }
            Ok(_) => continue,
            Err(e) => return Err(ApiError::Transport(e.to_string())),
        }
    }
    Err(ApiError::StreamDisconnected(
        "connection closed before the broker accepted it".to_string(),
    ))
}

/// Forward MESSAGE bodies until the remote side goes away or the subscription is closed.
/// Ending the task drops `tx`, which ends the subscription.
async fn pump(
    mut sink: SplitSink<Socket, Message>,
    mut stream: SplitStream<Socket>,
    tx: mpsc::Sender<String>,
    mut close_rx: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut close_rx => {
                let _ = send(&mut sink, Frame::unsubscribe(SUBSCRIPTION_ID)).await;
                let _ = send(&mut sink, Frame::disconnect()).await;
                let _ = sink.close().await;
                tracing::debug!("Location subscription closed");
                return;
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => match Frame::decode(&text) {
                    Ok(Some(frame)) if frame.command == Command::Message => {
                        if frame.header("subscription") != Some(SUBSCRIPTION_ID) {
                            continue;
                        }
                        if tx.send(frame.body).await.is_err() {
                            return;
                        }
                    }
                    Ok(Some(frame)) if frame.command == Command::Error => {
                        tracing::warn!(
                            "Broker reported an error: {}",
                            frame.header("message").unwrap_or(&frame.body)
                        );
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Dropping undecodable frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Location topic connection closed by peer");
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("Location topic connection failed: {}", e);
                    return;
                }
            }
        }
    }
}
