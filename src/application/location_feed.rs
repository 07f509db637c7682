// Port for the live location topic
use crate::application::error::ApiResult;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

#[async_trait]
pub trait LocationFeed: Send + Sync {
    /// Connect and subscribe to `topic`. Resolves once the subscription is acknowledged.
    async fn subscribe(&self, topic: &str) -> ApiResult<Subscription>;
}

/// Raw message bodies of one topic subscription, in arrival order.
///
/// The channel ends when the remote side goes away. Dropping the subscription
/// closes it.
#[derive(Debug)]
pub struct Subscription {
    messages: mpsc::Receiver<String>,
    close: Option<oneshot::Sender<()>>,
}

impl Subscription {
    pub fn new(messages: mpsc::Receiver<String>, close: oneshot::Sender<()>) -> Self {
        Self {
            messages,
            close: Some(close),
        }
    }

    pub async fn recv(&mut self) -> Option<String> {
        self.messages.recv().await
    }

    /// Ask the transport to unsubscribe and stop delivering. Anything still
    /// buffered is discarded.
    pub fn close(&mut self) {
        if let Some(close) = self.close.take() {
            let _ = close.send(());
        }
        self.messages.close();
        while self.messages.try_recv().is_ok() {}
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
