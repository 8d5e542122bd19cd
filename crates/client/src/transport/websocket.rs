use super::{Transport, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// WebSocket transport that connects to a room server
pub struct WebSocketClient {
    url: String,
}

impl WebSocketClient {
    /// Creates a new WebSocket client for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Transport for WebSocketClient {
    type Error = WebSocketClientError;

    async fn run(
        self,
        events_tx: mpsc::Sender<TransportEvent>,
        mut outgoing_rx: mpsc::UnboundedReceiver<Bytes>,
    ) -> Result<(), Self::Error> {
        tracing::info!(url = %self.url, "Connecting to WebSocket server");

        let (ws_stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| WebSocketClientError::ConnectionError(e.to_string()))?;

        tracing::info!(url = %self.url, "WebSocket connection established");

        events_tx
            .send(TransportEvent::Opened)
            .await
            .map_err(|e| WebSocketClientError::ChannelError(e.to_string()))?;

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    match msg {
                        Some(Ok(Message::Binary(data))) => {
                            if let Err(e) = events_tx.send(TransportEvent::Message(Bytes::from(data))).await {
                                tracing::error!(error = %e, "Failed to hand frame to event loop");
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Server closed connection");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Text, ping and pong frames carry no protocol data
                        }
                        Some(Err(e)) => {
                            return Err(WebSocketClientError::WebSocketError(e.to_string()));
                        }
                        None => {
                            tracing::info!("Connection closed");
                            break;
                        }
                    }
                }

                frame = outgoing_rx.recv() => {
                    match frame {
                        Some(bytes) => {
                            ws_sender
                                .send(Message::Binary(bytes.to_vec()))
                                .await
                                .map_err(|e| WebSocketClientError::WebSocketError(e.to_string()))?;
                        }
                        None => {
                            tracing::debug!("Close requested, closing WebSocket");
                            let _ = ws_sender.send(Message::Close(None)).await;
                            let _ = ws_sender.close().await;
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// WebSocket client errors
#[derive(Debug, thiserror::Error)]
pub enum WebSocketClientError {
    #[error("Failed to connect: {0}")]
    ConnectionError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}
