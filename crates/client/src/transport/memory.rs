//! In-memory transport for testing and local play
//!
//! This transport uses Tokio channels instead of network sockets. The
//! other end is a [`MemoryPeer`], which plays the part of the server:
//! it receives the client's frames and pushes frames back.

use super::{Transport, TransportEvent};
use async_trait::async_trait;
use bytes::Bytes;
use roomlink_protocol::{codec, FrameResult, Value};
use tokio::sync::mpsc;

/// In-memory client transport that communicates via channels
///
/// # Example
///
/// ```
/// use roomlink_client::transport::memory::MemoryTransport;
///
/// let (transport, peer) = MemoryTransport::create_pair(100);
/// ```
pub struct MemoryTransport {
    /// Frames written by the client, towards the peer
    to_peer: mpsc::Sender<Bytes>,
    /// Frames pushed by the peer, towards the client
    from_peer: mpsc::Receiver<Bytes>,
}

/// Server side of a [`MemoryTransport`]
pub struct MemoryPeer {
    to_client: mpsc::Sender<Bytes>,
    from_client: mpsc::Receiver<Bytes>,
}

impl MemoryTransport {
    pub fn new(to_peer: mpsc::Sender<Bytes>, from_peer: mpsc::Receiver<Bytes>) -> Self {
        Self { to_peer, from_peer }
    }

    /// Creates a transport and the peer it is connected to
    ///
    /// # Arguments
    /// * `buffer_size` - Size of the channel buffers in each direction
    pub fn create_pair(buffer_size: usize) -> (Self, MemoryPeer) {
        let (client_to_peer_tx, client_to_peer_rx) = mpsc::channel(buffer_size);
        let (peer_to_client_tx, peer_to_client_rx) = mpsc::channel(buffer_size);

        let transport = Self::new(client_to_peer_tx, peer_to_client_rx);
        let peer = MemoryPeer {
            to_client: peer_to_client_tx,
            from_client: client_to_peer_rx,
        };

        (transport, peer)
    }
}

impl MemoryPeer {
    /// Pushes raw bytes to the client, as if they came off the socket
    pub async fn send_bytes(&self, bytes: Bytes) -> Result<(), MemoryTransportError> {
        self.to_client
            .send(bytes)
            .await
            .map_err(|_| MemoryTransportError::ChannelClosed)
    }

    /// Encodes `values` as a frame and pushes it to the client
    pub async fn send_frame(&self, values: &[Value]) -> Result<(), MemoryTransportError> {
        let bytes = codec::encode(values).map_err(|e| MemoryTransportError::Codec(e.to_string()))?;
        self.send_bytes(bytes).await
    }

    /// Next raw frame written by the client, `None` once the client closed
    pub async fn recv_bytes(&mut self) -> Option<Bytes> {
        self.from_client.recv().await
    }

    /// Next frame written by the client, decoded
    pub async fn recv_frame(&mut self) -> Option<FrameResult<Vec<Value>>> {
        self.recv_bytes().await.map(|bytes| codec::decode(&bytes))
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    type Error = MemoryTransportError;

    async fn run(
        mut self,
        events_tx: mpsc::Sender<TransportEvent>,
        mut outgoing_rx: mpsc::UnboundedReceiver<Bytes>,
    ) -> Result<(), Self::Error> {
        events_tx
            .send(TransportEvent::Opened)
            .await
            .map_err(|_| MemoryTransportError::ChannelClosed)?;

        loop {
            tokio::select! {
                // Peer → client
                frame = self.from_peer.recv() => {
                    match frame {
                        Some(bytes) => {
                            if events_tx.send(TransportEvent::Message(bytes)).await.is_err() {
                                return Err(MemoryTransportError::ChannelClosed);
                            }
                        }
                        None => return Ok(()),
                    }
                }

                // Client → peer
                frame = outgoing_rx.recv() => {
                    match frame {
                        Some(bytes) => {
                            if self.to_peer.send(bytes).await.is_err() {
                                return Err(MemoryTransportError::ChannelClosed);
                            }
                        }
                        None => return Ok(()),
                    }
                }
            }
        }
    }
}

/// Memory transport errors
#[derive(Debug, thiserror::Error)]
pub enum MemoryTransportError {
    #[error("Transport channel closed")]
    ChannelClosed,

    #[error("Codec error: {0}")]
    Codec(String),
}
