//! Transport layer abstraction for roomlink
//!
//! A transport owns one socket. It reports what happens on that socket as
//! [`TransportEvent`]s and writes whatever frames it is handed, so the
//! client event loop never touches the network directly.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Notification from a transport to the client event loop
///
/// Events are delivered in arrival order to a single listener.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The socket handshake completed, frames may now be sent
    Opened,

    /// One complete binary frame arrived
    Message(Bytes),

    /// The socket failed; the message is the transport's own description
    Error(String),

    /// The socket is gone and no further events will follow
    Closed,
}

/// Transport layer abstraction for network communication
///
/// # Example: Implementing a custom transport
///
/// ```no_run
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use roomlink_protocol::transport::{Transport, TransportEvent};
/// use tokio::sync::mpsc;
///
/// struct LoopbackTransport;
///
/// #[async_trait]
/// impl Transport for LoopbackTransport {
///     type Error = std::io::Error;
///
///     async fn run(
///         self,
///         events_tx: mpsc::Sender<TransportEvent>,
///         mut outgoing_rx: mpsc::UnboundedReceiver<Bytes>,
///     ) -> Result<(), Self::Error> {
///         let _ = events_tx.send(TransportEvent::Opened).await;
///         while let Some(frame) = outgoing_rx.recv().await {
///             let _ = events_tx.send(TransportEvent::Message(frame)).await;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + 'static {
    /// Error type for this transport
    type Error: std::error::Error + Send + Sync + 'static;

    /// Connects and runs the socket until it closes
    ///
    /// Implementations send [`TransportEvent::Opened`] once the handshake
    /// completes and [`TransportEvent::Message`] for every binary frame
    /// received. Frames arriving on `outgoing_rx` are written as-is. When
    /// `outgoing_rx` is closed the transport closes the socket and returns.
    ///
    /// Connection failures are returned as `Err`; whoever drives the
    /// transport turns that into [`TransportEvent::Error`] followed by
    /// [`TransportEvent::Closed`].
    async fn run(
        self,
        events_tx: mpsc::Sender<TransportEvent>,
        outgoing_rx: mpsc::UnboundedReceiver<Bytes>,
    ) -> Result<(), Self::Error>;
}
