//! Transports the client can run over

pub mod memory;
pub mod websocket;

use bytes::Bytes;
pub use roomlink_protocol::transport::{Transport, TransportEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Runs `transport` on its own task
///
/// A failed run is reported as [`TransportEvent::Error`], and
/// [`TransportEvent::Closed`] is always the last event sent, however the
/// transport stopped.
pub fn spawn<T: Transport>(
    transport: T,
    events_tx: mpsc::Sender<TransportEvent>,
    outgoing_rx: mpsc::UnboundedReceiver<Bytes>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let notify = events_tx.clone();

        if let Err(e) = transport.run(events_tx, outgoing_rx).await {
            tracing::error!(error = %e, "Transport stopped with error");
            let _ = notify.send(TransportEvent::Error(e.to_string())).await;
        }

        let _ = notify.send(TransportEvent::Closed).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        type Error = std::io::Error;

        async fn run(
            self,
            _events_tx: mpsc::Sender<TransportEvent>,
            _outgoing_rx: mpsc::UnboundedReceiver<Bytes>,
        ) -> Result<(), Self::Error> {
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"))
        }
    }

    #[tokio::test]
    async fn test_spawn_reports_error_then_closed() {
        let (events_tx, mut events_rx) = mpsc::channel(10);
        let (_outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        spawn(FailingTransport, events_tx, outgoing_rx).await.unwrap();

        assert_eq!(
            events_rx.recv().await,
            Some(TransportEvent::Error("refused".into()))
        );
        assert_eq!(events_rx.recv().await, Some(TransportEvent::Closed));
        assert_eq!(events_rx.recv().await, None);
    }
}
