use crate::error::TransportError;
use async_trait::async_trait;

/// Sending half of an open transport
#[async_trait]
pub trait TransportSink: Send {
    /// Send one text frame
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close the transport; closing twice is a no-op
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Receiving half of an open transport
#[async_trait]
pub trait TransportStream: Send + Sync {
    /// Wait for the next text frame
    ///
    /// Returns `TransportError::Closed` with the peer's close code once the
    /// connection ends. A drop without a close frame reports 1006.
    async fn receive(&mut self) -> Result<String, TransportError>;
}

/// Opens transports to a gateway URL
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(
        &self,
        url: &str,
    ) -> Result<(Box<dyn TransportSink>, Box<dyn TransportStream>), TransportError>;
}
