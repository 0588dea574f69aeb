//! WebSocket transport over tokio-tungstenite

use super::{Connector, TransportSink, TransportStream};
use crate::error::{TransportError, ABNORMAL_CLOSURE};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector that opens real WebSocket connections
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(
        &self,
        url: &str,
    ) -> Result<(Box<dyn TransportSink>, Box<dyn TransportStream>), TransportError> {
        let (socket, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(url = %url, status = %response.status(), "WebSocket connection established");

        let (sink, stream) = socket.split();
        Ok((
            Box::new(WsSink { inner: sink, closed: false }),
            Box::new(WsReceiver { inner: stream }),
        ))
    }
}

struct WsSink {
    inner: SplitSink<WsStream, Message>,
    closed: bool,
}

#[async_trait]
impl TransportSink for WsSink {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::NotConnected);
        }
        self.inner
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if std::mem::replace(&mut self.closed, true) {
            return Ok(());
        }
        self.inner
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

struct WsReceiver {
    inner: SplitStream<WsStream>,
}

#[async_trait]
impl TransportStream for WsReceiver {
    async fn receive(&mut self) -> Result<String, TransportError> {
        while let Some(frame) = self.inner.next().await {
            match frame {
                Ok(Message::Text(text)) => return Ok(text),
                Ok(Message::Close(Some(frame))) => {
                    tracing::debug!(code = %frame.code, reason = %frame.reason, "Gateway closed connection");
                    return Err(TransportError::Closed { code: u16::from(frame.code) });
                }
                Ok(Message::Close(None)) => {
                    return Err(TransportError::Closed { code: u16::from(WsCloseCode::Normal) });
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!("Binary frames not supported, skipping");
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                    tracing::trace!("Control frame received");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "WebSocket error");
                    return Err(TransportError::Closed { code: ABNORMAL_CLOSURE });
                }
            }
        }
        Err(TransportError::Closed { code: ABNORMAL_CLOSURE })
    }
}
