//! Frame transport
//!
//! The connection speaks to the gateway through these traits so tests can
//! substitute a scripted transport for the real WebSocket.

mod traits;
mod websocket;

pub use traits::{Connector, TransportSink, TransportStream};
pub use websocket::WsConnector;
