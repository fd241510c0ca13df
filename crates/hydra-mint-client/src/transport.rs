/*!
# Message Transports

The Head session speaks text frames over a bidirectional channel. The
[`Transport`] trait is that channel; [`Connector`] opens one. Production
code uses the WebSocket pair, tests use the in-memory channel pair.
*/

use crate::errors::{ClientError, ClientResult};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::sync::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    tungstenite::{self, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

/// A connected, bidirectional text channel
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> ClientResult<()>;

    /// Next text frame, or `None` once the remote end has closed
    async fn recv_text(&mut self) -> ClientResult<Option<String>>;

    async fn close(&mut self) -> ClientResult<()>;
}

/// Opens transports to a URL
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> ClientResult<Box<dyn Transport>>;
}

// ================================================================================================
// WebSocket
// ================================================================================================

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> ClientResult<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(map_ws_error)
    }

    async fn recv_text(&mut self) -> ClientResult<Option<String>> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Text(text)) => return Ok(Some(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => debug!("Dropping non-UTF-8 binary frame"),
                },
                Ok(Message::Close(_)) => return Ok(None),
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(None)
                }
                Err(e) => return Err(ClientError::Transport(e.to_string())),
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> ClientResult<()> {
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(ClientError::Transport(e.to_string())),
        }
    }
}

fn map_ws_error(error: tungstenite::Error) -> ClientError {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            ClientError::TransportClosed
        }
        other => ClientError::Transport(other.to_string()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> ClientResult<Box<dyn Transport>> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ClientError::Connection(format!("{url}: {e}")))?;
        Ok(Box::new(WsTransport { stream }))
    }
}

// ================================================================================================
// In-memory channel
// ================================================================================================

/// Client side of an in-memory transport
pub struct ChannelTransport {
    outgoing: mpsc::UnboundedSender<String>,
    incoming: mpsc::UnboundedReceiver<String>,
}

/// Remote side of an in-memory transport, playing the node
pub struct ChannelPeer {
    commands: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    pub fn pair() -> (ChannelTransport, ChannelPeer) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            ChannelTransport {
                outgoing: command_tx,
                incoming: event_rx,
            },
            ChannelPeer {
                commands: command_rx,
                events: event_tx,
            },
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send_text(&mut self, text: String) -> ClientResult<()> {
        self.outgoing
            .send(text)
            .map_err(|_| ClientError::TransportClosed)
    }

    async fn recv_text(&mut self) -> ClientResult<Option<String>> {
        Ok(self.incoming.recv().await)
    }

    async fn close(&mut self) -> ClientResult<()> {
        self.incoming.close();
        Ok(())
    }
}

impl ChannelPeer {
    /// Push one event; false once the client side is gone
    pub fn push_event(&self, event: serde_json::Value) -> bool {
        self.events.send(event.to_string()).is_ok()
    }

    /// Push a raw text frame
    pub fn push_raw(&self, text: impl Into<String>) -> bool {
        self.events.send(text.into()).is_ok()
    }

    /// Next command sent by the client, `None` once the client side is gone
    pub async fn next_command(&mut self) -> Option<serde_json::Value> {
        let text = self.commands.recv().await?;
        Some(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }

    /// Command already sent by the client, without waiting
    pub fn try_next_command(&mut self) -> Option<serde_json::Value> {
        let text = self.commands.try_recv().ok()?;
        Some(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }
}

/// Hands out pre-built channel transports, one per `connect`
#[derive(Default)]
pub struct ChannelConnector {
    transports: Mutex<Vec<ChannelTransport>>,
}

impl ChannelConnector {
    /// Transports are handed out in the given order
    pub fn new(transports: Vec<ChannelTransport>) -> Self {
        Self {
            transports: Mutex::new(transports.into_iter().rev().collect()),
        }
    }

    /// A connector with exactly one transport, plus its peer
    pub fn single() -> (ChannelConnector, ChannelPeer) {
        let (transport, peer) = ChannelTransport::pair();
        (ChannelConnector::new(vec![transport]), peer)
    }
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self, url: &str) -> ClientResult<Box<dyn Transport>> {
        let next = self
            .transports
            .lock()
            .map_err(|_| ClientError::Connection("connector state poisoned".to_string()))?
            .pop();
        match next {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(ClientError::Connection(format!("{url}: connection refused"))),
        }
    }
}
