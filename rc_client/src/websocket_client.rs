//! WebSocket relay channel.
//!
//! Opens `<relay_url>?roomID=<room>` and exchanges JSON text frames with
//! the relay. Control and binary frames carry nothing for the protocol and
//! are skipped.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use relay_chess::{
    RoomId,
    errors::RelayError,
    messages::{ClientEvent, RelayEvent},
    relay::{RelayChannel, RelayConnector, Result},
    utils,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{self, Message},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Builds the connection URL for `room_id` on `relay_url`.
#[must_use]
pub fn room_url(relay_url: &str, room_id: &RoomId) -> String {
    let separator = if relay_url.contains('?') { '&' } else { '?' };
    format!(
        "{relay_url}{separator}roomID={}",
        urlencoding::encode(room_id.as_str())
    )
}

/// Opens WebSocket channels to one relay endpoint
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    relay_url: String,
}

impl WebSocketConnector {
    /// Create a new connector for `relay_url`
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
        }
    }

    #[must_use]
    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }
}

#[async_trait]
impl RelayConnector for WebSocketConnector {
    type Channel = WebSocketChannel;

    async fn subscribe(&self, room_id: &RoomId) -> Result<WebSocketChannel> {
        let url = room_url(&self.relay_url, room_id);
        tracing::info!("Connecting to {}", url);
        let (ws, _) = connect_async(url.as_str())
            .await
            .map_err(|e| RelayError::Connect(format!("{url}: {e}")))?;
        Ok(WebSocketChannel { ws, closed: false })
    }
}

/// A room subscription over one WebSocket connection
pub struct WebSocketChannel {
    ws: WsStream,
    closed: bool,
}

impl std::fmt::Debug for WebSocketChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketChannel")
            .field("closed", &self.closed)
            .finish()
    }
}

#[async_trait]
impl RelayChannel for WebSocketChannel {
    async fn publish(&mut self, event: &ClientEvent) -> Result<()> {
        if self.closed {
            return Err(RelayError::Closed);
        }
        let json = utils::encode(event)?;
        self.ws
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))
    }

    async fn next_event(&mut self) -> Result<Option<RelayEvent>> {
        while !self.closed {
            let Some(message) = self.ws.next().await else {
                self.closed = true;
                break;
            };
            match message {
                Ok(Message::Text(text)) => match utils::decode::<RelayEvent>(text.as_str()) {
                    Ok(event) => return Ok(Some(event)),
                    Err(e) => tracing::warn!("Skipping relay frame: {}", e),
                },
                Ok(Message::Close(frame)) => {
                    tracing::info!("Relay closed the connection: {:?}", frame);
                    self.closed = true;
                }
                // Pings are answered by tungstenite itself.
                Ok(_) => {}
                Err(tungstenite::Error::ConnectionClosed) => self.closed = true,
                Err(e) => return Err(RelayError::Transport(e.to_string())),
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.ws.close(None).await {
            Ok(())
            | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Ok(())
            }
            Err(e) => Err(RelayError::Transport(e.to_string())),
        }
    }
}
