//! Websocket connection for the probe client.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use relay_core::{ClientEvent, RelayError, RelayResult};

/// A single websocket connection to the relay server.
pub struct Connection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Connection {
    /// Open a websocket connection. No retries.
    pub async fn connect(url: &str) -> RelayResult<Self> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| RelayError::Transport(format!("Connection failed: {}", e)))?;

        Ok(Self { stream })
    }

    /// Serialize an event and send it as one text frame.
    pub async fn send_event(&mut self, event: &ClientEvent) -> RelayResult<()> {
        let json = serde_json::to_string(event)?;

        self.stream
            .send(Message::Text(json))
            .await
            .map_err(|e| RelayError::Transport(format!("Send error: {}", e)))
    }

    /// Await the next text frame and return its payload verbatim.
    ///
    /// Control frames do not count as a reply; the connection being
    /// closed before a text frame arrives is [`RelayError::ConnectionClosed`].
    pub async fn recv_text(&mut self) -> RelayResult<String> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Close(_))) | None => return Err(RelayError::ConnectionClosed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    return Err(RelayError::Transport(format!("Receive error: {}", e)))
                }
            }
        }
    }

    /// Send a close frame. Call at most once; dropping the connection
    /// afterwards releases the socket.
    pub async fn close(mut self) -> RelayResult<()> {
        self.stream
            .close(None)
            .await
            .map_err(|e| RelayError::Transport(format!("Close error: {}", e)))
    }
}
