//! Per-connection session task.

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::{interval, Instant};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::Message;

use relay_core::{ClientEvent, RelayError, RelayResult, CHAT_PATH};

use crate::config::ServerConfig;
use crate::hub::Hub;

/// Drive one client connection: upgrade the socket, register with the
/// hub, then pump frames until the client leaves or times out.
pub async fn run(
    stream: TcpStream,
    id: usize,
    hub: Arc<Mutex<Hub>>,
    config: ServerConfig,
) -> RelayResult<()> {
    let check_path = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        if req.uri().path() == CHAT_PATH {
            Ok(resp)
        } else {
            tracing::warn!(path = %req.uri().path(), "rejected upgrade on unknown path");
            let mut resp = ErrorResponse::new(Some("not found".to_string()));
            *resp.status_mut() = StatusCode::NOT_FOUND;
            Err(resp)
        }
    };

    let mut ws = tokio_tungstenite::accept_hdr_async(stream, check_path)
        .await
        .map_err(|e| RelayError::Transport(format!("Handshake failed: {}", e)))?;

    let (tx, mut rx) = unbounded_channel();
    hub.lock().unwrap().connect(id, tx);

    let mut heartbeat = interval(config.heartbeat_interval);
    heartbeat.tick().await; // first tick fires immediately
    let mut last_ping = Instant::now();

    let result = loop {
        tokio::select! {
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    // Unparseable events are dropped, the session lives on.
                    match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => hub.lock().unwrap().handle_event(id, event),
                        Err(e) => tracing::warn!(id, %e, "ignoring malformed event"),
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    if let Err(e) = ws.send(Message::Binary(data)).await {
                        break Err(RelayError::Transport(format!("Send error: {}", e)));
                    }
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    last_ping = Instant::now();
                }
                Some(Ok(Message::Close(_))) | None => break Ok(()),
                Some(Ok(Message::Frame(_))) => break Ok(()),
                Some(Err(e)) => break Err(RelayError::Transport(format!("Receive error: {}", e))),
            },

            event = rx.recv() => match event {
                Some(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => break Err(RelayError::Serialization(e)),
                    };
                    if let Err(e) = ws.send(Message::Text(json)).await {
                        break Err(RelayError::Transport(format!("Send error: {}", e)));
                    }
                }
                None => break Ok(()),
            },

            _ = heartbeat.tick() => {
                if last_ping.elapsed() > config.client_timeout {
                    tracing::info!(id, "client timed out");
                    break Ok(());
                }
                if let Err(e) = ws.send(Message::Ping(Vec::new())).await {
                    break Err(RelayError::Transport(format!("Ping error: {}", e)));
                }
            }
        }
    };

    hub.lock().unwrap().disconnect(id);
    let _ = ws.close(None).await;
    result
}
