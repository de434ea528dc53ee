//! Websocket accept loop for the relay server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::net::TcpListener;

use relay_core::{RelayError, RelayResult};

use crate::config::ServerConfig;
use crate::hub::Hub;
use crate::session;

/// Relay server.
pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    hub: Arc<Mutex<Hub>>,
    next_id: AtomicUsize,
}

impl Server {
    /// Bind the listener. Sessions are not accepted until [`run`](Self::run).
    pub async fn bind(config: ServerConfig) -> RelayResult<Self> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|e| RelayError::Transport(format!("Failed to bind: {}", e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| RelayError::Transport(format!("No local address: {}", e)))?;

        Ok(Self {
            config,
            listener,
            local_addr,
            hub: Arc::new(Mutex::new(Hub::new())),
            next_id: AtomicUsize::new(0),
        })
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections forever, one session task per client.
    pub async fn run(self) -> RelayResult<()> {
        tracing::info!("relay server listening on {}", self.local_addr);

        loop {
            let (stream, addr) = self
                .listener
                .accept()
                .await
                .map_err(|e| RelayError::Transport(format!("Accept failed: {}", e)))?;

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(id, %addr, "connection accepted");

            let hub = Arc::clone(&self.hub);
            let config = self.config.clone();
            tokio::spawn(async move {
                if let Err(e) = session::run(stream, id, hub, config).await {
                    tracing::error!(id, %addr, "session error: {}", e);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    use relay_core::{ClientEvent, ServerEvent, UserSummary};

    async fn start_server() -> SocketAddr {
        let config = ServerConfig::with_addr("127.0.0.1:0".parse::<SocketAddr>().unwrap());
        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr();
        tokio::spawn(server.run());
        addr
    }

    async fn recv_event(
        ws: &mut tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
    ) -> ServerEvent {
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn assigns_ids_and_serves_roster() {
        let addr = start_server().await;
        let url = format!("ws://{}/chat", addr);

        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        assert_eq!(recv_event(&mut ws).await, ServerEvent::YourId(0));

        let key = ClientEvent::PublicKey("pk0".to_string());
        ws.send(Message::Text(serde_json::to_string(&key).unwrap()))
            .await
            .unwrap();
        assert_eq!(
            recv_event(&mut ws).await,
            ServerEvent::UserIn(UserSummary {
                id: 0,
                key: "pk0".to_string()
            })
        );

        ws.send(Message::Text(
            r#"{"GetUsersIds":{"start":0,"count":5}}"#.to_string(),
        ))
        .await
        .unwrap();
        assert_eq!(
            recv_event(&mut ws).await,
            ServerEvent::Users(vec![UserSummary {
                id: 0,
                key: "pk0".to_string()
            }])
        );
    }

    #[tokio::test]
    async fn relays_between_two_clients() {
        let addr = start_server().await;
        let url = format!("ws://{}/chat", addr);

        let (mut alice, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        let (mut bob, _) = tokio_tungstenite::connect_async(&url).await.unwrap();

        let alice_id = match recv_event(&mut alice).await {
            ServerEvent::YourId(id) => id,
            other => panic!("expected YourId, got {:?}", other),
        };
        let bob_id = match recv_event(&mut bob).await {
            ServerEvent::YourId(id) => id,
            other => panic!("expected YourId, got {:?}", other),
        };

        let event = ClientEvent::Message {
            to: bob_id,
            message: "hello".to_string(),
            random_id: 1,
        };
        alice
            .send(Message::Text(serde_json::to_string(&event).unwrap()))
            .await
            .unwrap();

        assert_eq!(
            recv_event(&mut bob).await,
            ServerEvent::Message {
                from: alice_id,
                message: "hello".to_string(),
                random_id: 1
            }
        );
        assert_eq!(
            recv_event(&mut alice).await,
            ServerEvent::MessageStatus {
                random_id: 1,
                delivered: true
            }
        );
    }

    #[tokio::test]
    async fn echoes_binary_frames() {
        let addr = start_server().await;
        let url = format!("ws://{}/chat", addr);

        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        assert_eq!(recv_event(&mut ws).await, ServerEvent::YourId(0));

        ws.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
        loop {
            match ws.next().await.unwrap().unwrap() {
                Message::Binary(data) => {
                    assert_eq!(data, vec![1, 2, 3]);
                    break;
                }
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn evicts_client_that_never_pongs() {
        let mut config = ServerConfig::with_addr("127.0.0.1:0".parse::<SocketAddr>().unwrap());
        config.heartbeat_interval = Duration::from_millis(20);
        config.client_timeout = Duration::from_millis(50);

        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr();
        tokio::spawn(server.run());

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/chat", addr))
            .await
            .unwrap();

        // Pings are only answered while the stream is being read, so
        // staying idle past the timeout leaves them unanswered.
        tokio::time::sleep(Duration::from_millis(200)).await;

        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "server kept the silent session open");
    }

    #[tokio::test]
    async fn rejects_unknown_path() {
        let addr = start_server().await;
        let result = tokio_tungstenite::connect_async(format!("ws://{}/nope", addr)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn malformed_event_keeps_session_alive() {
        let addr = start_server().await;
        let url = format!("ws://{}/chat", addr);

        let (mut ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        assert_eq!(recv_event(&mut ws).await, ServerEvent::YourId(0));

        ws.send(Message::Text("not json".to_string())).await.unwrap();
        ws.send(Message::Text(
            r#"{"GetUsersIds":{"start":0,"count":5}}"#.to_string(),
        ))
        .await
        .unwrap();
        assert_eq!(recv_event(&mut ws).await, ServerEvent::Users(vec![]));
    }
}
