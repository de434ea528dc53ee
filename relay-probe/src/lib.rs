//! Probe client for the relay chat server.
//!
//! A probe is a one-shot diagnostic client: it opens one websocket
//! connection, sends one request, hands back the single reply
//! verbatim, and releases the connection. No retries, no timeouts,
//! no reply parsing.
//!
//! # Example
//!
//! ```no_run
//! use relay_probe::ProbeClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut probe = ProbeClient::connect(relay_probe::DEFAULT_URL).await?;
//!     let reply = probe.fetch_user_ids(0, 5).await?;
//!     println!("{}", reply);
//!     probe.close().await?;
//!     Ok(())
//! }
//! ```

mod connection;

pub use connection::Connection;

use relay_core::{ClientEvent, RelayResult};

/// Endpoint of a locally running relay server.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:8080/chat";

/// One-shot probe client.
pub struct ProbeClient {
    connection: Connection,
}

impl ProbeClient {
    /// Connect to a relay server.
    pub async fn connect(url: &str) -> RelayResult<Self> {
        let connection = Connection::connect(url).await?;
        Ok(Self { connection })
    }

    /// Request a page of the user roster and return the raw reply.
    ///
    /// The reply is whatever text the peer sends first; it is not
    /// parsed or validated.
    pub async fn fetch_user_ids(&mut self, start: usize, count: usize) -> RelayResult<String> {
        self.connection
            .send_event(&ClientEvent::GetUsersIds { start, count })
            .await?;
        self.connection.recv_text().await
    }

    /// Close the connection.
    pub async fn close(self) -> RelayResult<()> {
        self.connection.close().await
    }
}
