//! Relay server - websocket chat relay daemon.

mod config;
mod handler;
mod hub;
mod session;

pub use config::ServerConfig;
pub use handler::Server;
pub use hub::Hub;

use std::net::SocketAddr;

use relay_core::RelayResult;

#[tokio::main]
async fn main() -> RelayResult<()> {
    tracing_subscriber::fmt::init();

    let bind_addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string())
        .parse()
        .expect("Invalid bind address");

    let config = ServerConfig::with_addr(bind_addr);
    let server = Server::bind(config).await?;
    server.run().await
}
