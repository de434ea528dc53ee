//! One-shot probe against a locally running relay server.
//!
//! Connects to `ws://127.0.0.1:8080/chat`, requests the first five
//! user ids, prints the raw reply to stdout and exits. Any failure
//! terminates the process with a non-zero status.

use relay_probe::{ProbeClient, DEFAULT_URL};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("connecting to {}", DEFAULT_URL);
    let mut probe = ProbeClient::connect(DEFAULT_URL).await?;

    let reply = probe.fetch_user_ids(0, 5).await?;
    println!("{}", reply);

    probe.close().await?;
    Ok(())
}
