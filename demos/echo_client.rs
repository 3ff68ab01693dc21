//! Echo Client - calls the echo server once per run.
//!
//! ```text
//! cargo run --example echo_client -- /tmp/echo.sock "some text"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use wirecall::transport::PipeConnector;
use wirecall::{Client, ClientOptions, Invocation};

#[derive(Serialize, Deserialize, Debug)]
struct TextStats {
    chars: u32,
    words: u32,
}

wirecall::wire_record!(TextStats, "echo");

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .unwrap_or_else(|| "/tmp/wirecall-echo.sock".to_string());
    let text = args.next().unwrap_or_else(|| "hello".to_string());

    let client = Client::new(
        PipeConnector::new(path),
        ClientOptions::new().connection_timeout(Duration::from_secs(5)),
    );

    let echoed: String = client
        .invoke(Invocation::new("Echo").arg(text.clone()))
        .await?;
    println!("echo: {}", echoed);

    let stats: TextStats = client.invoke(Invocation::new("Stats").arg(text)).await?;
    println!("stats: {:?}", stats);

    Ok(())
}
