//! Echo Server - serves a small contract over a pipe until Ctrl+C.
//!
//! This example demonstrates:
//! - Registering sync, async and record-typed methods with `Service::builder`
//! - Hosting an endpoint on a Unix socket / Windows named pipe
//! - Graceful shutdown through a `CancellationToken`
//!
//! # Running
//!
//! ```text
//! RUST_LOG=wirecall=debug cargo run --example echo_server -- /tmp/echo.sock
//! cargo run --example echo_client -- /tmp/echo.sock hello
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use wirecall::handler::Service;
use wirecall::transport::PipeListener;
use wirecall::{Endpoint, EndpointOptions};

/// Reply of the `Stats` method.
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

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/tmp/wirecall-echo.sock".to_string());

    let service = Arc::new(
        Service::builder("IEchoService")
            .method("Echo", |text: String| async move { Ok(text) })
            .sync_method("Stats", |text: String| {
                Ok(TextStats {
                    chars: text.chars().count() as u32,
                    words: text.split_whitespace().count() as u32,
                })
            })
            .build(),
    );

    let listener = PipeListener::bind(&path).await?;
    let options = EndpointOptions::new()
        .max_concurrent_calls(8)
        .include_failure_details(true);
    let endpoint = Endpoint::new("IEchoService", listener, service, options);

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        token.cancel();
    });

    println!("listening on {}", path);
    endpoint.run(shutdown).await?;
    Ok(())
}
