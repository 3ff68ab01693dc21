//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wirecall::handler::{InterfaceBuilder, Service, TypeRegistry};
use wirecall::transport::{memory_transport, BoxStream, MemoryConnector};
use wirecall::{Endpoint, EndpointOptions, TypeRef};

pub const CONTRACT: &str = "ISampleService";

pub const THROWN_MESSAGE: &str = "This is a test exception";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Blue,
}

wirecall::wire_enum!(Color, "paint", { Red = 0, Green = 1, Blue = 2 });

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

wirecall::wire_record!(Point, "geometry");

/// A record whose serialization always fails.
#[derive(Debug, Deserialize)]
pub struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("refusing to serialize"))
    }
}

wirecall::wire_record!(Unserializable, "tests");

/// Counts concurrently running `Slow` calls.
#[derive(Debug, Default)]
pub struct Tracker {
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub started: AtomicUsize,
    pub completed: AtomicUsize,
}

impl Tracker {
    fn enter(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
}

/// The service every integration test talks to.
pub fn sample_service(tracker: Arc<Tracker>) -> Service {
    Service::builder(CONTRACT)
        .method("StringType", |value: String| async move {
            Ok(format!("{}-reply", value))
        })
        .sync_method("ReturnVoid", || Ok(()))
        .sync_method("Add", |a: i32, b: i32| Ok(a + b))
        .sync_method("Add", |a: f64, b: f64| Ok(a + b))
        .sync_method("Reciprocal", |value: f64| Ok(1.0 / value))
        .method("AsyncMethod", |value: i64| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(value * 2)
        })
        .method("ThrowException", || async move {
            Err::<String, _>(anyhow::anyhow!("inner cause").context(THROWN_MESSAGE))
        })
        .sync_method("UnserializableOutput", || Ok(Unserializable))
        .sync_method("EnumType", |color: Color| Ok(color))
        .sync_method("Translate", |p: Point, dx: i32| Ok(Point { x: p.x + dx, y: p.y }))
        .sync_method("Optional", |value: Option<String>| {
            Ok(value.map(|v| v.len() as u32))
        })
        .generic_method(
            "GenericEcho",
            vec![TypeRef::Generic(0)],
            vec![TypeRef::I32],
            |value: i32| async move { Ok(value) },
        )
        .generic_method(
            "GenericEcho",
            vec![TypeRef::Generic(0)],
            vec![TypeRef::String],
            |value: String| async move { Ok(format!("generic:{}", value)) },
        )
        .method("Slow", move |millis: u64| {
            let tracker = Arc::clone(&tracker);
            async move {
                tracker.enter();
                tokio::time::sleep(Duration::from_millis(millis)).await;
                tracker.exit();
                Ok(())
            }
        })
        .interface(
            InterfaceBuilder::new("IDiagnostics").sync_method("Ping", || Ok("pong".to_string())),
        )
        .build()
}

/// Types clients may name when using by-name resolution.
pub fn type_registry() -> TypeRegistry {
    TypeRegistry::new().with_type::<Color>().with_type::<Point>()
}

/// A running in-memory server.
pub struct TestServer {
    pub connector: MemoryConnector,
    pub shutdown: CancellationToken,
    pub tracker: Arc<Tracker>,
    pub task: JoinHandle<wirecall::error::Result<()>>,
}

impl TestServer {
    pub fn start(options: EndpointOptions) -> Self {
        let tracker = Arc::new(Tracker::default());
        let (listener, connector) = memory_transport(64);
        let service = Arc::new(sample_service(Arc::clone(&tracker)));
        let endpoint = Endpoint::new(CONTRACT, listener, service, options);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(endpoint.run(shutdown.clone()));
        Self {
            connector,
            shutdown,
            tracker,
            task,
        }
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        self.task.await.unwrap().unwrap();
    }
}

/// XORs every byte in both directions. Stateless, so it survives partial
/// reads and writes.
pub struct XorStream {
    inner: BoxStream,
    key: u8,
}

impl XorStream {
    pub fn new(inner: BoxStream, key: u8) -> Self {
        Self { inner, key }
    }
}

impl AsyncRead for XorStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let key = self.key;
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            for byte in &mut buf.filled_mut()[before..] {
                *byte ^= key;
            }
        }
        poll
    }
}

impl AsyncWrite for XorStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let masked: Vec<u8> = buf.iter().map(|b| b ^ self.key).collect();
        Pin::new(&mut self.inner).poll_write(cx, &masked)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Stream transform wrapping every stream in an [`XorStream`].
pub fn xor_transform(key: u8) -> impl Fn(BoxStream) -> BoxStream + Send + Sync + 'static {
    move |stream: BoxStream| -> BoxStream { Box::new(XorStream::new(stream, key)) }
}
