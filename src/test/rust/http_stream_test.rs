use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use pipeline_http::{
    ChunkSender, ClientId, ClientRegistry, CoordinatorEvent, CoordinatorState, FanoutSet,
    HttpFrontDoor, MetricsReporter, ProducerTarget, Result as DomainResult, StreamProducer,
};

struct NullMetrics;

impl MetricsReporter for NullMetrics {
    fn report_client_connected(&self) {}
    fn report_client_disconnected(&self) {}
    fn report_bytes_sent(&self, _bytes: u64) {}
    fn report_fanout_drop(&self) {}
    fn report_state_change(&self, _state: &CoordinatorState) {}
}

/// Producer double backed by the real fan-out stage
struct CountingProducer {
    fanout: Arc<FanoutSet>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    sinks: Mutex<HashMap<ClientId, ChunkSender>>,
}

impl CountingProducer {
    fn new(fanout: Arc<FanoutSet>) -> Self {
        Self {
            fanout,
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            sinks: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl StreamProducer for CountingProducer {
    async fn start(&self) -> DomainResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> DomainResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn apply_requested_state(&self, _target: ProducerTarget) -> DomainResult<()> {
        Ok(())
    }

    async fn redistribute_latency(&self) -> DomainResult<()> {
        Ok(())
    }

    fn register_sink(&self, id: ClientId, sink: ChunkSender) {
        self.sinks.lock().insert(id, sink.clone());
        self.fanout.register(id, sink);
    }

    fn unregister_sink(&self, id: ClientId) -> bool {
        self.sinks.lock().remove(&id);
        self.fanout.unregister(id)
    }

    fn sink_count(&self) -> usize {
        self.fanout.len()
    }
}

struct Stack {
    registry: Arc<ClientRegistry>,
    fanout: Arc<FanoutSet>,
    addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    server: tokio::task::JoinHandle<()>,
}

impl Stack {
    async fn start(content_type: &str) -> (Self, mpsc::UnboundedReceiver<CoordinatorEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let metrics = Arc::new(NullMetrics);
        let fanout = Arc::new(FanoutSet::new(events_tx.clone(), metrics.clone()));
        let producer = Arc::new(CountingProducer::new(fanout.clone()));
        let registry = Arc::new(ClientRegistry::new(producer, events_tx, metrics));

        let front_door = HttpFrontDoor::bind(0, content_type.to_string(), registry.clone())
            .await
            .expect("bind on an ephemeral port");
        let addr = front_door.local_addr().expect("listener has an address");

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            front_door
                .run_until(async {
                    let _ = stop_rx.await;
                })
                .await;
        });

        (
            Self {
                registry,
                fanout,
                addr,
                stop: Some(stop_tx),
                server,
            },
            events_rx,
        )
    }

    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = self.server.await;
    }
}

async fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

/// Read from the socket until the header/body separator, returning
/// (head, leftover body bytes).
async fn read_response_head(client: &mut TcpStream) -> (String, Vec<u8>) {
    let mut collected = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        let n = timeout(Duration::from_secs(2), client.read(&mut chunk))
            .await
            .expect("response head in time")
            .expect("readable socket");
        assert!(n > 0, "connection closed before response head");
        collected.extend_from_slice(&chunk[..n]);
        if let Some(pos) = collected.windows(4).position(|w| w == b"\r\n\r\n") {
            let body = collected.split_off(pos + 4);
            return (String::from_utf8(collected).expect("ASCII head"), body);
        }
    }
}

async fn read_exact_bytes(client: &mut TcpStream, mut pending: Vec<u8>, total: usize) -> Vec<u8> {
    let mut chunk = [0u8; 256];
    while pending.len() < total {
        let n = timeout(Duration::from_secs(2), client.read(&mut chunk))
            .await
            .expect("body bytes in time")
            .expect("readable socket");
        assert!(n > 0, "connection closed mid-body");
        pending.extend_from_slice(&chunk[..n]);
    }
    pending
}

#[tokio::test]
async fn test_serves_http_10_headers_then_streams_until_close() {
    let (stack, _events) = Stack::start("video/webm").await;

    let mut client = TcpStream::connect(stack.addr).await.unwrap();
    client
        .write_all(b"GET / HTTP/1.0\r\nHost: test\r\n\r\n")
        .await
        .unwrap();

    let registry = stack.registry.clone();
    wait_until("client registration", || registry.len() == 1).await;

    let (head, body) = read_response_head(&mut client).await;
    assert!(head.starts_with("HTTP/1.0 200 OK\r\n"), "head was: {head}");
    assert!(head.contains("Content-Type: video/webm\r\n"));
    assert!(head.contains("Connection: close\r\n"));
    assert!(!head.contains("Content-Length"));
    assert!(!head.contains("Transfer-Encoding"));

    // Media bytes flow as-is after the headers
    stack.fanout.push_chunk(Bytes::from_static(b"hello "));
    stack.fanout.push_chunk(Bytes::from_static(b"world"));
    let body = read_exact_bytes(&mut client, body, 11).await;
    assert_eq!(&body, b"hello world");

    // Removal ends the body by closing the transport
    stack.registry.clear();
    let mut tail = [0u8; 16];
    let eof = timeout(Duration::from_secs(2), client.read(&mut tail))
        .await
        .expect("close in time");
    assert!(matches!(eof, Ok(0) | Err(_)), "expected EOF, got {eof:?}");

    stack.shutdown().await;
}

#[tokio::test]
async fn test_every_connected_client_receives_the_fan_out() {
    let (stack, _events) = Stack::start("application/ogg").await;

    let mut first = TcpStream::connect(stack.addr).await.unwrap();
    first.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();
    let registry = stack.registry.clone();
    wait_until("first client", || registry.len() == 1).await;

    let mut second = TcpStream::connect(stack.addr).await.unwrap();
    second.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();
    wait_until("second client", || registry.len() == 2).await;

    let (_, body1) = read_response_head(&mut first).await;
    let (_, body2) = read_response_head(&mut second).await;

    stack.fanout.push_chunk(Bytes::from_static(b"chunk"));

    assert_eq!(&read_exact_bytes(&mut first, body1, 5).await, b"chunk");
    assert_eq!(&read_exact_bytes(&mut second, body2, 5).await, b"chunk");

    stack.shutdown().await;
}

#[tokio::test]
async fn test_first_connection_signals_the_control_loop() {
    let (stack, mut events) = Stack::start("video/webm").await;

    let mut client = TcpStream::connect(stack.addr).await.unwrap();
    client.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();

    let event = timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("signal in time")
        .expect("channel open");
    assert!(matches!(event, CoordinatorEvent::FirstClientJoined(_)));

    stack.shutdown().await;
}

#[tokio::test]
async fn test_malformed_request_is_dropped_without_registration() {
    let (stack, _events) = Stack::start("video/webm").await;

    let mut client = TcpStream::connect(stack.addr).await.unwrap();
    client.write_all(b"not an http request\r\n\r\n").await.unwrap();

    // The connection is closed with no response and no registration
    let mut buf = [0u8; 64];
    let read = timeout(Duration::from_secs(2), client.read(&mut buf))
        .await
        .expect("close in time");
    assert!(matches!(read, Ok(0) | Err(_)), "expected drop, got {read:?}");
    assert_eq!(stack.registry.len(), 0);

    // The front door keeps serving well-formed requests afterwards
    let mut ok_client = TcpStream::connect(stack.addr).await.unwrap();
    ok_client.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();
    let registry = stack.registry.clone();
    wait_until("well-formed client", || registry.len() == 1).await;

    stack.shutdown().await;
}
