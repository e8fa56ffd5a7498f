use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::ports::{MetricsReporter, StreamProducer};
use crate::domain::value_objects::{ClientId, CoordinatorEvent, StreamEvent};

/// Chunks buffered per client before its queue counts as stalled
const CLIENT_QUEUE_DEPTH: usize = 64;

/// Outcome of a removal attempt; `NotFound` is a no-op, not an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    NotFound,
}

struct ClientEntry {
    peer: SocketAddr,
    writer: JoinHandle<()>,
}

/// Concurrency-safe set of live client connections.
///
/// The map and the producer's fan-out membership are mutated inside the same
/// critical section, so the 0->1 and 1->0 occupancy edges are detected
/// atomically with the mutation and handed to the control loop as events.
/// Transport teardown always happens after the lock is released.
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, ClientEntry>>,
    producer: Arc<dyn StreamProducer>,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
    metrics: Arc<dyn MetricsReporter>,
}

impl ClientRegistry {
    pub fn new(
        producer: Arc<dyn StreamProducer>,
        events: mpsc::UnboundedSender<CoordinatorEvent>,
        metrics: Arc<dyn MetricsReporter>,
    ) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            producer,
            events,
            metrics,
        }
    }

    /// Take exclusive ownership of a detached transport and start fanning
    /// media chunks out to it.
    pub fn add<T>(&self, id: ClientId, transport: T, peer: SocketAddr)
    where
        T: AsyncWrite + Unpin + Send + 'static,
    {
        let (chunk_tx, chunk_rx) = mpsc::channel(CLIENT_QUEUE_DEPTH);
        let writer = tokio::spawn(write_loop(id, transport, chunk_rx, self.events.clone()));

        let displaced = {
            let mut clients = self.clients.lock();
            let displaced = clients.insert(id, ClientEntry { peer, writer });
            self.producer.register_sink(id, chunk_tx);
            if displaced.is_none() && clients.len() == 1 {
                let _ = self.events.send(CoordinatorEvent::FirstClientJoined(id));
            }
            displaced
        };

        if let Some(old) = displaced {
            // Should not happen: ids are never reused. Keep the newer
            // connection and tear the stale one down.
            tracing::warn!(%id, peer = %old.peer, "duplicate client id, replacing stale entry");
            old.writer.abort();
            self.metrics.report_client_disconnected();
        }

        self.metrics.report_client_connected();
        tracing::info!(%id, %peer, "client attached");
    }

    /// Close and forget one client. Closing is best-effort; a second call
    /// for the same id is a no-op.
    pub fn remove(&self, id: ClientId) -> Removal {
        let entry = {
            let mut clients = self.clients.lock();
            let entry = clients.remove(&id);
            if entry.is_some() {
                self.producer.unregister_sink(id);
                if clients.is_empty() {
                    let _ = self.events.send(CoordinatorEvent::RegistryEmptied);
                }
            }
            entry
        };

        match entry {
            Some(entry) => {
                entry.writer.abort();
                self.metrics.report_client_disconnected();
                tracing::info!(%id, peer = %entry.peer, "client detached");
                Removal::Removed
            }
            None => Removal::NotFound,
        }
    }

    /// Close and forget every client; used while draining. Emits no
    /// occupancy signal since the control loop drives this path itself.
    pub fn clear(&self) -> usize {
        let drained: Vec<(ClientId, ClientEntry)> = {
            let mut clients = self.clients.lock();
            let drained: Vec<_> = clients.drain().collect();
            for (id, _) in &drained {
                self.producer.unregister_sink(*id);
            }
            drained
        };

        let count = drained.len();
        for (id, entry) in drained {
            entry.writer.abort();
            self.metrics.report_client_disconnected();
            tracing::debug!(%id, "client cleared");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}

/// Drains the client's chunk queue into its transport.
///
/// When every sender is gone (eviction or drain) the remaining chunks are
/// flushed and the socket is shut down, which is how clients learn the
/// stream ended. A write error reports the client gone and exits; the
/// transport closes when it is dropped.
async fn write_loop<T>(
    id: ClientId,
    mut transport: T,
    mut chunks: mpsc::Receiver<Bytes>,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
) where
    T: AsyncWrite + Unpin,
{
    while let Some(chunk) = chunks.recv().await {
        if let Err(e) = transport.write_all(&chunk).await {
            tracing::debug!(%id, error = %e, "write failed, dropping client");
            let _ = events.send(CoordinatorEvent::Producer(StreamEvent::SinkRemoved(id)));
            return;
        }
    }
    let _ = transport.shutdown().await;
}
