use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::domain::ports::{ChunkSender, MetricsReporter};
use crate::domain::value_objects::{ClientId, CoordinatorEvent, StreamEvent};

/// Producer-facing sink table: every output chunk is pushed to every
/// registered sink.
///
/// `push_chunk` runs on the producer's streaming thread, so pushes never
/// block: a sink whose queue is full or closed counts as a push failure,
/// which evicts that one sink and reports it upward as a `SinkRemoved`
/// event. Delivery to the remaining sinks is unaffected.
pub struct FanoutSet {
    sinks: Mutex<HashMap<ClientId, ChunkSender>>,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
    metrics: Arc<dyn MetricsReporter>,
}

impl FanoutSet {
    pub fn new(
        events: mpsc::UnboundedSender<CoordinatorEvent>,
        metrics: Arc<dyn MetricsReporter>,
    ) -> Self {
        Self {
            sinks: Mutex::new(HashMap::new()),
            events,
            metrics,
        }
    }

    pub fn register(&self, id: ClientId, sink: ChunkSender) {
        self.sinks.lock().insert(id, sink);
    }

    pub fn unregister(&self, id: ClientId) -> bool {
        self.sinks.lock().remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sinks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.lock().is_empty()
    }

    /// Push one chunk to every sink, evicting the ones that fail.
    pub fn push_chunk(&self, chunk: Bytes) {
        let stale = {
            let mut sinks = self.sinks.lock();
            let mut stale = Vec::new();

            for (id, sink) in sinks.iter() {
                match sink.try_send(chunk.clone()) {
                    Ok(()) => self.metrics.report_bytes_sent(chunk.len() as u64),
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!(%id, "client queue stalled, evicting");
                        stale.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        tracing::debug!(%id, "client queue closed, evicting");
                        stale.push(*id);
                    }
                }
            }

            for id in &stale {
                sinks.remove(id);
            }
            stale
        };

        for id in stale {
            self.metrics.report_fanout_drop();
            let _ = self
                .events
                .send(CoordinatorEvent::Producer(StreamEvent::SinkRemoved(id)));
        }
    }
}
