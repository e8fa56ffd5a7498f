use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::domain::errors::Result;
use crate::domain::value_objects::{ClientId, ProducerTarget};

/// Sending half of a client's bounded chunk queue, registered with the
/// producer's fan-out stage.
pub type ChunkSender = mpsc::Sender<Bytes>;

/// Port for the shared upstream media producer.
///
/// One instance exists for the process lifetime. Start/stop is the only
/// mutable control surface; everything else the producer reports arrives as
/// fire-and-forget events on the coordinator channel.
#[async_trait]
pub trait StreamProducer: Send + Sync {
    /// idle -> running
    async fn start(&self) -> Result<()>;

    /// running -> idle
    async fn stop(&self) -> Result<()>;

    /// Pass-through for a transition the producer requested for itself
    async fn apply_requested_state(&self, target: ProducerTarget) -> Result<()>;

    /// Recompute internal buffering after a latency change
    async fn redistribute_latency(&self) -> Result<()>;

    /// Add a sink to the output fan-out; subsequent chunks are pushed to it
    fn register_sink(&self, id: ClientId, sink: ChunkSender);

    /// Remove a sink from the fan-out; returns false if it was not present
    fn unregister_sink(&self, id: ClientId) -> bool;

    fn sink_count(&self) -> usize;
}
