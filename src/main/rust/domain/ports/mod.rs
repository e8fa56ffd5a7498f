mod metrics_reporter;
mod stream_producer;

pub use metrics_reporter::MetricsReporter;
pub use stream_producer::{ChunkSender, StreamProducer};
