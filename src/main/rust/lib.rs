pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-exports for convenience
pub use application::services::{ClientRegistry, FanoutSet, Removal, StreamCoordinator};
pub use config::Config;
pub use domain::entities::StreamLifecycle;
pub use domain::errors::{DomainError, Result};
pub use domain::ports::{ChunkSender, MetricsReporter, StreamProducer};
pub use domain::value_objects::{
    ClientId, CoordinatorEvent, CoordinatorState, DiagnosticSeverity, ProducerTarget,
    StreamDescriptor, StreamEvent,
};
pub use infrastructure::gstreamer::{GstStreamProducer, PipelineBuilder, STREAM_ELEMENT_NAME};
pub use infrastructure::http::HttpFrontDoor;
pub use infrastructure::metrics::{serve_metrics, PrometheusReporter};
