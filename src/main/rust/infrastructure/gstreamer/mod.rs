mod gst_producer;
mod pipeline_builder;

pub use gst_producer::GstStreamProducer;
pub use pipeline_builder::{PipelineBuilder, STREAM_ELEMENT_NAME};
