use std::sync::Arc;

use gstreamer::prelude::*;
use tokio::sync::mpsc;

use pipeline_http::{
    ClientId, CoordinatorState, DomainError, FanoutSet, GstStreamProducer, MetricsReporter,
    PipelineBuilder, StreamDescriptor, StreamProducer,
};

struct NullMetrics;

impl MetricsReporter for NullMetrics {
    fn report_client_connected(&self) {}
    fn report_client_disconnected(&self) {}
    fn report_bytes_sent(&self, _bytes: u64) {}
    fn report_fanout_drop(&self) {}
    fn report_state_change(&self, _state: &CoordinatorState) {}
}

fn descriptor(tokens: &[&str]) -> StreamDescriptor {
    StreamDescriptor::new(
        "application/octet-stream".to_string(),
        tokens.iter().map(|t| t.to_string()).collect(),
    )
    .unwrap()
}

#[test]
fn test_rejects_descriptor_without_stream_element() {
    gstreamer::init().unwrap();

    let result = PipelineBuilder::build_source_bin(&descriptor(&["fakesrc", "!", "fakesink"]));
    assert!(matches!(result, Err(DomainError::MissingStreamElement)));
}

#[test]
fn test_rejects_descriptor_with_linked_src_pad() {
    gstreamer::init().unwrap();

    let result = PipelineBuilder::build_source_bin(&descriptor(&[
        "fakesrc",
        "name=stream",
        "!",
        "fakesink",
    ]));
    assert!(matches!(result, Err(DomainError::SourcePadLinked)));
}

#[test]
fn test_rejects_unparseable_descriptor() {
    gstreamer::init().unwrap();

    let result =
        PipelineBuilder::build_source_bin(&descriptor(&["no-such-element-anywhere-xyz"]));
    assert!(matches!(result, Err(DomainError::DescriptorParse(_))));
}

#[test]
fn test_builds_bin_with_ghosted_output() {
    gstreamer::init().unwrap();

    let bin =
        PipelineBuilder::build_source_bin(&descriptor(&["(", "fakesrc", "name=stream", ")"]))
            .unwrap();

    let srcpad = bin.static_pad("src").expect("ghosted src pad");
    assert!(!srcpad.is_linked());
}

#[tokio::test]
async fn test_producer_construction_and_state_changes() {
    gstreamer::init().unwrap();

    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let fanout = Arc::new(FanoutSet::new(events_tx.clone(), Arc::new(NullMetrics)));

    let producer = GstStreamProducer::new(
        &descriptor(&["(", "fakesrc", "name=stream", ")"]),
        events_tx,
        fanout,
    )
    .expect("construction reaches ready state");

    assert_eq!(producer.sink_count(), 0);

    let (chunk_tx, _chunk_rx) = mpsc::channel(4);
    producer.register_sink(ClientId::new(1), chunk_tx);
    assert_eq!(producer.sink_count(), 1);
    assert!(producer.unregister_sink(ClientId::new(1)));
    assert!(!producer.unregister_sink(ClientId::new(1)));

    producer.start().await.expect("pipeline starts");
    producer.stop().await.expect("pipeline stops");
}

#[tokio::test]
async fn test_construction_failure_propagates_from_producer() {
    gstreamer::init().unwrap();

    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    let fanout = Arc::new(FanoutSet::new(events_tx.clone(), Arc::new(NullMetrics)));

    let result = GstStreamProducer::new(
        &descriptor(&["fakesrc", "!", "fakesink"]),
        events_tx,
        fanout,
    );
    assert!(matches!(result, Err(DomainError::MissingStreamElement)));
}
