use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use bytes::Bytes;
use gstreamer::prelude::*;
use tokio::sync::mpsc;

use super::pipeline_builder::PipelineBuilder;
use crate::application::services::FanoutSet;
use crate::domain::errors::{DomainError, Result};
use crate::domain::ports::{ChunkSender, StreamProducer};
use crate::domain::value_objects::{
    ClientId, CoordinatorEvent, DiagnosticSeverity, ProducerTarget, StreamDescriptor, StreamEvent,
};

/// Timeout for bus polling (100ms allows responsive shutdown)
const BUS_POLL_TIMEOUT_MS: u64 = 100;

/// Samples buffered inside the sink before the pipeline throttles
const APPSINK_MAX_BUFFERS: u32 = 32;

/// The one shared GStreamer pipeline behind the `StreamProducer` port.
///
/// Construction parses the descriptor, wires its ghosted src pad into an
/// appsink, and prerolls to READY so an unusable graph fails before any
/// listener is opened. The appsink callback runs on GStreamer's streaming
/// thread and only pushes chunks through the fan-out; bus messages are
/// translated into events on the coordinator channel by a dedicated watcher
/// thread. Neither context ever mutates pipeline state itself.
pub struct GstStreamProducer {
    pipeline: gstreamer::Pipeline,
    fanout: Arc<FanoutSet>,
    watcher_running: Arc<AtomicBool>,
    watcher: Option<thread::JoinHandle<()>>,
}

impl GstStreamProducer {
    pub fn new(
        descriptor: &StreamDescriptor,
        events: mpsc::UnboundedSender<CoordinatorEvent>,
        fanout: Arc<FanoutSet>,
    ) -> Result<Self> {
        let bin = PipelineBuilder::build_source_bin(descriptor)?;
        let appsink = Self::build_appsink(fanout.clone());
        let pipeline = PipelineBuilder::assemble(&bin, &appsink)?;

        pipeline
            .set_state(gstreamer::State::Ready)
            .map_err(|_| DomainError::ProducerNotReady)?;

        let watcher_running = Arc::new(AtomicBool::new(true));
        let watcher = Self::spawn_bus_watcher(&pipeline, events, watcher_running.clone())?;

        Ok(Self {
            pipeline,
            fanout,
            watcher_running,
            watcher: Some(watcher),
        })
    }

    fn build_appsink(fanout: Arc<FanoutSet>) -> gstreamer_app::AppSink {
        let appsink = gstreamer_app::AppSink::builder()
            .name("fanout")
            .max_buffers(APPSINK_MAX_BUFFERS)
            .build();

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gstreamer::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gstreamer::FlowError::Error)?;
                    let map = buffer
                        .map_readable()
                        .map_err(|_| gstreamer::FlowError::Error)?;
                    fanout.push_chunk(Bytes::copy_from_slice(map.as_slice()));
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        appsink
    }

    fn spawn_bus_watcher(
        pipeline: &gstreamer::Pipeline,
        events: mpsc::UnboundedSender<CoordinatorEvent>,
        running: Arc<AtomicBool>,
    ) -> Result<thread::JoinHandle<()>> {
        let bus = pipeline
            .bus()
            .ok_or_else(|| DomainError::PipelineAssembly("pipeline has no bus".to_string()))?;
        let pipeline = pipeline.clone();

        thread::Builder::new()
            .name("bus-watcher".to_string())
            .spawn(move || {
                let timeout = gstreamer::ClockTime::from_mseconds(BUS_POLL_TIMEOUT_MS);
                while running.load(Ordering::SeqCst) {
                    if let Some(msg) = bus.timed_pop(timeout) {
                        if Self::dispatch_bus_message(&pipeline, &events, &msg) {
                            break;
                        }
                    }
                }
            })
            .map_err(|e| DomainError::PipelineAssembly(e.to_string()))
    }

    /// Translate one bus message into a coordinator event. Returns true when
    /// the control loop is gone and watching should stop.
    fn dispatch_bus_message(
        pipeline: &gstreamer::Pipeline,
        events: &mpsc::UnboundedSender<CoordinatorEvent>,
        msg: &gstreamer::Message,
    ) -> bool {
        use gstreamer::MessageView;

        let event = match msg.view() {
            MessageView::Eos(..) => Some(StreamEvent::EndOfStream),
            MessageView::Error(err) => {
                Self::dump_graph(pipeline, "error");
                Some(StreamEvent::Fatal(format!(
                    "{} (from {:?}, debug {:?})",
                    err.error(),
                    err.src().map(|s| s.path_string()),
                    err.debug()
                )))
            }
            MessageView::Warning(warn) => Some(StreamEvent::Diagnostic(
                DiagnosticSeverity::Warning,
                format!("{} ({:?})", warn.error(), warn.debug()),
            )),
            MessageView::Info(info) => Some(StreamEvent::Diagnostic(
                DiagnosticSeverity::Info,
                format!("{} ({:?})", info.error(), info.debug()),
            )),
            MessageView::StateChanged(change) => {
                // Only the toplevel element's transitions are interesting
                if change.src().map(|s| s == pipeline).unwrap_or(false) {
                    tracing::debug!(
                        old = ?change.old(),
                        current = ?change.current(),
                        pending = ?change.pending(),
                        "pipeline state changed"
                    );
                    Self::dump_graph(
                        pipeline,
                        &format!("statechange-{:?}-to-{:?}", change.old(), change.current()),
                    );
                }
                None
            }
            MessageView::RequestState(req) => {
                let target = if req.requested_state() == gstreamer::State::Playing {
                    ProducerTarget::Running
                } else {
                    ProducerTarget::Halted
                };
                Some(StreamEvent::StateChangeRequested(target))
            }
            MessageView::Latency(..) => Some(StreamEvent::LatencyChanged),
            _ => None,
        };

        if let Some(event) = event {
            if events.send(CoordinatorEvent::Producer(event)).is_err() {
                return true;
            }
        }
        false
    }

    /// Write a .dot graph of the pipeline for postmortems. Gated on
    /// GST_DEBUG_DUMP_DOT_DIR; does nothing when unset and never fails.
    fn dump_graph(pipeline: &gstreamer::Pipeline, name: &str) {
        if std::env::var_os("GST_DEBUG_DUMP_DOT_DIR").is_none() {
            return;
        }
        pipeline.debug_to_dot_file_with_ts(
            gstreamer::DebugGraphDetails::all(),
            name,
        );
    }

    fn set_state(&self, state: gstreamer::State) -> Result<()> {
        self.pipeline
            .set_state(state)
            .map(|_| ())
            .map_err(|e| DomainError::ProducerStateChange(e.to_string()))
    }
}

#[async_trait]
impl StreamProducer for GstStreamProducer {
    async fn start(&self) -> Result<()> {
        self.set_state(gstreamer::State::Playing)
    }

    // READY rather than NULL so a later start() reuses the prerolled graph
    async fn stop(&self) -> Result<()> {
        self.set_state(gstreamer::State::Ready)
    }

    async fn apply_requested_state(&self, target: ProducerTarget) -> Result<()> {
        match target {
            ProducerTarget::Running => self.set_state(gstreamer::State::Playing),
            ProducerTarget::Halted => self.set_state(gstreamer::State::Ready),
        }
    }

    async fn redistribute_latency(&self) -> Result<()> {
        self.pipeline
            .recalculate_latency()
            .map_err(|e| DomainError::ProducerStateChange(e.to_string()))
    }

    fn register_sink(&self, id: ClientId, sink: ChunkSender) {
        self.fanout.register(id, sink);
    }

    fn unregister_sink(&self, id: ClientId) -> bool {
        self.fanout.unregister(id)
    }

    fn sink_count(&self) -> usize {
        self.fanout.len()
    }
}

impl Drop for GstStreamProducer {
    fn drop(&mut self) {
        self.watcher_running.store(false, Ordering::SeqCst);
        if let Some(watcher) = self.watcher.take() {
            let _ = watcher.join();
        }
        let _ = self.pipeline.set_state(gstreamer::State::Null);
    }
}
