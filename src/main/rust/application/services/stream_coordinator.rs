use std::sync::Arc;

use tokio::sync::mpsc;

use super::client_registry::{ClientRegistry, Removal};
use crate::domain::entities::StreamLifecycle;
use crate::domain::ports::{MetricsReporter, StreamProducer};
use crate::domain::value_objects::{
    ClientId, CoordinatorEvent, CoordinatorState, DiagnosticSeverity, StreamEvent,
};

/// The state machine gluing producer lifecycle to registry occupancy.
///
/// Runs as a single task consuming events in emission order, so no two
/// transitions ever execute concurrently. Registry mutations on the accept
/// path reach this loop only through occupancy events; producer callbacks
/// reach it only through the same channel. Nothing outside this loop
/// mutates producer run state.
pub struct StreamCoordinator {
    producer: Arc<dyn StreamProducer>,
    registry: Arc<ClientRegistry>,
    metrics: Arc<dyn MetricsReporter>,
    lifecycle: StreamLifecycle,
    events: mpsc::UnboundedReceiver<CoordinatorEvent>,
}

impl StreamCoordinator {
    pub fn new(
        producer: Arc<dyn StreamProducer>,
        registry: Arc<ClientRegistry>,
        metrics: Arc<dyn MetricsReporter>,
        events: mpsc::UnboundedReceiver<CoordinatorEvent>,
    ) -> Self {
        Self {
            producer,
            registry,
            metrics,
            lifecycle: StreamLifecycle::new(),
            events,
        }
    }

    pub fn state(&self) -> CoordinatorState {
        *self.lifecycle.current_state()
    }

    /// Consume events until shutdown. A closed channel counts as shutdown.
    pub async fn run(mut self) {
        tracing::info!("control loop started");
        while let Some(event) = self.events.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }
        tracing::info!("control loop stopped");
    }

    async fn handle_event(&mut self, event: CoordinatorEvent) -> bool {
        match event {
            CoordinatorEvent::FirstClientJoined(id) => self.on_first_client(id).await,
            CoordinatorEvent::RegistryEmptied => self.on_registry_emptied().await,
            CoordinatorEvent::Producer(event) => self.on_producer_event(event).await,
            CoordinatorEvent::Shutdown => {
                self.drain("shutting down", false).await;
                return false;
            }
        }
        true
    }

    async fn on_first_client(&mut self, id: ClientId) {
        // A drain that found late arrivals may already have restarted the
        // producer; never issue a second start.
        if self.lifecycle.current_state().is_streaming() {
            tracing::debug!(%id, "producer already running");
            return;
        }

        match self.producer.start().await {
            Ok(()) => {
                tracing::info!(%id, "first client connected, producer started");
                self.set_streaming();
            }
            Err(e) => {
                tracing::error!(%id, error = %e, "producer start failed, dropping client");
                self.registry.remove(id);
            }
        }
    }

    async fn on_registry_emptied(&mut self) {
        if !self.lifecycle.current_state().is_streaming() {
            return;
        }

        tracing::info!("last client disconnected, stopping producer");
        if let Err(e) = self.producer.stop().await {
            tracing::warn!(error = %e, "producer stop failed");
        }
        self.set_idle();
    }

    async fn on_producer_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::SinkRemoved(id) => {
                if self.registry.remove(id) == Removal::NotFound {
                    tracing::debug!(%id, "removal for unknown client ignored");
                }
            }
            StreamEvent::EndOfStream => {
                tracing::info!("end of stream reached, halting producer");
                self.drain("end of stream", true).await;
            }
            StreamEvent::Fatal(message) => {
                tracing::error!(%message, "fatal producer error, halting producer");
                self.drain("fatal error", true).await;
            }
            StreamEvent::Diagnostic(severity, message) => match severity {
                DiagnosticSeverity::Info => tracing::info!(%message, "producer diagnostic"),
                DiagnosticSeverity::Warning => tracing::warn!(%message, "producer diagnostic"),
            },
            StreamEvent::StateChangeRequested(target) => {
                // The producer is the source of truth for its own state
                // here; classification is re-derived on the next
                // registry-driven event.
                tracing::info!(?target, "honoring producer state change request");
                if let Err(e) = self.producer.apply_requested_state(target).await {
                    tracing::warn!(error = %e, "requested state change failed");
                }
            }
            StreamEvent::LatencyChanged => {
                tracing::debug!("redistributing latency");
                if let Err(e) = self.producer.redistribute_latency().await {
                    tracing::warn!(error = %e, "latency redistribution failed");
                }
            }
        }
    }

    /// Stop the producer and force-disconnect every client, then return to
    /// idle. Clients that slipped in while draining are accepted: unless
    /// shutting down, occupancy is re-evaluated and the producer restarted
    /// for them.
    async fn drain(&mut self, reason: &str, restart_if_occupied: bool) {
        self.lifecycle.transition_to_draining(reason);
        self.metrics.report_state_change(self.lifecycle.current_state());

        if let Err(e) = self.producer.stop().await {
            tracing::warn!(error = %e, "producer stop failed while draining");
        }

        let cleared = self.registry.clear();
        if cleared > 0 {
            tracing::info!(cleared, "disconnected all clients");
        }

        self.set_idle();

        if restart_if_occupied && !self.registry.is_empty() {
            tracing::info!("clients connected during teardown, restarting producer");
            match self.producer.start().await {
                Ok(()) => self.set_streaming(),
                Err(e) => tracing::error!(error = %e, "producer restart failed"),
            }
        }
    }

    fn set_streaming(&mut self) {
        self.lifecycle.transition_to_streaming();
        self.metrics.report_state_change(self.lifecycle.current_state());
    }

    fn set_idle(&mut self) {
        self.lifecycle.transition_to_idle();
        self.metrics.report_state_change(self.lifecycle.current_state());
    }
}
