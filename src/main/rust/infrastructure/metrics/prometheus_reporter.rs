use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::domain::ports::MetricsReporter;
use crate::domain::value_objects::CoordinatorState;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref ACTIVE_CLIENTS: IntGauge = IntGauge::new(
        "http_stream_active_clients",
        "Number of currently connected stream clients"
    ).expect("metric can be created");
    pub static ref TOTAL_CONNECTIONS: IntCounter = IntCounter::new(
        "http_stream_client_connections_total",
        "Total number of client connections since server start"
    ).expect("metric can be created");
    pub static ref BYTES_SENT: IntCounter = IntCounter::new(
        "http_stream_bytes_sent_total",
        "Total media bytes queued for delivery to clients"
    ).expect("metric can be created");
    pub static ref FANOUT_DROPS: IntCounter = IntCounter::new(
        "http_stream_fanout_drops_total",
        "Clients evicted because their send queue stalled or closed"
    ).expect("metric can be created");
    pub static ref COORDINATOR_STATE: IntGauge = IntGauge::new(
        "http_stream_coordinator_state",
        "Coordinator state (0=idle, 1=streaming, 2=draining)"
    ).expect("metric can be created");
}

pub struct PrometheusReporter;

impl PrometheusReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn init_metrics() -> Result<(), prometheus::Error> {
        REGISTRY.register(Box::new(ACTIVE_CLIENTS.clone()))?;
        REGISTRY.register(Box::new(TOTAL_CONNECTIONS.clone()))?;
        REGISTRY.register(Box::new(BYTES_SENT.clone()))?;
        REGISTRY.register(Box::new(FANOUT_DROPS.clone()))?;
        REGISTRY.register(Box::new(COORDINATOR_STATE.clone()))?;
        Ok(())
    }

    pub fn gather_metrics() -> Vec<u8> {
        let encoder = TextEncoder::new();
        let metric_families = REGISTRY.gather();
        let mut buffer = vec![];
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::error!("Failed to encode metrics: {}", e);
            return b"# Error encoding metrics\n".to_vec();
        }
        buffer
    }
}

impl Default for PrometheusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsReporter for PrometheusReporter {
    fn report_client_connected(&self) {
        ACTIVE_CLIENTS.inc();
        TOTAL_CONNECTIONS.inc();
    }

    fn report_client_disconnected(&self) {
        ACTIVE_CLIENTS.dec();
    }

    fn report_bytes_sent(&self, bytes: u64) {
        BYTES_SENT.inc_by(bytes);
    }

    fn report_fanout_drop(&self) {
        FANOUT_DROPS.inc();
    }

    fn report_state_change(&self, state: &CoordinatorState) {
        COORDINATOR_STATE.set(state.as_metric());
    }
}
