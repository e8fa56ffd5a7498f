use super::ClientId;

/// Target of a state change the producer requested for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProducerTarget {
    Running,
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Info,
    Warning,
}

/// Asynchronous notifications emitted by the upstream producer.
///
/// These originate on producer-internal execution contexts (streaming
/// thread, bus watcher) and must only ever be enqueued, never acted on in
/// place.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fan-out sink failed a push or disconnected; the client should be
    /// removed from the registry.
    SinkRemoved(ClientId),
    EndOfStream,
    Fatal(String),
    Diagnostic(DiagnosticSeverity, String),
    StateChangeRequested(ProducerTarget),
    LatencyChanged,
}

/// Everything the serialized control loop reacts to, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// Registry occupancy went 0 -> 1 with this client
    FirstClientJoined(ClientId),
    /// Registry occupancy went 1 -> 0
    RegistryEmptied,
    Producer(StreamEvent),
    Shutdown,
}
