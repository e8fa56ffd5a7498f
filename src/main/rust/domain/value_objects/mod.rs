mod client_id;
mod coordinator_state;
mod stream_descriptor;
mod stream_event;

pub use client_id::ClientId;
pub use coordinator_state::CoordinatorState;
pub use stream_descriptor::StreamDescriptor;
pub use stream_event::{
    CoordinatorEvent, DiagnosticSeverity, ProducerTarget, StreamEvent,
};
