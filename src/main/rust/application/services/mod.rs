mod client_registry;
mod fanout;
mod stream_coordinator;

pub use client_registry::{ClientRegistry, Removal};
pub use fanout::FanoutSet;
pub use stream_coordinator::StreamCoordinator;
