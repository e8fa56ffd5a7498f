mod stream_lifecycle;

pub use stream_lifecycle::{StateTransition, StreamLifecycle};
