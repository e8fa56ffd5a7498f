use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid port: port cannot be zero")]
    InvalidPort,

    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    #[error("Empty pipeline description")]
    EmptyDescriptor,

    #[error("Could not parse pipeline description: {0}")]
    DescriptorParse(String),

    #[error("No element named \"stream\" in pipeline description")]
    MissingStreamElement,

    #[error("No \"src\" pad on element \"stream\"")]
    MissingSourcePad,

    #[error("\"src\" pad of element \"stream\" is already linked")]
    SourcePadLinked,

    #[error("Pipeline assembly failed: {0}")]
    PipelineAssembly(String),

    #[error("Pipeline failed to reach ready state")]
    ProducerNotReady,

    #[error("Pipeline state change failed: {0}")]
    ProducerStateChange(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
