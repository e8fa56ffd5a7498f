use gstreamer::prelude::*;

use crate::domain::errors::{DomainError, Result};
use crate::domain::value_objects::StreamDescriptor;

/// Name the descriptor must give to its terminal element
pub const STREAM_ELEMENT_NAME: &str = "stream";

pub struct PipelineBuilder;

impl PipelineBuilder {
    /// Parse the launch description into a bin whose single output is the
    /// ghosted src pad of the element named "stream".
    ///
    /// The descriptor contract is enforced here: the element must exist and
    /// its src pad must be present and unlinked. Violations are
    /// construction-time errors.
    pub fn build_source_bin(descriptor: &StreamDescriptor) -> Result<gstreamer::Bin> {
        let launch_line = descriptor.launch_line();
        tracing::debug!(%launch_line, "parsing pipeline description");

        let parsed = gstreamer::parse::launch(&launch_line)
            .map_err(|e| DomainError::DescriptorParse(e.to_string()))?;

        let bin = parsed
            .downcast::<gstreamer::Bin>()
            .map_err(|_| DomainError::DescriptorParse("description is not a bin".to_string()))?;

        let stream_element = bin
            .by_name(STREAM_ELEMENT_NAME)
            .ok_or(DomainError::MissingStreamElement)?;

        let srcpad = stream_element
            .static_pad("src")
            .ok_or(DomainError::MissingSourcePad)?;
        if srcpad.is_linked() {
            return Err(DomainError::SourcePadLinked);
        }

        let ghost = gstreamer::GhostPad::builder_with_target(&srcpad)
            .map_err(|e| DomainError::PipelineAssembly(e.to_string()))?
            .name("src")
            .build();
        bin.add_pad(&ghost)
            .map_err(|e| DomainError::PipelineAssembly(e.to_string()))?;

        Ok(bin)
    }

    /// Assemble the full pipeline: source bin linked into the fan-out sink.
    pub fn assemble(
        bin: &gstreamer::Bin,
        appsink: &gstreamer_app::AppSink,
    ) -> Result<gstreamer::Pipeline> {
        let pipeline = gstreamer::Pipeline::new();

        pipeline
            .add_many([bin.upcast_ref::<gstreamer::Element>(), appsink.upcast_ref()])
            .map_err(|e| DomainError::PipelineAssembly(e.to_string()))?;
        bin.link(appsink)
            .map_err(|e| DomainError::PipelineAssembly(e.to_string()))?;

        Ok(pipeline)
    }
}
