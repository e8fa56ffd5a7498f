use clap::Parser;

use crate::domain::value_objects::StreamDescriptor;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pipeline-http",
    version,
    about = "HTTP live streaming server with a shared upstream pipeline"
)]
pub struct Config {
    /// Port to serve the HTTP stream on
    pub port: u16,

    /// Content type sent to every client (e.g. video/webm)
    pub content_type: String,

    /// gst-launch style pipeline description. Must contain an element named
    /// "stream" with an unlinked src pad, e.g.
    /// ( videotestsrc ! theoraenc ! oggmux name=stream )
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub pipeline: Vec<String>,

    /// Metrics server port
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    pub metrics_port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port == 0 {
            anyhow::bail!("Invalid port: port cannot be 0");
        }
        if self.metrics_port == 0 {
            anyhow::bail!("Invalid metrics port: port cannot be 0");
        }
        if self.port == self.metrics_port {
            anyhow::bail!("HTTP port and metrics port cannot be the same");
        }
        Ok(())
    }

    /// Convert CLI arguments to the domain descriptor
    pub fn to_descriptor(&self) -> crate::domain::errors::Result<StreamDescriptor> {
        StreamDescriptor::new(self.content_type.clone(), self.pipeline.clone())
    }
}
