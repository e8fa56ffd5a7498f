use crate::domain::errors::{DomainError, Result};

/// Declarative description of the media processing graph, parsed once at
/// startup and immutable thereafter.
///
/// The launch tokens come straight from the command line in gst-launch
/// syntax. The graph contract (an element named "stream" with an unlinked
/// src pad) is enforced when the pipeline is built; this type only validates
/// what can be checked without a media framework.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    content_type: String,
    launch_tokens: Vec<String>,
}

impl StreamDescriptor {
    pub fn new(content_type: String, launch_tokens: Vec<String>) -> Result<Self> {
        Self::validate_content_type(&content_type)?;

        if launch_tokens.iter().all(|t| t.trim().is_empty()) {
            return Err(DomainError::EmptyDescriptor);
        }

        Ok(Self {
            content_type,
            launch_tokens,
        })
    }

    /// Content type sent in every client's response headers, fixed for the
    /// process lifetime.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn launch_tokens(&self) -> &[String] {
        &self.launch_tokens
    }

    /// The tokens joined back into a single gst-launch line.
    pub fn launch_line(&self) -> String {
        self.launch_tokens.join(" ")
    }

    fn validate_content_type(content_type: &str) -> Result<()> {
        let mut halves = content_type.splitn(2, '/');
        let kind = halves.next().unwrap_or("");
        let subtype = halves.next().unwrap_or("");

        if kind.is_empty() || subtype.is_empty() || content_type.contains(char::is_whitespace) {
            return Err(DomainError::InvalidContentType(content_type.to_string()));
        }
        Ok(())
    }
}
