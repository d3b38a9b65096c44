// Error types for the download pipeline

use std::fmt;

/// Errors that can occur inside the watermarking pipeline.
///
/// All three kinds are absorbed at the delivery boundary and converted
/// into the fallback outcome; none of them propagates past the adapter.
#[derive(Debug, Clone)]
pub enum PipelineError {
    /// Network fetch failed (connect error, timeout, non-success status).
    Transport(String),

    /// Fetched bytes are not a well-formed PDF document.
    Parse(String),

    /// Font embedding, page mutation, or re-serialization failed.
    Render(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Transport(msg) => write!(f, "Transport error: {}", msg),
            PipelineError::Parse(msg) => write!(f, "Parse error: {}", msg),
            PipelineError::Render(msg) => write!(f, "Render error: {}", msg),
        }
    }
}

impl std::error::Error for PipelineError {}
