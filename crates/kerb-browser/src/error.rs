use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser engine: {0}")]
    Launch(String),

    #[error("failed to load {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out loading {url} after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl RenderError {
    /// Whether retrying the same load can plausibly succeed.
    ///
    /// Navigation errors, timeouts and HTTP failures are often transient;
    /// a bad URL or a broken engine launch is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Navigation { .. } | Self::Timeout { .. } | Self::HttpStatus { .. }
        )
    }
}
