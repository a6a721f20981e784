//! Error types for rcloadenv.

/// Result type alias for rcloadenv operations.
pub type Result<T> = std::result::Result<T, RuntimeConfigError>;

/// Errors that can occur while locating or fetching runtime configuration.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeConfigError {
    /// A required property is absent from the hosting environment.
    #[error("Required property '{0}' is not set")]
    MissingProperty(String),

    /// Neither `GOOGLE_CLOUD_PROJECT` nor `GCLOUD_PROJECT` is set.
    #[error("Project id not available: GOOGLE_CLOUD_PROJECT or GCLOUD_PROJECT not set")]
    MissingProjectId,

    /// No access token could be obtained.
    #[error("Failed to obtain credentials: {0}")]
    Credentials(String),

    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("HTTP request failed with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as returned by the server
        body: String,
    },

    /// The response body is not the expected JSON shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The response body has no `variables` list.
    #[error("Failed to parse response: missing 'variables' list")]
    MissingVariables,

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases.
    #[error("Runtime config error: {0}")]
    Other(String),
}

impl RuntimeConfigError {
    /// Whether this error reflects misconfiguration rather than a failed fetch.
    ///
    /// Misconfiguration aborts a whole `locate` call; everything else is
    /// confined to the profile being loaded.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, Self::MissingProperty(_) | Self::MissingProjectId)
    }
}

impl From<reqwest::Error> for RuntimeConfigError {
    fn from(err: reqwest::Error) -> Self {
        RuntimeConfigError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for RuntimeConfigError {
    fn from(err: serde_json::Error) -> Self {
        RuntimeConfigError::Parse(err.to_string())
    }
}
