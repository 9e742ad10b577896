//! Error taxonomy for benchmark generation and regression checking
//!
//! Regression failures are deliberately absent: a field falling outside its
//! tolerance band is the ordinary failing outcome of a check and is carried by
//! [`crate::regression::CheckResult`], not by this enum.

use thiserror::Error;

/// Errors raised while building grids, generating benchmarks or checking them
#[derive(Error, Debug)]
pub enum TrustRandomError {
    /// Invalid parameter range or grid constraint, raised at construction time
    #[error("Domain error: {0}")]
    Domain(String),

    /// Result shape is non-numeric or differs from what was recorded
    #[error("Schema error in {function}{location}: {message}")]
    Schema {
        function: String,
        /// Rendered parameter tuple, empty when the error is not tied to one
        location: String,
        message: String,
    },

    /// The target function itself failed
    #[error("Computation failed in {function}{location}: {source}")]
    Computation {
        function: String,
        location: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for trust-random operations
pub type Result<T> = std::result::Result<T, TrustRandomError>;

impl TrustRandomError {
    pub(crate) fn domain(message: impl Into<String>) -> Self {
        Self::Domain(message.into())
    }

    /// Schema error not yet attributed to a function; the runner and harness
    /// fill in the function name and tuple with [`TrustRandomError::at`].
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            function: String::new(),
            location: String::new(),
            message: message.into(),
        }
    }

    /// Attach function name and tuple context to schema and computation errors
    pub(crate) fn at(self, function: &str, tuple: &str) -> Self {
        let location = format!(" at {}", tuple);
        match self {
            Self::Schema { message, .. } => Self::Schema {
                function: function.to_string(),
                location,
                message,
            },
            Self::Computation { source, .. } => Self::Computation {
                function: function.to_string(),
                location,
                source,
            },
            other => other,
        }
    }

    /// True for errors that describe a mismatched or non-numeric result shape
    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, Self::Domain(_))
    }
}
