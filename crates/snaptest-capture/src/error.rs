//! Error types for the capture pipeline
//!
//! - [`CaptureError`]: why a snapshot was invalidated or not delivered
//! - [`ConfigError`]: configuration that cannot be loaded or resolved
//!
//! Every invalidating error is absorbed at the session boundary: the
//! snapshot is dropped and the instrumented call carries on.

use snaptest_values::{GraphError, RegistryError, SinkError, TypeRef};
use std::path::PathBuf;

/// Capture pipeline error
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// No serializer claims a value and the reflective fallback is disabled
    #[error("no serializer accepts values of type {ty}")]
    ConfigurationGap {
        /// Runtime type of the unclaimed value
        ty: TypeRef,
    },

    /// Population did not finish within the configured budget
    #[error("population exceeded {ms}ms")]
    PopulationTimeout {
        /// Budget that was exceeded
        ms: u64,
    },

    /// Population failed internally
    #[error("population failed: {0}")]
    PopulationFailure(String),

    /// The worker went away before answering
    #[error("capture cancelled")]
    Cancelled,

    /// The snapshot consumer rejected a finished snapshot
    #[error("snapshot consumer failed: {0}")]
    RenderFailure(#[from] SinkError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl CaptureError {
    /// Check if the error invalidates the snapshot being captured
    #[inline]
    #[must_use]
    pub fn is_invalidating(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationGap { .. }
                | Self::PopulationTimeout { .. }
                | Self::PopulationFailure(_)
                | Self::Cancelled
        )
    }

    /// Check if the error is a timeout
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::PopulationTimeout { .. })
    }

    /// Create population failure
    #[inline]
    pub fn population_failure(reason: impl std::fmt::Display) -> Self {
        Self::PopulationFailure(reason.to_string())
    }
}

impl From<GraphError> for CaptureError {
    fn from(err: GraphError) -> Self {
        Self::population_failure(err)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A configured adaptor name is not in the catalog
    #[error("unknown {kind} adaptor '{name}'")]
    UnknownAdaptor {
        /// Registry the name was looked up in
        kind: &'static str,
        /// Configured name
        name: String,
    },

    /// Configured adaptors do not form a valid override chain
    #[error("adaptor registration failed: {0}")]
    Registry(#[from] RegistryError),

    /// The population budget must be positive
    #[error("timeout_ms must be greater than zero")]
    ZeroTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidating_errors() {
        assert!(CaptureError::PopulationTimeout { ms: 5 }.is_invalidating());
        assert!(CaptureError::population_failure("boom").is_invalidating());
        assert!(CaptureError::Cancelled.is_invalidating());
        assert!(!CaptureError::RenderFailure(SinkError::new("full")).is_invalidating());
        assert!(!CaptureError::Config(ConfigError::ZeroTimeout).is_invalidating());
    }

    #[test]
    fn messages_name_the_cause() {
        let err = CaptureError::ConfigurationGap {
            ty: TypeRef::class("demo::Bean"),
        };
        assert_eq!(err.to_string(), "no serializer accepts values of type demo::Bean");
        assert_eq!(
            CaptureError::PopulationTimeout { ms: 20 }.to_string(),
            "population exceeded 20ms"
        );
    }
}
