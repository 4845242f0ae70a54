//! Error types for the load-test library.

use thiserror::Error;

/// Result type for library operations.
pub type CargarResult<T> = Result<T, CargarError>;

/// Errors that can occur while configuring or running a load test.
///
/// Per-request failures are deliberately NOT represented here: they are
/// absorbed at the VU context boundary and recorded as metric samples so a
/// bad response can never abort a virtual user's loop. Only configuration
/// problems prevent a run from starting.
#[derive(Debug, Error)]
pub enum CargarError {
    /// Invalid run configuration (fatal at startup).
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CargarError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CargarError::config("negative stage duration");
        assert!(err.to_string().contains("Configuration"));
        assert!(err.to_string().contains("negative stage duration"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CargarError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
