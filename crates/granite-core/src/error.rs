//! Error types module
//!
//! Unified error type for conditions that can make an install fail outright,
//! as distinct from per-leaf-download failures, which are counted rather
//! than propagated.

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Connection, timeout, or a 5xx/429/567 status the transport-level
    /// retry policy already exhausted.
    #[error("transport error: {0}")]
    Transport(String),

    /// A hash check on the main client archive did not match.
    #[error("integrity check failed: expected sha1 {expected}, got {actual}")]
    Integrity { expected: String, actual: String },

    /// The version manifest did not contain the requested version, or a
    /// JSON document was missing an expected field.
    #[error("schema error: {0}")]
    Schema(String),

    /// A filesystem operation failed (create dir, write, read, rename).
    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
}

impl AppError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_error_displays_both_digests() {
        let err = AppError::Integrity {
            expected: "aaaa".into(),
            actual: "bbbb".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("aaaa"));
        assert!(msg.contains("bbbb"));
    }

    #[test]
    fn filesystem_error_wraps_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AppError = io_err.into();
        assert!(matches!(err, AppError::Filesystem(_)));
    }
}
