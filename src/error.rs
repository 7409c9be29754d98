//! Error handling for wavecache
//!
//! Programming errors on the hot path (unequal-shape swaps, lookups on an
//! empty table) panic. Everything reachable from the producer side returns
//! one of these variants instead.

use thiserror::Error;

/// Result type alias for wavecache operations
pub type Result<T> = std::result::Result<T, WavetableError>;

/// Main error type for wavecache operations
#[derive(Error, Debug)]
pub enum WavetableError {
    // Shape Errors
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Invalid shape: {reason}")]
    InvalidShape { reason: String },

    // Table Content Errors
    #[error("Capacity exceeded: {what} needs {requested} entries (limit {limit})")]
    CapacityExceeded {
        what: &'static str,
        requested: usize,
        limit: usize,
    },

    #[error("Invalid frequencies: {reason}")]
    InvalidFrequencies { reason: String },

    #[error("Invalid semantics: {reason}")]
    InvalidSemantics { reason: String },

    #[error("Frequency rows differ from the stored rows; insert with invalidate=true")]
    FrequencyMismatch,

    #[error("Wavetable has not been populated yet")]
    NotPopulated,

    // Resource Errors
    #[error("Out of memory: {details} ({requested_bytes} bytes requested)")]
    OutOfMemory {
        requested_bytes: usize,
        details: String,
    },

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WavetableError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            WavetableError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            WavetableError::InvalidShape { .. } => "INVALID_SHAPE",
            WavetableError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            WavetableError::InvalidFrequencies { .. } => "INVALID_FREQUENCIES",
            WavetableError::InvalidSemantics { .. } => "INVALID_SEMANTICS",
            WavetableError::FrequencyMismatch => "FREQUENCY_MISMATCH",
            WavetableError::NotPopulated => "NOT_POPULATED",
            WavetableError::OutOfMemory { .. } => "OUT_OF_MEMORY",
            WavetableError::InvalidConfig { .. } => "INVALID_CONFIG",
            WavetableError::Io(_) => "IO_ERROR",
            WavetableError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the caller can recover by retrying with different input
    ///
    /// Allocation failures are recoverable in the sense that the producer may
    /// free memory and retry later; the table itself is left untouched.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WavetableError::OutOfMemory { .. }
                | WavetableError::CapacityExceeded { .. }
                | WavetableError::FrequencyMismatch
                | WavetableError::NotPopulated
        )
    }

    pub(crate) fn shape_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        WavetableError::ShapeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(WavetableError::NotPopulated.error_code(), "NOT_POPULATED");
        assert_eq!(
            WavetableError::shape_mismatch("{1}", "{2}").error_code(),
            "SHAPE_MISMATCH"
        );
        assert_eq!(
            WavetableError::FrequencyMismatch.error_code(),
            "FREQUENCY_MISMATCH"
        );
    }

    #[test]
    fn test_error_display() {
        let err = WavetableError::CapacityExceeded {
            what: "semantics",
            requested: 130,
            limit: 128,
        };
        assert_eq!(
            err.to_string(),
            "Capacity exceeded: semantics needs 130 entries (limit 128)"
        );

        let err = WavetableError::shape_mismatch("{64, 3, 1}", "{64, 2, 1}");
        assert!(err.to_string().contains("{64, 3, 1}"));
    }

    #[test]
    fn test_recoverable() {
        let oom = WavetableError::OutOfMemory {
            requested_bytes: 1024,
            details: "budget exhausted".to_string(),
        };
        assert!(oom.is_recoverable());
        assert!(!WavetableError::shape_mismatch("a", "b").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: WavetableError = io.into();
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
