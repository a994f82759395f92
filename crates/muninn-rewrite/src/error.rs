//! Error types for the rewrite crate.

use muninn_hal::HalError;
use muninn_ir::{IrError, MeasurementKind};
use thiserror::Error;

/// Errors that can occur during measurement rewriting and reconstruction.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RewriteError {
    /// A measurement kind the active rewrite mode cannot serve.
    ///
    /// Raised deterministically before any circuit mutation is committed;
    /// the request is never retried.
    #[error("{kind} measurements are not implemented with {transform}")]
    UnsupportedMeasurement {
        /// The offending measurement kind.
        kind: MeasurementKind,
        /// Name of the rewriting transform.
        transform: &'static str,
    },

    /// The circuit has no terminal measurements to rewrite.
    #[error("Circuit has no terminal measurements")]
    NoMeasurements,

    /// A qubit referenced by a measurement is not in the readout register.
    #[error("Qubit {0} is not part of the readout register")]
    QubitNotInRegister(muninn_ir::QubitId),

    /// Raw results do not match the shape the rewrite plan expects.
    #[error("Result shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A bitstring that is not valid binary.
    #[error("Invalid bitstring: {0:?}")]
    InvalidBitstring(String),

    /// IR-level failure (conflicting bases, bounds).
    #[error(transparent)]
    Ir(#[from] IrError),

    /// Backend execution failure.
    #[error("Execution failed: {0}")]
    Execution(#[from] HalError),
}

/// Result type for rewrite operations.
pub type RewriteResult<T> = Result<T, RewriteError>;
