//! Error types for the IR crate.

use crate::observable::Pauli;
use crate::qubit::QubitId;
use thiserror::Error;

/// Errors that can occur in IR operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit index exceeds the circuit size.
    #[error("Qubit {qubit} out of range for circuit with {num_qubits} qubits")]
    QubitOutOfRange {
        /// The offending qubit.
        qubit: QubitId,
        /// Number of qubits in the circuit.
        num_qubits: u32,
    },

    /// Gate requires a different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: &'static str,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Duplicate qubit in an operation or observable.
    #[error("Duplicate qubit {0} in operation")]
    DuplicateQubit(QubitId),

    /// Observable with no Pauli factors.
    #[error("Observable must contain at least one Pauli factor")]
    EmptyObservable,

    /// Two Pauli factors request different measurement bases on one qubit.
    #[error("Conflicting measurement bases on {qubit}: {first} vs {second}")]
    ConflictingBasis {
        /// The qubit with conflicting bases.
        qubit: QubitId,
        /// Basis requested first.
        first: Pauli,
        /// Conflicting basis.
        second: Pauli,
    },

    /// Empty qubit subset where at least one qubit is required.
    #[error("Qubit subset must not be empty")]
    EmptySubset,
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
