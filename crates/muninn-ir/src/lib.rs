//! Muninn Circuit Intermediate Representation
//!
//! This crate provides the core data structures for representing shot-based
//! quantum circuits in Muninn. It forms the foundation of the measurement
//! rewriting stack.
//!
//! # Overview
//!
//! A [`Circuit`] is an ordered list of gate instructions followed by a list
//! of terminal [`Measurement`] requests. Measurements are first-class IR:
//! a request may ask for an analytic statistic (expectation value, variance,
//! probability distribution) or for raw readout (counts, per-shot samples),
//! over an [`Observable`] or an explicit qubit subset. The rewriting passes
//! in `muninn-rewrite` operate on this terminal measurement list.
//!
//! # Core Components
//!
//! - **Qubits**: [`QubitId`] for addressing wires
//! - **Gates**: [`Gate`] for the supported gate set, [`Instruction`]
//!   combining a gate with its operands
//! - **Observables**: [`Pauli`], [`PauliTerm`] (tensor products) and
//!   [`Observable`] (terms or weighted sums)
//! - **Measurements**: [`Measurement`] terminal requests and
//!   [`MeasurementKind`] for capability negotiation
//! - **Emission**: [`emit::emit`] renders the low-level text listing
//!
//! # Example: Requesting Statistics
//!
//! ```rust
//! use muninn_ir::{Circuit, Observable, PauliTerm, QubitId, QubitSelection};
//!
//! let mut circuit = Circuit::new("ramsey", 2);
//! circuit.ry(1.9, QubitId(0)).unwrap();
//! circuit.ry(0.95, QubitId(1)).unwrap();
//!
//! let xx = PauliTerm::x(QubitId(0)).tensor(PauliTerm::x(QubitId(1))).unwrap();
//! circuit.expval(Observable::Term(xx)).unwrap();
//! circuit.probs(QubitSelection::Subset(vec![QubitId(1)])).unwrap();
//!
//! assert_eq!(circuit.measurements().len(), 2);
//! ```

pub mod circuit;
pub mod emit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod measurement;
pub mod observable;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::Gate;
pub use instruction::Instruction;
pub use measurement::{Measurement, MeasurementKind, QubitSelection, ReadoutTarget};
pub use observable::{Observable, Pauli, PauliTerm};
pub use qubit::QubitId;
