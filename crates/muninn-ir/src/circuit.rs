//! High-level circuit builder API.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::Gate;
use crate::instruction::Instruction;
use crate::measurement::{Measurement, QubitSelection, ReadoutTarget};
use crate::observable::Observable;
use crate::qubit::QubitId;

/// A quantum circuit: an ordered gate list followed by terminal
/// measurement requests.
///
/// The builder methods validate qubit bounds as instructions are added,
/// so a constructed circuit always addresses qubits inside its register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Number of qubits.
    num_qubits: u32,
    /// Gate instructions, in program order.
    ops: Vec<Instruction>,
    /// Terminal measurement requests, in declaration order.
    measurements: Vec<Measurement>,
}

impl Circuit {
    /// Create a new empty circuit over a fixed qubit register.
    pub fn new(name: impl Into<String>, num_qubits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            ops: vec![],
            measurements: vec![],
        }
    }

    fn check_qubit(&self, qubit: QubitId) -> IrResult<()> {
        if qubit.0 >= self.num_qubits {
            return Err(IrError::QubitOutOfRange {
                qubit,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    /// Append an instruction, validating operand count and bounds.
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        let expected = instruction.gate.num_qubits();
        let got = instruction.qubits.len() as u32;
        if expected != got {
            return Err(IrError::QubitCountMismatch {
                gate_name: instruction.gate.name(),
                expected,
                got,
            });
        }
        for qubit in &instruction.qubits {
            self.check_qubit(*qubit)?;
        }
        for (i, qubit) in instruction.qubits.iter().enumerate() {
            if instruction.qubits[..i].contains(qubit) {
                return Err(IrError::DuplicateQubit(*qubit));
            }
        }
        self.ops.push(instruction);
        Ok(self)
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single(Gate::H, qubit))
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single(Gate::X, qubit))
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single(Gate::Y, qubit))
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single(Gate::Z, qubit))
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single(Gate::S, qubit))
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single(Gate::Sdg, qubit))
    }

    /// Apply Rx rotation gate.
    pub fn rx(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single(Gate::Rx(theta), qubit))
    }

    /// Apply Ry rotation gate.
    pub fn ry(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single(Gate::Ry(theta), qubit))
    }

    /// Apply Rz rotation gate.
    pub fn rz(&mut self, theta: f64, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single(Gate::Rz(theta), qubit))
    }

    // =========================================================================
    // Two-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two(Gate::CX, control, target))
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two(Gate::CZ, control, target))
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two(Gate::Swap, q1, q2))
    }

    // =========================================================================
    // Terminal measurements
    // =========================================================================

    fn check_measurement(&self, measurement: &Measurement) -> IrResult<()> {
        for qubit in measurement.support(self.num_qubits) {
            self.check_qubit(qubit)?;
        }
        if let Measurement::Probs(QubitSelection::Subset(qubits))
        | Measurement::Counts(ReadoutTarget::Qubits(QubitSelection::Subset(qubits)))
        | Measurement::Sample(ReadoutTarget::Qubits(QubitSelection::Subset(qubits))) =
            measurement
        {
            if qubits.is_empty() {
                return Err(IrError::EmptySubset);
            }
            for (i, qubit) in qubits.iter().enumerate() {
                if qubits[..i].contains(qubit) {
                    return Err(IrError::DuplicateQubit(*qubit));
                }
            }
        }
        Ok(())
    }

    /// Append a measurement request.
    pub fn measure(&mut self, measurement: Measurement) -> IrResult<&mut Self> {
        self.check_measurement(&measurement)?;
        self.measurements.push(measurement);
        Ok(self)
    }

    /// Request the expectation value of an observable.
    pub fn expval(&mut self, observable: impl Into<Observable>) -> IrResult<&mut Self> {
        self.measure(Measurement::Expval(observable.into()))
    }

    /// Request the variance of an observable.
    pub fn var(&mut self, observable: impl Into<Observable>) -> IrResult<&mut Self> {
        self.measure(Measurement::Var(observable.into()))
    }

    /// Request the probability distribution over a qubit selection.
    pub fn probs(&mut self, selection: QubitSelection) -> IrResult<&mut Self> {
        self.measure(Measurement::Probs(selection))
    }

    /// Request readout counts.
    pub fn counts(&mut self, target: ReadoutTarget) -> IrResult<&mut Self> {
        self.measure(Measurement::Counts(target))
    }

    /// Request per-shot samples.
    pub fn sample(&mut self, target: ReadoutTarget) -> IrResult<&mut Self> {
        self.measure(Measurement::Sample(target))
    }

    /// Replace the full measurement list, returning the previous one.
    ///
    /// Used by rewriting passes that substitute a raw readout request for
    /// the analytic requests.
    pub fn replace_measurements(&mut self, measurements: Vec<Measurement>) -> Vec<Measurement> {
        std::mem::replace(&mut self.measurements, measurements)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Get the gate instructions in program order.
    pub fn ops(&self) -> &[Instruction] {
        &self.ops
    }

    /// Get the number of gate instructions.
    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// Get the terminal measurement requests.
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Clone the gate prelude (everything except the measurements) into a
    /// new circuit with the given name.
    pub fn clone_prelude(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_qubits: self.num_qubits,
            ops: self.ops.clone(),
            measurements: vec![],
        }
    }
}
