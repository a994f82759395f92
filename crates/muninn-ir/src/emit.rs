//! Text emitter for serializing circuits.
//!
//! The emitted listing is the low-level form handed to an execution
//! engine: gate statements followed by `output` statements, one per
//! terminal measurement, whose opcode names the measurement kind. After a
//! rewriting pass has run, the listing contains only `counts`/`sample`
//! readout opcodes — callers use this as a verification signal.

use crate::circuit::Circuit;
use crate::measurement::{Measurement, QubitSelection, ReadoutTarget};
use crate::observable::Observable;
use crate::qubit::QubitId;

/// Emit a circuit as source text.
pub fn emit(circuit: &Circuit) -> String {
    let mut emitter = Emitter::new();
    emitter.emit_circuit(circuit)
}

struct Emitter {
    output: String,
}

impl Emitter {
    fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn emit_circuit(&mut self, circuit: &Circuit) -> String {
        self.writeln("OPENQASM 3.0;");
        self.writeln("");

        let num_qubits = circuit.num_qubits();
        if num_qubits > 0 {
            self.writeln(&format!("qubit[{num_qubits}] q;"));
            self.writeln("");
        }

        for instruction in circuit.ops() {
            let name = instruction.gate.name();
            let qubits = self.fmt_qubits(&instruction.qubits);
            match instruction.gate.angle() {
                Some(theta) => self.writeln(&format!("{name}({theta}) {qubits};")),
                None => self.writeln(&format!("{name} {qubits};")),
            }
        }

        if !circuit.measurements().is_empty() {
            self.writeln("");
            for measurement in circuit.measurements() {
                self.emit_measurement(measurement);
            }
        }

        self.output.clone()
    }

    fn emit_measurement(&mut self, measurement: &Measurement) {
        let opcode = measurement.kind().name();
        let operand = match measurement {
            Measurement::Expval(obs) | Measurement::Var(obs) => self.fmt_observable(obs),
            Measurement::Probs(sel) => self.fmt_selection(sel),
            Measurement::Counts(target) | Measurement::Sample(target) => match target {
                ReadoutTarget::Observable(obs) => self.fmt_observable(obs),
                ReadoutTarget::Qubits(sel) => self.fmt_selection(sel),
            },
        };
        self.writeln(&format!("output {opcode}({operand});"));
    }

    fn fmt_qubits(&self, qubits: &[QubitId]) -> String {
        qubits
            .iter()
            .map(|q| format!("q[{}]", q.0))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn fmt_selection(&self, selection: &QubitSelection) -> String {
        match selection {
            QubitSelection::All => "q".to_string(),
            QubitSelection::Subset(qubits) => self.fmt_qubits(qubits),
        }
    }

    fn fmt_observable(&self, observable: &Observable) -> String {
        match observable {
            Observable::Term(term) => term
                .factors()
                .iter()
                .map(|(q, p)| format!("{}(q[{}])", p.name(), q.0))
                .collect::<Vec<_>>()
                .join(" @ "),
            Observable::Sum(terms) => terms
                .iter()
                .map(|(coeff, term)| {
                    let term_text = self.fmt_observable(&Observable::Term(term.clone()));
                    if (coeff - 1.0).abs() > f64::EPSILON {
                        format!("{coeff} * {term_text}")
                    } else {
                        term_text
                    }
                })
                .collect::<Vec<_>>()
                .join(" + "),
        }
    }
}
