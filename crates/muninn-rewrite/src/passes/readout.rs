//! Readout rewrites: replace analytic measurement lists with one raw
//! counts or sample request, recording how to reconstruct the originals.

use std::collections::BTreeMap;

use tracing::debug;

use muninn_ir::{
    Circuit, IrError, Measurement, MeasurementKind, Pauli, QubitId, QubitSelection,
    ReadoutTarget,
};

use crate::batch::{PostStep, TapeBatch};
use crate::error::{RewriteError, RewriteResult};
use crate::passes::{RewritePass, basis_demands};
use crate::plan::{ReadoutRegister, Reconstruction, ResolvedObservable, RewritePlan};
use crate::program::TransformKind;

/// Rewrite a circuit's measurements into one raw counts request over the
/// union of required qubits.
///
/// Fails with [`RewriteError::UnsupportedMeasurement`] if the list holds
/// a sample request; the counts axis cannot express per-shot data. The
/// circuit is left untouched on any failure.
pub fn measurements_from_counts(circuit: &mut Circuit) -> RewriteResult<RewritePlan> {
    rewrite_readout(circuit, MeasurementKind::Counts, "measurements_from_counts")
}

/// Rewrite a circuit's measurements into one raw per-shot sample request
/// over the union of required qubits.
///
/// Fails with [`RewriteError::UnsupportedMeasurement`] if the list holds
/// a counts request. The circuit is left untouched on any failure.
pub fn measurements_from_samples(circuit: &mut Circuit) -> RewriteResult<RewritePlan> {
    rewrite_readout(circuit, MeasurementKind::Sample, "measurements_from_samples")
}

fn rewrite_readout(
    circuit: &mut Circuit,
    readout: MeasurementKind,
    transform: &'static str,
) -> RewriteResult<RewritePlan> {
    let measurements = circuit.measurements().to_vec();
    if measurements.is_empty() {
        return Err(RewriteError::NoMeasurements);
    }

    // Everything below up to the commit point only inspects the circuit,
    // so a failing call leaves it unmodified.
    let forbidden = match readout {
        MeasurementKind::Counts => MeasurementKind::Sample,
        _ => MeasurementKind::Counts,
    };
    if measurements.iter().any(|m| m.kind() == forbidden) {
        return Err(RewriteError::UnsupportedMeasurement {
            kind: forbidden,
            transform,
        });
    }

    let register = ReadoutRegister::new(
        measurements
            .iter()
            .flat_map(|m| m.support(circuit.num_qubits())),
    );

    // Merge the per-measurement basis demands (observables pin their
    // Pauli bases, computational-basis readout pins Z). A conflict means
    // the measurement set is not qubit-wise commuting; splitting must
    // have run first.
    let mut basis: BTreeMap<QubitId, Pauli> = BTreeMap::new();
    for measurement in &measurements {
        for (qubit, pauli) in basis_demands(measurement, circuit.num_qubits())? {
            match basis.get(&qubit) {
                None => {
                    basis.insert(qubit, pauli);
                }
                Some(existing) if *existing == pauli => {}
                Some(existing) => {
                    return Err(IrError::ConflictingBasis {
                        qubit,
                        first: *existing,
                        second: pauli,
                    }
                    .into());
                }
            }
        }
    }

    let reconstructions = measurements
        .iter()
        .map(|m| build_reconstruction(m, &register, circuit.num_qubits()))
        .collect::<RewriteResult<Vec<_>>>()?;

    // Commit: rotate into the joint measurement basis, then swap the
    // measurement list for the raw readout request.
    for (qubit, pauli) in &basis {
        for instruction in pauli.diagonalizing_gates(*qubit) {
            circuit.apply(instruction)?;
        }
    }

    let target = ReadoutTarget::Qubits(QubitSelection::Subset(register.qubits().to_vec()));
    let raw_request = match readout {
        MeasurementKind::Counts => Measurement::Counts(target),
        _ => Measurement::Sample(target),
    };
    circuit.replace_measurements(vec![raw_request]);

    debug!(
        register_width = register.width(),
        readout = %readout,
        "rewrote {} measurements to raw readout",
        reconstructions.len()
    );

    Ok(RewritePlan::new(register, readout, reconstructions))
}

fn build_reconstruction(
    measurement: &Measurement,
    register: &ReadoutRegister,
    num_qubits: u32,
) -> RewriteResult<Reconstruction> {
    match measurement {
        Measurement::Expval(obs) => Ok(Reconstruction::Expval(ResolvedObservable::resolve(
            obs, register,
        )?)),
        Measurement::Var(obs) => Ok(Reconstruction::Variance(ResolvedObservable::resolve(
            obs, register,
        )?)),
        Measurement::Probs(selection) => {
            let qubits = selection.resolve(num_qubits);
            Ok(Reconstruction::Probs(register.positions_of(&qubits)?))
        }
        Measurement::Counts(ReadoutTarget::Observable(obs)) => Ok(
            Reconstruction::CountsEigenvalues(ResolvedObservable::resolve(obs, register)?),
        ),
        Measurement::Counts(ReadoutTarget::Qubits(selection)) => {
            let qubits = selection.resolve(num_qubits);
            Ok(Reconstruction::CountsBits(register.positions_of(&qubits)?))
        }
        Measurement::Sample(ReadoutTarget::Observable(obs)) => Ok(
            Reconstruction::SampleEigenvalues(ResolvedObservable::resolve(obs, register)?),
        ),
        Measurement::Sample(ReadoutTarget::Qubits(selection)) => {
            let qubits = selection.resolve(num_qubits);
            Ok(Reconstruction::SampleBits(register.positions_of(&qubits)?))
        }
    }
}

/// The counts-readout rewriting transform.
pub struct MeasurementsFromCounts;

impl RewritePass for MeasurementsFromCounts {
    fn name(&self) -> &'static str {
        "measurements_from_counts"
    }

    fn kind(&self) -> TransformKind {
        TransformKind::MeasurementsFromCounts
    }

    fn apply(&self, batch: &mut TapeBatch) -> RewriteResult<()> {
        let plans = batch
            .circuits_mut()
            .iter_mut()
            .map(measurements_from_counts)
            .collect::<RewriteResult<Vec<_>>>()?;
        batch.push_post(PostStep::Readout { plans });
        Ok(())
    }
}

/// The samples-readout rewriting transform.
pub struct MeasurementsFromSamples;

impl RewritePass for MeasurementsFromSamples {
    fn name(&self) -> &'static str {
        "measurements_from_samples"
    }

    fn kind(&self) -> TransformKind {
        TransformKind::MeasurementsFromSamples
    }

    fn apply(&self, batch: &mut TapeBatch) -> RewriteResult<()> {
        let plans = batch
            .circuits_mut()
            .iter_mut()
            .map(measurements_from_samples)
            .collect::<RewriteResult<Vec<_>>>()?;
        batch.push_post(PostStep::Readout { plans });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_ir::{Gate, Observable, PauliTerm, emit};

    fn four_qubit_circuit() -> Circuit {
        let theta = 1.9_f64;
        let mut circuit = Circuit::new("basic", 4);
        circuit.ry(theta, QubitId(0)).unwrap();
        circuit.ry(theta / 2.0, QubitId(1)).unwrap();
        circuit.ry(2.0 * theta, QubitId(2)).unwrap();
        circuit.ry(theta, QubitId(3)).unwrap();
        circuit
            .expval(PauliTerm::x(QubitId(0)).tensor(PauliTerm::x(QubitId(1))).unwrap())
            .unwrap();
        circuit.var(PauliTerm::x(QubitId(2))).unwrap();
        circuit
            .probs(QubitSelection::Subset(vec![QubitId(3)]))
            .unwrap();
        circuit
    }

    #[test]
    fn test_counts_rewrite_replaces_measurement_list() {
        let mut circuit = four_qubit_circuit();
        let plan = measurements_from_counts(&mut circuit).unwrap();

        assert_eq!(circuit.measurements().len(), 1);
        assert_eq!(circuit.measurements()[0].kind(), MeasurementKind::Counts);
        assert_eq!(plan.readout(), MeasurementKind::Counts);
        assert_eq!(plan.reconstructions().len(), 3);
        // Union of X0 X1, X2, and q3: the full register.
        assert_eq!(
            plan.register().qubits(),
            &[QubitId(0), QubitId(1), QubitId(2), QubitId(3)]
        );
    }

    #[test]
    fn test_rewrite_appends_diagonalizing_rotations() {
        let mut circuit = four_qubit_circuit();
        let gates_before = circuit.num_ops();
        measurements_from_counts(&mut circuit).unwrap();

        // One H per X-basis qubit (q0, q1, q2); q3 is read in Z.
        assert_eq!(circuit.num_ops(), gates_before + 3);
        let appended: Vec<_> = circuit.ops()[gates_before..]
            .iter()
            .map(|i| (i.gate.clone(), i.qubits[0]))
            .collect();
        assert_eq!(
            appended,
            vec![
                (Gate::H, QubitId(0)),
                (Gate::H, QubitId(1)),
                (Gate::H, QubitId(2)),
            ]
        );
    }

    #[test]
    fn test_emitted_text_contains_only_readout_opcode() {
        let mut circuit = four_qubit_circuit();

        let before = emit::emit(&circuit);
        assert!(before.contains("expval"));
        assert!(before.contains("var"));

        measurements_from_counts(&mut circuit).unwrap();
        let after = emit::emit(&circuit);
        assert!(!after.contains("expval"));
        assert!(!after.contains("var"));
        assert!(!after.contains("probs"));
        assert!(after.contains("counts"));
    }

    #[test]
    fn test_counts_rewrite_rejects_sample_request() {
        let mut circuit = Circuit::new("bad", 2);
        circuit.rx(0.4, QubitId(0)).unwrap();
        circuit.sample(ReadoutTarget::all()).unwrap();

        let snapshot = circuit.clone();
        let err = measurements_from_counts(&mut circuit).unwrap_err();
        assert_eq!(
            err.to_string(),
            "sample measurements are not implemented with measurements_from_counts"
        );
        // No mutation is committed on failure.
        assert_eq!(circuit, snapshot);
    }

    #[test]
    fn test_samples_rewrite_rejects_counts_request() {
        let mut circuit = Circuit::new("bad", 2);
        circuit.rx(0.4, QubitId(0)).unwrap();
        circuit.counts(ReadoutTarget::all()).unwrap();

        let err = measurements_from_samples(&mut circuit).unwrap_err();
        assert_eq!(
            err.to_string(),
            "counts measurements are not implemented with measurements_from_samples"
        );
    }

    #[test]
    fn test_rewrite_requires_measurements() {
        let mut circuit = Circuit::new("empty", 2);
        assert!(matches!(
            measurements_from_counts(&mut circuit),
            Err(RewriteError::NoMeasurements)
        ));
    }

    #[test]
    fn test_conflicting_bases_rejected() {
        let mut circuit = Circuit::new("clash", 2);
        circuit.expval(PauliTerm::x(QubitId(0))).unwrap();
        circuit.expval(PauliTerm::y(QubitId(0))).unwrap();

        let err = measurements_from_counts(&mut circuit).unwrap_err();
        assert!(matches!(
            err,
            RewriteError::Ir(IrError::ConflictingBasis { .. })
        ));
    }

    #[test]
    fn test_samples_rewrite_default_support_is_all_qubits() {
        let mut circuit = Circuit::new("all", 3);
        circuit.sample(ReadoutTarget::all()).unwrap();

        let plan = measurements_from_samples(&mut circuit).unwrap();
        assert_eq!(plan.register().width(), 3);
        assert!(matches!(
            plan.reconstructions()[0],
            Reconstruction::SampleBits(_)
        ));
    }

    #[test]
    fn test_sum_observable_resolved() {
        let mut circuit = Circuit::new("sum", 2);
        circuit
            .expval(
                Observable::sum([
                    (1.0, PauliTerm::x(QubitId(0))),
                    (0.5, PauliTerm::x(QubitId(1))),
                ])
                .unwrap(),
            )
            .unwrap();

        let plan = measurements_from_counts(&mut circuit).unwrap();
        match &plan.reconstructions()[0] {
            Reconstruction::Expval(ResolvedObservable::Sum(terms)) => {
                assert_eq!(terms.len(), 2);
            }
            other => panic!("expected resolved sum, got {other:?}"),
        }
    }
}
