//! Splitting transforms: restructure measurement lists a device cannot
//! accept as one circuit.
//!
//! [`SplitToSingleTerms`] expands sum-observable expectations into
//! per-term expectations inside the same circuit. [`SplitNonCommuting`]
//! additionally partitions the measurement list into qubit-wise commuting
//! groups, producing one circuit per group. Both record the recombination
//! that restores the original measurement order and sum weights.

use std::collections::BTreeMap;

use tracing::debug;

use muninn_ir::{Circuit, Measurement, Observable, Pauli, QubitId};

use crate::batch::{PostStep, SlotSource, TapeBatch};
use crate::error::{RewriteError, RewriteResult};
use crate::passes::{RewritePass, basis_demands};
use crate::program::TransformKind;

/// Expand sum-observable expectations into single-term expectations.
pub struct SplitToSingleTerms;

impl RewritePass for SplitToSingleTerms {
    fn name(&self) -> &'static str {
        "split_to_single_terms"
    }

    fn kind(&self) -> TransformKind {
        TransformKind::SplitToSingleTerms
    }

    fn apply(&self, batch: &mut TapeBatch) -> RewriteResult<()> {
        let circuit = single_circuit(batch)?;

        let (slots, pending) = expand_sum_expectations(circuit.measurements());
        let sources = pending
            .into_iter()
            .map(|p| p.into_source(|slot| (0, slot)))
            .collect();

        circuit.replace_measurements(slots);
        batch.push_post(PostStep::Recombine { sources });
        Ok(())
    }
}

/// Partition measurements into qubit-wise commuting groups, one circuit
/// per group. Sum expectations are distributed term-wise first, so terms
/// may land in different groups.
pub struct SplitNonCommuting;

impl RewritePass for SplitNonCommuting {
    fn name(&self) -> &'static str {
        "split_non_commuting"
    }

    fn kind(&self) -> TransformKind {
        TransformKind::SplitNonCommuting
    }

    fn apply(&self, batch: &mut TapeBatch) -> RewriteResult<()> {
        let circuit = single_circuit(batch)?;
        let num_qubits = circuit.num_qubits();

        let (slots, pending) = expand_sum_expectations(circuit.measurements());

        // Greedy grouping: place each slot in the first group whose basis
        // demands are compatible qubit-wise.
        let mut groups: Vec<Group> = vec![];
        let mut locations: Vec<(usize, usize)> = Vec::with_capacity(slots.len());
        for slot in &slots {
            let demands = basis_demands(slot, num_qubits)?;
            let group_idx = groups
                .iter()
                .position(|g| g.accepts(&demands))
                .unwrap_or_else(|| {
                    groups.push(Group::default());
                    groups.len() - 1
                });
            let group = &mut groups[group_idx];
            group.basis.extend(demands);
            locations.push((group_idx, group.members.len()));
            group.members.push(slot.clone());
        }

        debug!(
            groups = groups.len(),
            slots = slots.len(),
            "partitioned measurements into commuting groups"
        );

        let name = circuit.name().to_string();
        let prelude = circuit.clone();
        let group_circuits = groups
            .into_iter()
            .enumerate()
            .map(|(g, group)| {
                let mut tape = prelude.clone_prelude(format!("{name}_group_{g}"));
                for measurement in group.members {
                    tape.measure(measurement)?;
                }
                Ok(tape)
            })
            .collect::<RewriteResult<Vec<_>>>()?;

        let sources = pending
            .into_iter()
            .map(|p| p.into_source(|slot| locations[slot]))
            .collect();

        *batch.circuits_mut() = group_circuits;
        batch.push_post(PostStep::Recombine { sources });
        Ok(())
    }
}

/// A commuting group under construction.
#[derive(Default)]
struct Group {
    basis: BTreeMap<QubitId, Pauli>,
    members: Vec<Measurement>,
}

impl Group {
    fn accepts(&self, demands: &BTreeMap<QubitId, Pauli>) -> bool {
        demands
            .iter()
            .all(|(qubit, pauli)| self.basis.get(qubit).is_none_or(|p| p == pauli))
    }
}

/// How an original measurement maps onto expanded slots.
enum Pending {
    Direct(usize),
    Weighted(Vec<(usize, f64)>),
}

impl Pending {
    /// Resolve slot indices to `(circuit, slot)` locations.
    fn into_source(self, locate: impl Fn(usize) -> (usize, usize)) -> SlotSource {
        match self {
            Pending::Direct(slot) => {
                let (circuit, slot) = locate(slot);
                SlotSource::Direct { circuit, slot }
            }
            Pending::Weighted(parts) => SlotSource::WeightedSum {
                parts: parts
                    .into_iter()
                    .map(|(slot, coeff)| {
                        let (circuit, slot) = locate(slot);
                        (circuit, slot, coeff)
                    })
                    .collect(),
            },
        }
    }
}

/// Expand `Expval(Sum)` requests into per-term slots; everything else
/// passes through unchanged.
fn expand_sum_expectations(measurements: &[Measurement]) -> (Vec<Measurement>, Vec<Pending>) {
    let mut slots = vec![];
    let mut pending = vec![];
    for measurement in measurements {
        match measurement {
            Measurement::Expval(Observable::Sum(terms)) => {
                let parts = terms
                    .iter()
                    .map(|(coeff, term)| {
                        let slot = slots.len();
                        slots.push(Measurement::Expval(Observable::Term(term.clone())));
                        (slot, *coeff)
                    })
                    .collect();
                pending.push(Pending::Weighted(parts));
            }
            other => {
                let slot = slots.len();
                slots.push(other.clone());
                pending.push(Pending::Direct(slot));
            }
        }
    }
    (slots, pending)
}

fn single_circuit(batch: &mut TapeBatch) -> RewriteResult<&mut Circuit> {
    let circuits = batch.circuits_mut();
    if circuits.len() != 1 {
        return Err(RewriteError::ShapeMismatch(
            "splitting transforms must run before the batch fans out".into(),
        ));
    }
    Ok(&mut circuits[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_ir::{MeasurementKind, PauliTerm};

    #[test]
    fn test_split_to_single_terms_expands_sums() {
        let mut circuit = Circuit::new("sum", 2);
        circuit
            .expval(
                Observable::sum([
                    (1.0, PauliTerm::x(QubitId(0))),
                    (1.0, PauliTerm::x(QubitId(1))),
                ])
                .unwrap(),
            )
            .unwrap();
        circuit.expval(PauliTerm::y(QubitId(0))).unwrap();

        let mut batch = TapeBatch::new(circuit);
        SplitToSingleTerms.apply(&mut batch).unwrap();

        assert_eq!(batch.circuits().len(), 1);
        let measurements = batch.circuits()[0].measurements();
        assert_eq!(measurements.len(), 3);
        assert!(measurements.iter().all(|m| m.kind() == MeasurementKind::Expval));

        match &batch.post_steps()[0] {
            PostStep::Recombine { sources } => {
                assert_eq!(sources.len(), 2);
                assert!(matches!(sources[0], SlotSource::WeightedSum { .. }));
                assert!(matches!(sources[1], SlotSource::Direct { .. }));
            }
            other => panic!("expected recombine step, got {other:?}"),
        }
    }

    #[test]
    fn test_split_non_commuting_groups_by_basis() {
        let mut circuit = Circuit::new("nc", 2);
        circuit
            .expval(PauliTerm::x(QubitId(0)).tensor(PauliTerm::x(QubitId(1))).unwrap())
            .unwrap();
        circuit.expval(PauliTerm::y(QubitId(0))).unwrap();

        let mut batch = TapeBatch::new(circuit);
        SplitNonCommuting.apply(&mut batch).unwrap();

        // X0 X1 and Y0 clash on qubit 0: two groups.
        assert_eq!(batch.circuits().len(), 2);
        assert_eq!(batch.circuits()[0].measurements().len(), 1);
        assert_eq!(batch.circuits()[1].measurements().len(), 1);
        assert_eq!(batch.circuits()[0].name(), "nc_group_0");
    }

    #[test]
    fn test_split_non_commuting_keeps_commuting_together() {
        let mut circuit = Circuit::new("comm", 3);
        circuit
            .expval(PauliTerm::x(QubitId(0)).tensor(PauliTerm::x(QubitId(1))).unwrap())
            .unwrap();
        circuit.expval(PauliTerm::x(QubitId(2))).unwrap();

        let mut batch = TapeBatch::new(circuit);
        SplitNonCommuting.apply(&mut batch).unwrap();

        assert_eq!(batch.circuits().len(), 1);
        assert_eq!(batch.circuits()[0].measurements().len(), 2);
    }

    #[test]
    fn test_split_non_commuting_distributes_sum_terms() {
        // X0 + Y0 cannot share a basis: the sum's terms land in separate
        // groups with a weighted recombination.
        let mut circuit = Circuit::new("sum_nc", 1);
        circuit
            .expval(
                Observable::sum([
                    (1.0, PauliTerm::x(QubitId(0))),
                    (1.0, PauliTerm::y(QubitId(0))),
                ])
                .unwrap(),
            )
            .unwrap();

        let mut batch = TapeBatch::new(circuit);
        SplitNonCommuting.apply(&mut batch).unwrap();

        assert_eq!(batch.circuits().len(), 2);
        match &batch.post_steps()[0] {
            PostStep::Recombine { sources } => match &sources[0] {
                SlotSource::WeightedSum { parts } => {
                    assert_eq!(parts.len(), 2);
                    assert_eq!(parts[0].0, 0);
                    assert_eq!(parts[1].0, 1);
                }
                other => panic!("expected weighted sum, got {other:?}"),
            },
            other => panic!("expected recombine step, got {other:?}"),
        }
    }

    #[test]
    fn test_wire_readout_demands_z_basis() {
        // probs(q0) pins q0 to Z, so it cannot share a group with X0.
        let mut circuit = Circuit::new("mixed", 1);
        circuit.expval(PauliTerm::x(QubitId(0))).unwrap();
        circuit
            .probs(muninn_ir::QubitSelection::Subset(vec![QubitId(0)]))
            .unwrap();

        let mut batch = TapeBatch::new(circuit);
        SplitNonCommuting.apply(&mut batch).unwrap();
        assert_eq!(batch.circuits().len(), 2);
    }
}
