//! Pauli observables.
//!
//! Observables are the operators a measurement statistic refers to: a
//! single tensor product of per-qubit Pauli factors ([`PauliTerm`]), or a
//! real-weighted sum of such products ([`Observable::Sum`]). Both forms are
//! diagonal in the computational basis once the per-qubit rotation gates
//! returned by [`Observable::diagonalizing_gates`] have been applied, which
//! is what lets the rewriting passes reconstruct expectation values from
//! raw readout.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::Gate;
use crate::instruction::Instruction;
use crate::qubit::QubitId;

/// A single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pauli {
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
}

impl Pauli {
    /// Get the lowercase name of this operator.
    pub fn name(&self) -> &'static str {
        match self {
            Pauli::X => "x",
            Pauli::Y => "y",
            Pauli::Z => "z",
        }
    }

    /// Gates that rotate this operator's eigenbasis onto the computational
    /// basis, in circuit order.
    ///
    /// X is diagonalized by H; Y by Sdg followed by H; Z needs nothing.
    pub fn diagonalizing_gates(&self, qubit: QubitId) -> Vec<Instruction> {
        match self {
            Pauli::X => vec![Instruction::single(Gate::H, qubit)],
            Pauli::Y => vec![
                Instruction::single(Gate::Sdg, qubit),
                Instruction::single(Gate::H, qubit),
            ],
            Pauli::Z => vec![],
        }
    }
}

impl fmt::Display for Pauli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tensor product of single-qubit Pauli factors.
///
/// Factors are kept sorted by qubit and each qubit appears at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauliTerm {
    factors: Vec<(QubitId, Pauli)>,
}

impl PauliTerm {
    /// Create a term from factors. Factors are sorted by qubit.
    ///
    /// Returns an error if the factor list is empty or a qubit repeats.
    pub fn new(factors: impl IntoIterator<Item = (QubitId, Pauli)>) -> IrResult<Self> {
        let mut factors: Vec<_> = factors.into_iter().collect();
        if factors.is_empty() {
            return Err(IrError::EmptyObservable);
        }
        factors.sort_by_key(|(q, _)| *q);
        for pair in factors.windows(2) {
            if pair[0].0 == pair[1].0 {
                return Err(IrError::DuplicateQubit(pair[0].0));
            }
        }
        Ok(Self { factors })
    }

    /// Create a single-factor term.
    pub fn single(pauli: Pauli, qubit: QubitId) -> Self {
        Self {
            factors: vec![(qubit, pauli)],
        }
    }

    /// Pauli-X on one qubit.
    pub fn x(qubit: QubitId) -> Self {
        Self::single(Pauli::X, qubit)
    }

    /// Pauli-Y on one qubit.
    pub fn y(qubit: QubitId) -> Self {
        Self::single(Pauli::Y, qubit)
    }

    /// Pauli-Z on one qubit.
    pub fn z(qubit: QubitId) -> Self {
        Self::single(Pauli::Z, qubit)
    }

    /// Tensor this term with another (the `X(0) @ X(1)` product).
    ///
    /// Returns an error if the terms share a qubit.
    pub fn tensor(self, other: PauliTerm) -> IrResult<Self> {
        Self::new(self.factors.into_iter().chain(other.factors))
    }

    /// The factors, sorted by qubit.
    pub fn factors(&self) -> &[(QubitId, Pauli)] {
        &self.factors
    }

    /// The qubits this term acts on, sorted ascending.
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.factors.iter().map(|(q, _)| *q)
    }

    /// The Pauli factor on a given qubit, if any.
    pub fn basis_on(&self, qubit: QubitId) -> Option<Pauli> {
        self.factors
            .iter()
            .find(|(q, _)| *q == qubit)
            .map(|(_, p)| *p)
    }
}

impl fmt::Display for PauliTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (q, p)) in self.factors.iter().enumerate() {
            if i > 0 {
                f.write_str(" @ ")?;
            }
            write!(f, "{p}({q})")?;
        }
        Ok(())
    }
}

/// An observable a measurement statistic refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Observable {
    /// A single Pauli tensor product. Squares to the identity, so
    /// `Var = 1 - E²` holds.
    Term(PauliTerm),
    /// A real-weighted sum of Pauli tensor products.
    Sum(Vec<(f64, PauliTerm)>),
}

impl Observable {
    /// Build a sum observable.
    ///
    /// Returns an error if the term list is empty.
    pub fn sum(terms: impl IntoIterator<Item = (f64, PauliTerm)>) -> IrResult<Self> {
        let terms: Vec<_> = terms.into_iter().collect();
        if terms.is_empty() {
            return Err(IrError::EmptyObservable);
        }
        Ok(Observable::Sum(terms))
    }

    /// Whether this is a single Pauli tensor term.
    pub fn is_single_term(&self) -> bool {
        matches!(self, Observable::Term(_))
    }

    /// The `(coefficient, term)` pairs; a plain term yields itself with
    /// coefficient 1.
    pub fn terms(&self) -> Vec<(f64, &PauliTerm)> {
        match self {
            Observable::Term(t) => vec![(1.0, t)],
            Observable::Sum(terms) => terms.iter().map(|(c, t)| (*c, t)).collect(),
        }
    }

    /// The qubits this observable acts on, sorted ascending, deduplicated.
    pub fn qubits(&self) -> Vec<QubitId> {
        let mut qubits: Vec<QubitId> = self
            .terms()
            .into_iter()
            .flat_map(|(_, term)| term.qubits().collect::<Vec<_>>())
            .collect();
        qubits.sort();
        qubits.dedup();
        qubits
    }

    /// The measurement basis each qubit must be rotated into, sorted by
    /// qubit.
    ///
    /// Fails if two factors request different bases on the same qubit
    /// (the observable is not qubit-wise diagonalizable).
    pub fn basis_map(&self) -> IrResult<BTreeMap<QubitId, Pauli>> {
        let mut map = BTreeMap::new();
        for (_, term) in self.terms() {
            for (qubit, pauli) in term.factors() {
                match map.get(qubit) {
                    None => {
                        map.insert(*qubit, *pauli);
                    }
                    Some(existing) if existing == pauli => {}
                    Some(existing) => {
                        return Err(IrError::ConflictingBasis {
                            qubit: *qubit,
                            first: *existing,
                            second: *pauli,
                        });
                    }
                }
            }
        }
        Ok(map)
    }

    /// Gates that rotate every factor's eigenbasis onto the computational
    /// basis, in ascending qubit order.
    pub fn diagonalizing_gates(&self) -> IrResult<Vec<Instruction>> {
        let map = self.basis_map()?;
        Ok(map
            .into_iter()
            .flat_map(|(qubit, pauli)| pauli.diagonalizing_gates(qubit))
            .collect())
    }

    /// Qubit-wise commutation: two observables commute qubit-wise when no
    /// shared qubit carries different Pauli factors.
    pub fn qubit_wise_commutes(&self, other: &Observable) -> bool {
        for (_, term) in self.terms() {
            for (qubit, pauli) in term.factors() {
                for (_, other_term) in other.terms() {
                    if let Some(other_pauli) = other_term.basis_on(*qubit) {
                        if other_pauli != *pauli {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

impl From<PauliTerm> for Observable {
    fn from(term: PauliTerm) -> Self {
        Observable::Term(term)
    }
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observable::Term(t) => write!(f, "{t}"),
            Observable::Sum(terms) => {
                for (i, (coeff, term)) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" + ")?;
                    }
                    if (coeff - 1.0).abs() > f64::EPSILON {
                        write!(f, "{coeff} * ")?;
                    }
                    write!(f, "{term}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_sorted_and_deduplicated() {
        let term = PauliTerm::new([(QubitId(2), Pauli::X), (QubitId(0), Pauli::Y)]).unwrap();
        assert_eq!(
            term.factors(),
            &[(QubitId(0), Pauli::Y), (QubitId(2), Pauli::X)]
        );

        let dup = PauliTerm::new([(QubitId(1), Pauli::X), (QubitId(1), Pauli::Z)]);
        assert!(matches!(dup, Err(IrError::DuplicateQubit(_))));
    }

    #[test]
    fn test_tensor_product() {
        let xx = PauliTerm::x(QubitId(0)).tensor(PauliTerm::x(QubitId(1))).unwrap();
        assert_eq!(xx.qubits().collect::<Vec<_>>(), vec![QubitId(0), QubitId(1)]);

        let clash = PauliTerm::x(QubitId(0)).tensor(PauliTerm::z(QubitId(0)));
        assert!(clash.is_err());
    }

    #[test]
    fn test_diagonalizing_gates() {
        let obs = Observable::Term(PauliTerm::y(QubitId(1)));
        let gates = obs.diagonalizing_gates().unwrap();
        assert_eq!(gates.len(), 2);
        assert_eq!(gates[0].gate, Gate::Sdg);
        assert_eq!(gates[1].gate, Gate::H);

        let z_obs = Observable::Term(PauliTerm::z(QubitId(0)));
        assert!(z_obs.diagonalizing_gates().unwrap().is_empty());
    }

    #[test]
    fn test_basis_conflict() {
        let sum = Observable::sum([
            (1.0, PauliTerm::x(QubitId(0))),
            (0.5, PauliTerm::z(QubitId(0))),
        ])
        .unwrap();
        assert!(matches!(
            sum.basis_map(),
            Err(IrError::ConflictingBasis { .. })
        ));
    }

    #[test]
    fn test_qubit_wise_commutation() {
        let xx = Observable::Term(
            PauliTerm::x(QubitId(0)).tensor(PauliTerm::x(QubitId(1))).unwrap(),
        );
        let x2 = Observable::Term(PauliTerm::x(QubitId(2)));
        let y0 = Observable::Term(PauliTerm::y(QubitId(0)));

        assert!(xx.qubit_wise_commutes(&x2));
        assert!(!xx.qubit_wise_commutes(&y0));
    }

    #[test]
    fn test_sum_qubits_union() {
        let sum = Observable::sum([
            (1.0, PauliTerm::x(QubitId(0))),
            (1.0, PauliTerm::x(QubitId(1))),
        ])
        .unwrap();
        assert_eq!(sum.qubits(), vec![QubitId(0), QubitId(1)]);
    }

    #[test]
    fn test_display() {
        let xx = PauliTerm::x(QubitId(0)).tensor(PauliTerm::x(QubitId(1))).unwrap();
        assert_eq!(format!("{xx}"), "x(q0) @ x(q1)");
    }
}
