//! Rewrite plans: how raw readout reconstructs the original measurements.
//!
//! A [`RewritePlan`] is built once when a rewriting pass replaces a
//! circuit's measurement list, and consumed once when the raw results
//! come back. It records the readout register (the union of qubits the
//! original measurements needed) and, per original measurement, the
//! eigenvalue weighting or bit projection that recovers it.

use ndarray::Array2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use muninn_hal::{Counts, ExecutionResult, MeasurementOutcome, Samples, ShardResult};
use muninn_ir::{MeasurementKind, Observable, QubitId};

use crate::basis::{parity_eigenvalue, parity_eigenvalue_row, project_positions};
use crate::error::{RewriteError, RewriteResult};

/// The union readout register: sorted, deduplicated qubits, where the
/// first qubit is the most significant bit of every basis-state index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadoutRegister {
    qubits: Vec<QubitId>,
}

impl ReadoutRegister {
    /// Build a register from the union of required qubits.
    pub fn new(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        let mut qubits: Vec<QubitId> = qubits.into_iter().collect();
        qubits.sort();
        qubits.dedup();
        Self { qubits }
    }

    /// The register qubits, ascending.
    pub fn qubits(&self) -> &[QubitId] {
        &self.qubits
    }

    /// Register width in bits.
    pub fn width(&self) -> usize {
        self.qubits.len()
    }

    /// The bit position of a qubit (0 = most significant).
    pub fn position_of(&self, qubit: QubitId) -> Option<usize> {
        self.qubits.binary_search(&qubit).ok()
    }

    /// Bit positions of a qubit sequence, preserving the given order.
    pub fn positions_of(&self, qubits: &[QubitId]) -> RewriteResult<Vec<usize>> {
        qubits
            .iter()
            .map(|q| {
                self.position_of(*q)
                    .ok_or(RewriteError::QubitNotInRegister(*q))
            })
            .collect()
    }
}

/// An observable with its qubits resolved to register bit positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolvedObservable {
    /// A single Pauli tensor term. Squares to identity, so the variance
    /// shortcut `1 - E²` applies.
    Term(Vec<usize>),
    /// A weighted sum of terms; variance needs the full second moment.
    Sum(Vec<(f64, Vec<usize>)>),
}

impl ResolvedObservable {
    /// Resolve an observable's qubits against the readout register.
    pub fn resolve(observable: &Observable, register: &ReadoutRegister) -> RewriteResult<Self> {
        match observable {
            Observable::Term(term) => {
                let qubits: Vec<QubitId> = term.qubits().collect();
                Ok(ResolvedObservable::Term(register.positions_of(&qubits)?))
            }
            Observable::Sum(terms) => {
                let resolved = terms
                    .iter()
                    .map(|(coeff, term)| {
                        let qubits: Vec<QubitId> = term.qubits().collect();
                        Ok((*coeff, register.positions_of(&qubits)?))
                    })
                    .collect::<RewriteResult<Vec<_>>>()?;
                Ok(ResolvedObservable::Sum(resolved))
            }
        }
    }

    /// Whether this is a single Pauli tensor term (the `O² = I` case).
    pub fn is_single_term(&self) -> bool {
        matches!(self, ResolvedObservable::Term(_))
    }

    /// Eigenvalue at a basis-state index of the readout register.
    fn eigenvalue_at(&self, state: u64, width: usize) -> f64 {
        match self {
            ResolvedObservable::Term(positions) => parity_eigenvalue(state, positions, width),
            ResolvedObservable::Sum(terms) => terms
                .iter()
                .map(|(coeff, positions)| coeff * parity_eigenvalue(state, positions, width))
                .sum(),
        }
    }

    /// Eigenvalue of one readout row.
    fn eigenvalue_row(&self, row: &[u8]) -> f64 {
        match self {
            ResolvedObservable::Term(positions) => parity_eigenvalue_row(row, positions),
            ResolvedObservable::Sum(terms) => terms
                .iter()
                .map(|(coeff, positions)| coeff * parity_eigenvalue_row(row, positions))
                .sum(),
        }
    }
}

/// How one original measurement is recovered from raw readout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reconstruction {
    /// Eigenvalue-weighted mean.
    Expval(ResolvedObservable),
    /// `1 - E²` for single terms, second moment otherwise.
    Variance(ResolvedObservable),
    /// Marginal distribution over register positions, in request order.
    Probs(Vec<usize>),
    /// Frequencies re-bucketed by eigenvalue.
    CountsEigenvalues(ResolvedObservable),
    /// Frequencies marginalized onto register positions.
    CountsBits(Vec<usize>),
    /// Per-shot eigenvalue sequence.
    SampleEigenvalues(ResolvedObservable),
    /// Raw bit columns at register positions, shot order preserved.
    SampleBits(Vec<usize>),
}

/// The complete reconstruction recipe for one rewritten circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewritePlan {
    register: ReadoutRegister,
    readout: MeasurementKind,
    reconstructions: Vec<Reconstruction>,
}

impl RewritePlan {
    pub(crate) fn new(
        register: ReadoutRegister,
        readout: MeasurementKind,
        reconstructions: Vec<Reconstruction>,
    ) -> Self {
        Self {
            register,
            readout,
            reconstructions,
        }
    }

    /// The readout register.
    pub fn register(&self) -> &ReadoutRegister {
        &self.register
    }

    /// The raw readout kind this plan consumes.
    pub fn readout(&self) -> MeasurementKind {
        self.readout
    }

    /// The per-measurement reconstruction recipes.
    pub fn reconstructions(&self) -> &[Reconstruction] {
        &self.reconstructions
    }

    /// Reconstruct the original measurement values from raw results, one
    /// shard per shot-vector entry.
    pub fn reconstruct(&self, result: &ExecutionResult) -> RewriteResult<Vec<ShardResult>> {
        result
            .shards
            .iter()
            .map(|shard| {
                let outcomes = match (self.readout, shard.outcomes.as_slice()) {
                    (MeasurementKind::Counts, [MeasurementOutcome::Counts(counts)]) => {
                        if counts.num_qubits() != self.register.width() {
                            return Err(RewriteError::ShapeMismatch(format!(
                                "counts over {} qubits, register has {}",
                                counts.num_qubits(),
                                self.register.width()
                            )));
                        }
                        self.reconstructions
                            .iter()
                            .map(|rec| self.from_counts(counts, rec))
                            .collect::<RewriteResult<Vec<_>>>()?
                    }
                    (MeasurementKind::Sample, [MeasurementOutcome::Samples(samples)]) => {
                        if samples.num_qubits() != self.register.width() {
                            return Err(RewriteError::ShapeMismatch(format!(
                                "samples over {} qubits, register has {}",
                                samples.num_qubits(),
                                self.register.width()
                            )));
                        }
                        self.reconstructions
                            .iter()
                            .map(|rec| self.from_samples(samples, rec))
                            .collect::<RewriteResult<Vec<_>>>()?
                    }
                    _ => {
                        return Err(RewriteError::ShapeMismatch(format!(
                            "expected one raw {} outcome per shard",
                            self.readout
                        )));
                    }
                };
                Ok(ShardResult {
                    shots: shard.shots,
                    outcomes,
                })
            })
            .collect()
    }

    fn from_counts(
        &self,
        counts: &Counts,
        reconstruction: &Reconstruction,
    ) -> RewriteResult<MeasurementOutcome> {
        let width = self.register.width();
        let total = counts.total() as f64;

        match reconstruction {
            Reconstruction::Expval(obs) => {
                let mean = counts
                    .iter()
                    .map(|(state, c)| obs.eigenvalue_at(state, width) * c as f64)
                    .sum::<f64>()
                    / total;
                Ok(MeasurementOutcome::Scalar(mean))
            }

            Reconstruction::Variance(obs) => {
                let mut mean = 0.0;
                let mut second = 0.0;
                for (state, c) in counts.iter() {
                    let eig = obs.eigenvalue_at(state, width);
                    let weight = c as f64 / total;
                    mean += weight * eig;
                    second += weight * eig * eig;
                }
                // A single Pauli term squares to identity: second == 1.
                let variance = if obs.is_single_term() {
                    1.0 - mean * mean
                } else {
                    second - mean * mean
                };
                Ok(MeasurementOutcome::Scalar(variance))
            }

            Reconstruction::Probs(positions) => {
                let mut probs = vec![0.0; 1 << positions.len()];
                for (state, c) in counts.iter() {
                    let idx = project_positions(state, positions, width) as usize;
                    probs[idx] += c as f64 / total;
                }
                Ok(MeasurementOutcome::Vector(probs))
            }

            Reconstruction::CountsEigenvalues(obs) => {
                let buckets = counts
                    .iter()
                    .map(|(state, c)| (obs.eigenvalue_at(state, width), c));
                let (eigvals, counts) = bucket_eigenvalues(buckets);
                Ok(MeasurementOutcome::EigenCounts { eigvals, counts })
            }

            Reconstruction::CountsBits(positions) => {
                let mut marginal = Counts::new(positions.len());
                for (state, c) in counts.iter() {
                    marginal.insert(project_positions(state, positions, width), c);
                }
                Ok(MeasurementOutcome::Counts(marginal))
            }

            Reconstruction::SampleEigenvalues(_) | Reconstruction::SampleBits(_) => {
                Err(RewriteError::ShapeMismatch(
                    "sample reconstruction from counts readout".into(),
                ))
            }
        }
    }

    fn from_samples(
        &self,
        samples: &Samples,
        reconstruction: &Reconstruction,
    ) -> RewriteResult<MeasurementOutcome> {
        let shots = samples.shots();
        let rows: Vec<Vec<u8>> = (0..shots).map(|s| samples.row(s)).collect();

        match reconstruction {
            Reconstruction::Expval(obs) => {
                let mean = rows.iter().map(|row| obs.eigenvalue_row(row)).sum::<f64>()
                    / shots as f64;
                Ok(MeasurementOutcome::Scalar(mean))
            }

            Reconstruction::Variance(obs) => {
                let eigenvalues: Vec<f64> =
                    rows.iter().map(|row| obs.eigenvalue_row(row)).collect();
                let mean = eigenvalues.iter().sum::<f64>() / shots as f64;
                let variance = if obs.is_single_term() {
                    1.0 - mean * mean
                } else {
                    // Population variance of the per-shot eigenvalues.
                    eigenvalues.iter().map(|e| e * e).sum::<f64>() / shots as f64 - mean * mean
                };
                Ok(MeasurementOutcome::Scalar(variance))
            }

            Reconstruction::Probs(positions) => {
                let mut probs = vec![0.0; 1 << positions.len()];
                for row in &rows {
                    let idx = positions
                        .iter()
                        .fold(0usize, |acc, &p| (acc << 1) | row[p] as usize);
                    probs[idx] += 1.0 / shots as f64;
                }
                Ok(MeasurementOutcome::Vector(probs))
            }

            Reconstruction::SampleEigenvalues(obs) => Ok(MeasurementOutcome::EigenSamples(
                rows.iter().map(|row| obs.eigenvalue_row(row)).collect(),
            )),

            Reconstruction::SampleBits(positions) => {
                let mut data = Array2::<u8>::zeros((shots, positions.len()));
                for (shot, row) in rows.iter().enumerate() {
                    for (col, &p) in positions.iter().enumerate() {
                        data[(shot, col)] = row[p];
                    }
                }
                Ok(MeasurementOutcome::Samples(Samples::new(data)))
            }

            Reconstruction::CountsEigenvalues(_) | Reconstruction::CountsBits(_) => {
                Err(RewriteError::ShapeMismatch(
                    "counts reconstruction from sample readout".into(),
                ))
            }
        }
    }
}

/// Bucket `(eigenvalue, count)` pairs into parallel sequences, ascending
/// by eigenvalue. Eigenvalues are keyed at fixed scale so equal values
/// coming from float arithmetic land in one bucket.
fn bucket_eigenvalues(
    entries: impl Iterator<Item = (f64, u64)>,
) -> (Vec<f64>, Vec<u64>) {
    let mut buckets: FxHashMap<i64, u64> = FxHashMap::default();
    for (eig, count) in entries {
        *buckets.entry((eig * 1e9).round() as i64).or_insert(0) += count;
    }
    let mut sorted: Vec<(i64, u64)> = buckets.into_iter().collect();
    sorted.sort_by_key(|(k, _)| *k);
    (
        sorted.iter().map(|(k, _)| *k as f64 / 1e9).collect(),
        sorted.iter().map(|(_, c)| *c).collect(),
    )
}
