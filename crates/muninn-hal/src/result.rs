//! Execution results.
//!
//! A backend returns one [`ShardResult`] per shot-vector entry, each
//! holding one [`MeasurementOutcome`] per terminal measurement of the
//! executed circuit. Raw readout arrives as [`Counts`] (aggregated) or
//! [`Samples`] (itemized, shots × qubits); analytic backends return
//! scalars and vectors directly.

use ndarray::Array2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Aggregated readout frequencies over a qubit register.
///
/// Keys are basis-state indices where the first (lowest-id) qubit of the
/// register is the most significant bit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// Number of qubits in the readout register.
    num_qubits: usize,
    /// Basis-state index → frequency. Absent entries have count zero.
    counts: FxHashMap<u64, u64>,
}

impl Counts {
    /// Create an empty counts table over a register.
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            counts: FxHashMap::default(),
        }
    }

    /// Register width.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Record one observation of a basis state.
    pub fn record(&mut self, state: u64) {
        *self.counts.entry(state).or_insert(0) += 1;
    }

    /// Add `count` observations of a basis state.
    pub fn insert(&mut self, state: u64, count: u64) {
        if count > 0 {
            *self.counts.entry(state).or_insert(0) += count;
        }
    }

    /// Frequency of a basis state.
    pub fn get(&self, state: u64) -> u64 {
        self.counts.get(&state).copied().unwrap_or(0)
    }

    /// Total observations.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct observed basis states.
    pub fn num_states(&self) -> usize {
        self.counts.len()
    }

    /// Iterate over observed `(state, count)` entries, unordered.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.counts.iter().map(|(&s, &c)| (s, c))
    }

    /// Parallel `(states, counts)` sequences over the full basis-state
    /// range `0..2^n`, including zero-count entries, in ascending order.
    pub fn to_dense_pairs(&self) -> (Vec<u64>, Vec<u64>) {
        let size = 1u64 << self.num_qubits;
        let states: Vec<u64> = (0..size).collect();
        let counts: Vec<u64> = states.iter().map(|&s| self.get(s)).collect();
        (states, counts)
    }

    /// Observed entries as zero-padded binary strings, ascending by
    /// basis-state index, zero-count entries dropped.
    pub fn to_bitstring_pairs(&self) -> Vec<(String, u64)> {
        let mut entries: Vec<(u64, u64)> = self
            .counts
            .iter()
            .filter(|&(_, &c)| c > 0)
            .map(|(&s, &c)| (s, c))
            .collect();
        entries.sort_by_key(|(s, _)| *s);
        entries
            .into_iter()
            .map(|(s, c)| (format!("{s:0width$b}", width = self.num_qubits), c))
            .collect()
    }

    /// The most frequently observed basis state.
    pub fn most_frequent(&self) -> Option<(u64, u64)> {
        self.counts
            .iter()
            .max_by_key(|&(_, &c)| c)
            .map(|(&s, &c)| (s, c))
    }
}

/// Itemized per-shot readout: a shots × qubits bit matrix.
///
/// Row order is shot order; column order follows the readout register
/// (ascending qubit id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Samples {
    data: Array2<u8>,
}

impl Samples {
    /// Wrap a shots × qubits bit matrix.
    pub fn new(data: Array2<u8>) -> Self {
        Self { data }
    }

    /// Number of shots (rows).
    pub fn shots(&self) -> usize {
        self.data.nrows()
    }

    /// Register width (columns).
    pub fn num_qubits(&self) -> usize {
        self.data.ncols()
    }

    /// The underlying bit matrix.
    pub fn data(&self) -> &Array2<u8> {
        &self.data
    }

    /// One shot's bits, in register order.
    pub fn row(&self, shot: usize) -> Vec<u8> {
        self.data.row(shot).to_vec()
    }

    /// The basis-state index observed in one shot (first column most
    /// significant).
    pub fn state(&self, shot: usize) -> u64 {
        self.data
            .row(shot)
            .iter()
            .fold(0u64, |acc, &bit| (acc << 1) | u64::from(bit))
    }

    /// Aggregate the samples into a counts table.
    pub fn to_counts(&self) -> Counts {
        let mut counts = Counts::new(self.num_qubits());
        for shot in 0..self.shots() {
            counts.record(self.state(shot));
        }
        counts
    }
}

/// One reconstructed or native measurement value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeasurementOutcome {
    /// A scalar statistic (expectation value, variance).
    Scalar(f64),
    /// A fixed-length vector (probability distribution).
    Vector(Vec<f64>),
    /// Basis-state readout frequencies.
    Counts(Counts),
    /// Eigenvalue-bucketed frequencies for an observable readout, as
    /// parallel `(eigenvalues, counts)` sequences, ascending by eigenvalue.
    EigenCounts {
        /// Distinct eigenvalues.
        eigvals: Vec<f64>,
        /// Frequency per eigenvalue.
        counts: Vec<u64>,
    },
    /// Raw per-shot bits.
    Samples(Samples),
    /// Per-shot observable eigenvalues, in shot order.
    EigenSamples(Vec<f64>),
}

impl MeasurementOutcome {
    /// The scalar value, if this outcome is one.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            MeasurementOutcome::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// The vector value, if this outcome is one.
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            MeasurementOutcome::Vector(v) => Some(v),
            _ => None,
        }
    }

    /// The counts table, if this outcome is one.
    pub fn as_counts(&self) -> Option<&Counts> {
        match self {
            MeasurementOutcome::Counts(c) => Some(c),
            _ => None,
        }
    }

    /// The samples matrix, if this outcome is one.
    pub fn as_samples(&self) -> Option<&Samples> {
        match self {
            MeasurementOutcome::Samples(s) => Some(s),
            _ => None,
        }
    }
}

/// Results for one shot-vector shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardResult {
    /// Shots executed for this shard.
    pub shots: u32,
    /// One outcome per terminal measurement, in declaration order.
    pub outcomes: Vec<MeasurementOutcome>,
}

/// Full results of an execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// One result per shot-vector entry, in shard order.
    pub shards: Vec<ShardResult>,
    /// Wall-clock execution time in milliseconds, if measured.
    pub execution_time_ms: Option<u64>,
}

impl ExecutionResult {
    /// Create a result from shards.
    pub fn new(shards: Vec<ShardResult>) -> Self {
        Self {
            shards,
            execution_time_ms: None,
        }
    }

    /// Attach an execution time.
    #[must_use]
    pub fn with_execution_time(mut self, millis: u64) -> Self {
        self.execution_time_ms = Some(millis);
        self
    }

    /// The only shard, for unsharded executions.
    pub fn single(&self) -> Option<&ShardResult> {
        match self.shards.as_slice() {
            [shard] => Some(shard),
            _ => None,
        }
    }
}
