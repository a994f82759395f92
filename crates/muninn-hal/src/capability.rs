//! Backend capability introspection.
//!
//! This module defines what a backend can *measure*: which statistic kinds
//! it returns natively and which observable compositions it accepts. The
//! transform selector in `muninn-rewrite` is a pure function over this
//! descriptor — capability negotiation never inspects a live device.

use serde::{Deserialize, Serialize};

use muninn_ir::MeasurementKind;

/// Measurement capabilities of a quantum backend.
///
/// Immutable per preprocessing call; backends cache one at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the backend.
    pub name: String,
    /// Number of qubits available.
    pub num_qubits: u32,
    /// Measurement kinds the backend serves natively.
    pub measurements: Vec<MeasurementKind>,
    /// Whether sum-of-terms observables are accepted.
    pub sum_observables: bool,
    /// Whether one circuit may request observables that do not commute
    /// qubit-wise.
    pub non_commuting_observables: bool,
    /// Maximum number of shots per job.
    pub max_shots: u32,
    /// Whether this is a simulator vs real hardware.
    pub is_simulator: bool,
}

impl Capabilities {
    /// Capabilities of a full statevector simulator: every measurement
    /// kind, sums, and non-commuting observable sets.
    pub fn simulator(num_qubits: u32) -> Self {
        Self {
            name: "simulator".into(),
            num_qubits,
            measurements: MeasurementKind::ALL.to_vec(),
            sum_observables: true,
            non_commuting_observables: true,
            max_shots: 100_000,
            is_simulator: true,
        }
    }

    /// A readout-only device: raw counts and/or samples, nothing analytic.
    ///
    /// The common shape for hardware that streams shot data without
    /// on-device aggregation.
    pub fn readout_only(
        name: impl Into<String>,
        num_qubits: u32,
        counts: bool,
        samples: bool,
    ) -> Self {
        let mut measurements = vec![];
        if counts {
            measurements.push(MeasurementKind::Counts);
        }
        if samples {
            measurements.push(MeasurementKind::Sample);
        }
        Self {
            name: name.into(),
            num_qubits,
            measurements,
            sum_observables: false,
            non_commuting_observables: true,
            max_shots: 20_000,
            is_simulator: false,
        }
    }

    /// A counts-only readout device.
    pub fn counts_only(name: impl Into<String>, num_qubits: u32) -> Self {
        Self::readout_only(name, num_qubits, true, false)
    }

    /// A samples-only readout device.
    pub fn samples_only(name: impl Into<String>, num_qubits: u32) -> Self {
        Self::readout_only(name, num_qubits, false, true)
    }

    /// Override sum-observable support.
    #[must_use]
    pub fn with_sum_observables(mut self, supported: bool) -> Self {
        self.sum_observables = supported;
        self
    }

    /// Override non-commuting-observable support.
    #[must_use]
    pub fn with_non_commuting_observables(mut self, supported: bool) -> Self {
        self.non_commuting_observables = supported;
        self
    }

    /// Remove native support for one measurement kind.
    #[must_use]
    pub fn without_measurement(mut self, kind: MeasurementKind) -> Self {
        self.measurements.retain(|k| *k != kind);
        self
    }

    /// Whether the backend serves a measurement kind natively.
    pub fn supports(&self, kind: MeasurementKind) -> bool {
        self.measurements.contains(&kind)
    }

    /// Whether every analytic kind (expectation, variance, probabilities)
    /// is served natively.
    pub fn supports_analytic(&self) -> bool {
        self.supports(MeasurementKind::Expval)
            && self.supports(MeasurementKind::Var)
            && self.supports(MeasurementKind::Probs)
    }
}
