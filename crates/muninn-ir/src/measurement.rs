//! Terminal measurement requests.
//!
//! Every circuit ends in a list of [`Measurement`] requests. A request asks
//! either for an analytic statistic (expectation value, variance,
//! probabilities) or for raw readout (counts, per-shot samples). Exactly one
//! of {observable, explicit qubit subset, all qubits} identifies what is
//! measured.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::observable::Observable;
use crate::qubit::QubitId;

/// The kind of a measurement request, the axis along which device
/// capabilities are negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementKind {
    /// Expectation value of an observable.
    Expval,
    /// Variance of an observable.
    Var,
    /// Probability distribution over basis states.
    Probs,
    /// Aggregated readout frequencies.
    Counts,
    /// Itemized per-shot readout.
    Sample,
}

impl MeasurementKind {
    /// All measurement kinds.
    pub const ALL: [MeasurementKind; 5] = [
        MeasurementKind::Expval,
        MeasurementKind::Var,
        MeasurementKind::Probs,
        MeasurementKind::Counts,
        MeasurementKind::Sample,
    ];

    /// The lowercase opcode name used in emitted listings.
    pub fn name(&self) -> &'static str {
        match self {
            MeasurementKind::Expval => "expval",
            MeasurementKind::Var => "var",
            MeasurementKind::Probs => "probs",
            MeasurementKind::Counts => "counts",
            MeasurementKind::Sample => "sample",
        }
    }

    /// Whether this kind is raw readout (counts or samples) rather than an
    /// analytic statistic.
    pub fn is_readout(&self) -> bool {
        matches!(self, MeasurementKind::Counts | MeasurementKind::Sample)
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A subset of the device qubits, or all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QubitSelection {
    /// Every qubit of the device, in ascending order.
    All,
    /// An explicit subset, in the order given by the caller. The order
    /// fixes bit significance in basis indices (first qubit is the most
    /// significant bit).
    Subset(Vec<QubitId>),
}

impl QubitSelection {
    /// Resolve the selection against a device size.
    pub fn resolve(&self, num_qubits: u32) -> Vec<QubitId> {
        match self {
            QubitSelection::All => (0..num_qubits).map(QubitId).collect(),
            QubitSelection::Subset(qubits) => qubits.clone(),
        }
    }

    /// The explicit subset, if any.
    pub fn subset(&self) -> Option<&[QubitId]> {
        match self {
            QubitSelection::All => None,
            QubitSelection::Subset(qubits) => Some(qubits),
        }
    }
}

/// What a counts or sample request reads out: an observable's eigenvalues,
/// or computational-basis bits on a qubit selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReadoutTarget {
    /// Eigenvalues of an observable.
    Observable(Observable),
    /// Computational-basis bits.
    Qubits(QubitSelection),
}

impl ReadoutTarget {
    /// All device qubits in the computational basis.
    pub fn all() -> Self {
        ReadoutTarget::Qubits(QubitSelection::All)
    }

    /// The observable, if this target is one.
    pub fn observable(&self) -> Option<&Observable> {
        match self {
            ReadoutTarget::Observable(obs) => Some(obs),
            ReadoutTarget::Qubits(_) => None,
        }
    }
}

/// A terminal measurement request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Measurement {
    /// Expectation value of an observable.
    Expval(Observable),
    /// Variance of an observable.
    Var(Observable),
    /// Probability distribution over a qubit selection.
    Probs(QubitSelection),
    /// Readout frequencies.
    Counts(ReadoutTarget),
    /// Per-shot readout.
    Sample(ReadoutTarget),
}

impl Measurement {
    /// The kind of this request.
    pub fn kind(&self) -> MeasurementKind {
        match self {
            Measurement::Expval(_) => MeasurementKind::Expval,
            Measurement::Var(_) => MeasurementKind::Var,
            Measurement::Probs(_) => MeasurementKind::Probs,
            Measurement::Counts(_) => MeasurementKind::Counts,
            Measurement::Sample(_) => MeasurementKind::Sample,
        }
    }

    /// The observable this request refers to, if any.
    pub fn observable(&self) -> Option<&Observable> {
        match self {
            Measurement::Expval(obs) | Measurement::Var(obs) => Some(obs),
            Measurement::Counts(target) | Measurement::Sample(target) => target.observable(),
            Measurement::Probs(_) => None,
        }
    }

    /// The qubits this request needs read out, resolved against the device
    /// size. Observable requests need the observable's support; selection
    /// requests need the selection.
    pub fn support(&self, num_qubits: u32) -> Vec<QubitId> {
        match self {
            Measurement::Expval(obs) | Measurement::Var(obs) => obs.qubits(),
            Measurement::Probs(sel) => sel.resolve(num_qubits),
            Measurement::Counts(target) | Measurement::Sample(target) => match target {
                ReadoutTarget::Observable(obs) => obs.qubits(),
                ReadoutTarget::Qubits(sel) => sel.resolve(num_qubits),
            },
        }
    }
}
