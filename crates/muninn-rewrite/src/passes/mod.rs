//! Built-in rewriting transforms.

mod readout;
mod split;

pub use readout::{
    MeasurementsFromCounts, MeasurementsFromSamples, measurements_from_counts,
    measurements_from_samples,
};
pub use split::{SplitNonCommuting, SplitToSingleTerms};

use std::collections::BTreeMap;

use muninn_ir::{Measurement, Pauli, QubitId};

use crate::batch::TapeBatch;
use crate::error::RewriteResult;
use crate::program::TransformKind;

/// A circuit-rewriting transform.
///
/// Transforms consume a [`TapeBatch`], possibly fanning it out or
/// replacing measurement lists, and record the postprocessing step that
/// undoes the restructuring after execution.
pub trait RewritePass: Send + Sync {
    /// Get the name of this transform.
    fn name(&self) -> &'static str;

    /// Get the kind of this transform.
    fn kind(&self) -> TransformKind;

    /// Apply the transform to a batch.
    fn apply(&self, batch: &mut TapeBatch) -> RewriteResult<()>;
}

/// The per-qubit measurement bases a request pins down. Computational-
/// basis readout (probabilities, counts or samples over qubits) demands Z
/// on its support.
pub(crate) fn basis_demands(
    measurement: &Measurement,
    num_qubits: u32,
) -> RewriteResult<BTreeMap<QubitId, Pauli>> {
    match measurement.observable() {
        Some(obs) => Ok(obs.basis_map()?),
        None => Ok(measurement
            .support(num_qubits)
            .into_iter()
            .map(|q| (q, Pauli::Z))
            .collect()),
    }
}

/// Instantiate the pass implementing a transform kind.
pub fn pass_for(kind: TransformKind) -> Box<dyn RewritePass> {
    match kind {
        TransformKind::SplitNonCommuting => Box::new(SplitNonCommuting),
        TransformKind::SplitToSingleTerms => Box::new(SplitToSingleTerms),
        TransformKind::MeasurementsFromCounts => Box::new(MeasurementsFromCounts),
        TransformKind::MeasurementsFromSamples => Box::new(MeasurementsFromSamples),
    }
}
