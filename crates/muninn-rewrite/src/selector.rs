//! Transform selection.
//!
//! A pure decision function from a device's capability descriptor to the
//! transform program that makes user circuits executable on it. No live
//! device state is consulted and nothing is executed here.

use tracing::debug;

use muninn_hal::Capabilities;
use muninn_ir::MeasurementKind;

use crate::program::{TransformKind, TransformProgram};

/// Choose the transforms a device's capabilities require, in application
/// order.
///
/// Splitting comes first: a device that cannot accept non-commuting
/// observable sets gets [`TransformKind::SplitNonCommuting`] (which also
/// distributes sums); otherwise a device without sum support gets
/// [`TransformKind::SplitToSingleTerms`]. Independently, a device without
/// native analytic statistics gets a readout rewrite — samples preferred
/// over counts when both are available.
///
/// A descriptor that natively serves everything yields an empty program.
pub fn select_transforms(caps: &Capabilities) -> TransformProgram {
    let mut program = TransformProgram::new();

    if !caps.non_commuting_observables {
        program.push(TransformKind::SplitNonCommuting);
    } else if !caps.sum_observables {
        program.push(TransformKind::SplitToSingleTerms);
    }

    if !caps.supports_analytic() {
        if caps.supports(MeasurementKind::Sample) {
            program.push(TransformKind::MeasurementsFromSamples);
        } else if caps.supports(MeasurementKind::Counts) {
            program.push(TransformKind::MeasurementsFromCounts);
        }
        // A device with neither readout kind cannot be served by a
        // rewrite; validation reports it at submission time.
    }

    debug!(backend = %caps.name, program = %program, "selected transform program");
    program
}
