//! Tape batches: the unit transforms operate on.
//!
//! A batch starts as one circuit. Splitting transforms may fan it out
//! into several circuits; readout rewrites attach a [`RewritePlan`] per
//! circuit. Each transform pushes one [`PostStep`]; after execution the
//! steps are folded in reverse to map raw results back onto the original
//! measurement list.

use muninn_hal::{MeasurementOutcome, ShardResult};
use muninn_ir::Circuit;

use crate::error::{RewriteError, RewriteResult};
use crate::plan::RewritePlan;

/// Where one original measurement's value comes from after splitting.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotSource {
    /// A single slot of one produced circuit.
    Direct {
        /// Index of the produced circuit.
        circuit: usize,
        /// Measurement slot within that circuit.
        slot: usize,
    },
    /// A coefficient-weighted sum of scalar slots.
    WeightedSum {
        /// `(circuit, slot, coefficient)` triples.
        parts: Vec<(usize, usize, f64)>,
    },
}

/// One postprocessing step, pushed by the transform that made it
/// necessary and applied in reverse order after execution.
#[derive(Debug, Clone, PartialEq)]
pub enum PostStep {
    /// Reconstruct original measurements from raw readout, one plan per
    /// circuit present when the readout rewrite ran.
    Readout {
        /// Per-circuit reconstruction plans.
        plans: Vec<RewritePlan>,
    },
    /// Collapse the results of several produced circuits back onto one
    /// original measurement list.
    Recombine {
        /// One source per original measurement, in declaration order.
        sources: Vec<SlotSource>,
    },
}

/// The circuits produced by the transform program, plus the
/// postprocessing pipeline that undoes it.
#[derive(Debug, Clone)]
pub struct TapeBatch {
    circuits: Vec<Circuit>,
    post: Vec<PostStep>,
}

impl TapeBatch {
    /// Start a batch from a single circuit.
    pub fn new(circuit: Circuit) -> Self {
        Self {
            circuits: vec![circuit],
            post: vec![],
        }
    }

    /// The circuits to execute, in order.
    pub fn circuits(&self) -> &[Circuit] {
        &self.circuits
    }

    /// Mutable access for transforms.
    pub(crate) fn circuits_mut(&mut self) -> &mut Vec<Circuit> {
        &mut self.circuits
    }

    /// The postprocessing steps, in the order they were pushed.
    pub fn post_steps(&self) -> &[PostStep] {
        &self.post
    }

    /// Record a postprocessing step.
    pub(crate) fn push_post(&mut self, step: PostStep) {
        self.post.push(step);
    }

    /// Fold raw execution results (one `Vec<ShardResult>` per circuit, in
    /// circuit order) back onto the original measurement list.
    pub fn postprocess(
        &self,
        results: Vec<Vec<ShardResult>>,
    ) -> RewriteResult<Vec<ShardResult>> {
        if results.len() != self.circuits.len() {
            return Err(RewriteError::ShapeMismatch(format!(
                "{} result sets for {} circuits",
                results.len(),
                self.circuits.len()
            )));
        }

        let mut current = results;
        for step in self.post.iter().rev() {
            current = match step {
                PostStep::Readout { plans } => {
                    if plans.len() != current.len() {
                        return Err(RewriteError::ShapeMismatch(format!(
                            "{} rewrite plans for {} result sets",
                            plans.len(),
                            current.len()
                        )));
                    }
                    plans
                        .iter()
                        .zip(&current)
                        .map(|(plan, shards)| {
                            plan.reconstruct(&muninn_hal::ExecutionResult::new(shards.clone()))
                        })
                        .collect::<RewriteResult<Vec<_>>>()?
                }
                PostStep::Recombine { sources } => {
                    vec![recombine(sources, &current)?]
                }
            };
        }

        match current.len() {
            1 => Ok(current.into_iter().next().expect("checked length")),
            n => Err(RewriteError::ShapeMismatch(format!(
                "postprocessing left {n} result sets"
            ))),
        }
    }
}

/// Merge per-circuit results into one measurement list per shard.
fn recombine(
    sources: &[SlotSource],
    results: &[Vec<ShardResult>],
) -> RewriteResult<Vec<ShardResult>> {
    let num_shards = results
        .first()
        .map(|shards| shards.len())
        .ok_or_else(|| RewriteError::ShapeMismatch("no results to recombine".into()))?;
    if results.iter().any(|shards| shards.len() != num_shards) {
        return Err(RewriteError::ShapeMismatch(
            "shard counts differ across split circuits".into(),
        ));
    }

    (0..num_shards)
        .map(|shard_idx| {
            let outcomes = sources
                .iter()
                .map(|source| fetch(source, results, shard_idx))
                .collect::<RewriteResult<Vec<_>>>()?;
            Ok(ShardResult {
                shots: results[0][shard_idx].shots,
                outcomes,
            })
        })
        .collect()
}

fn fetch(
    source: &SlotSource,
    results: &[Vec<ShardResult>],
    shard_idx: usize,
) -> RewriteResult<MeasurementOutcome> {
    let slot_value = |circuit: usize, slot: usize| -> RewriteResult<&MeasurementOutcome> {
        results
            .get(circuit)
            .and_then(|shards| shards.get(shard_idx))
            .and_then(|shard| shard.outcomes.get(slot))
            .ok_or_else(|| {
                RewriteError::ShapeMismatch(format!(
                    "missing slot {slot} of circuit {circuit} in shard {shard_idx}"
                ))
            })
    };

    match source {
        SlotSource::Direct { circuit, slot } => Ok(slot_value(*circuit, *slot)?.clone()),
        SlotSource::WeightedSum { parts } => {
            let mut total = 0.0;
            for (circuit, slot, coeff) in parts {
                let value = slot_value(*circuit, *slot)?.as_scalar().ok_or_else(|| {
                    RewriteError::ShapeMismatch(
                        "weighted recombination expects scalar slots".into(),
                    )
                })?;
                total += coeff * value;
            }
            Ok(MeasurementOutcome::Scalar(total))
        }
    }
}
