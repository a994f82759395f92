//! Execution pipeline: capability-driven rewriting wrapped around a
//! backend.
//!
//! The pipeline owns the device's outgoing transform program. At
//! construction it asks the selector what the backend's capabilities
//! require; `execute` applies the program, runs every produced circuit,
//! and folds the raw results back onto the original measurement list.

use tracing::{debug, info, instrument};

use muninn_hal::{Backend, ShardResult, Shots};
use muninn_ir::Circuit;

use crate::batch::TapeBatch;
use crate::error::RewriteResult;
use crate::passes::pass_for;
use crate::program::TransformProgram;
use crate::selector::select_transforms;

/// A backend wrapped with the measurement rewrites its capabilities
/// require.
pub struct Pipeline<B: Backend> {
    backend: B,
    program: TransformProgram,
}

impl<B: Backend> Pipeline<B> {
    /// Wrap a backend, selecting transforms from its capabilities.
    pub fn new(backend: B) -> Self {
        let program = select_transforms(backend.capabilities());
        Self { backend, program }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The transform program chosen for this backend.
    pub fn program(&self) -> &TransformProgram {
        &self.program
    }

    /// Apply the transform program to a circuit without executing it.
    ///
    /// Exposes the rewritten circuits for inspection (e.g. emitting their
    /// text listing) and the postprocessing pipeline for later use.
    pub fn preprocess(&self, circuit: &Circuit) -> RewriteResult<TapeBatch> {
        let mut batch = TapeBatch::new(circuit.clone());
        for kind in self.program.iter() {
            let pass = pass_for(kind);
            debug!(transform = pass.name(), "applying transform");
            pass.apply(&mut batch)?;
        }
        Ok(batch)
    }

    /// Rewrite, execute, and reconstruct.
    ///
    /// Returns one [`ShardResult`] per shot-vector entry, each holding the
    /// reconstructed values of the original measurements in declaration
    /// order.
    #[instrument(skip(self, circuit), fields(backend = self.backend.name()))]
    pub async fn execute(
        &self,
        circuit: &Circuit,
        shots: &Shots,
    ) -> RewriteResult<Vec<ShardResult>> {
        let batch = self.preprocess(circuit)?;
        info!(
            circuits = batch.circuits().len(),
            shards = shots.num_shards(),
            "executing rewritten batch"
        );

        let mut results = Vec::with_capacity(batch.circuits().len());
        for tape in batch.circuits() {
            let job_id = self.backend.submit(tape, shots).await?;
            let result = self.backend.wait(&job_id).await?;
            results.push(result.shards);
        }

        batch.postprocess(results)
    }
}
