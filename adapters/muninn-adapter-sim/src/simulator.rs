//! Simulator backend implementation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use muninn_hal::{
    Backend, BackendConfig, Capabilities, Counts, ExecutionResult, HalError, HalResult, Job,
    JobId, JobStatus, MeasurementOutcome, Samples, ShardResult, Shots, ValidationResult,
};
use muninn_ir::{Circuit, Measurement, Observable, QubitId, ReadoutTarget};

use crate::statevector::{Statevector, project_state};

/// Job data for the simulator.
struct SimJob {
    job: Job,
    result: Option<ExecutionResult>,
}

/// Local statevector simulator backend.
///
/// Serves every measurement kind natively: analytic statistics are read
/// directly off the statevector, raw readout is RNG-sampled. A custom
/// capability descriptor can be attached to emulate restricted devices
/// while keeping a working executor underneath.
pub struct SimulatorBackend {
    /// Backend configuration.
    config: BackendConfig,
    /// Capability descriptor reported to callers.
    capabilities: Capabilities,
    /// Active jobs.
    jobs: Arc<Mutex<FxHashMap<String, SimJob>>>,
    /// RNG seed for reproducible sampling, if set.
    seed: Option<u64>,
    /// Per-job counter so seeded runs get distinct streams.
    job_counter: AtomicU64,
}

impl SimulatorBackend {
    /// Create a simulator over the given number of qubits.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            config: BackendConfig::new("simulator"),
            capabilities: Capabilities::simulator(num_qubits),
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
            seed: None,
            job_counter: AtomicU64::new(0),
        }
    }

    /// Report a custom capability descriptor.
    ///
    /// Submission validates against the attached descriptor, so a
    /// readout-only descriptor makes the simulator reject analytic
    /// requests exactly like restricted hardware would.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Use a fixed RNG seed for reproducible sampling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build a simulator from a backend configuration.
    ///
    /// Recognized extras: `num_qubits` (default 20), `seed`.
    pub fn from_config(config: BackendConfig) -> HalResult<Self> {
        let num_qubits = config
            .extra
            .get("num_qubits")
            .and_then(serde_json::Value::as_u64)
            .map_or(20, |v| v as u32);
        let seed = config.extra.get("seed").and_then(serde_json::Value::as_u64);

        Ok(Self {
            capabilities: Capabilities::simulator(num_qubits),
            config,
            jobs: Arc::new(Mutex::new(FxHashMap::default())),
            seed,
            job_counter: AtomicU64::new(0),
        })
    }

    fn rng(&self) -> StdRng {
        let stream = self.job_counter.fetch_add(1, Ordering::Relaxed);
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
            None => StdRng::from_entropy(),
        }
    }

    /// Run simulation synchronously.
    #[instrument(skip(self, circuit))]
    fn run_simulation(&self, circuit: &Circuit, shots: &Shots) -> HalResult<ExecutionResult> {
        let start = Instant::now();
        let mut rng = self.rng();

        debug!(
            "Starting simulation: {} qubits, {} shard(s)",
            circuit.num_qubits(),
            shots.num_shards()
        );

        let mut sv = Statevector::new(circuit.num_qubits() as usize);
        for instruction in circuit.ops() {
            sv.apply(instruction);
        }

        let mut shards = Vec::with_capacity(shots.num_shards());
        for shard_shots in shots.shards() {
            let mut outcomes = Vec::with_capacity(circuit.measurements().len());
            for measurement in circuit.measurements() {
                outcomes.push(self.evaluate(&sv, circuit, measurement, shard_shots, &mut rng)?);
            }
            shards.push(ShardResult {
                shots: shard_shots,
                outcomes,
            });
        }

        let elapsed = start.elapsed();
        debug!("Simulation completed in {:?}", elapsed);

        Ok(ExecutionResult::new(shards).with_execution_time(elapsed.as_millis() as u64))
    }

    fn evaluate(
        &self,
        sv: &Statevector,
        circuit: &Circuit,
        measurement: &Measurement,
        shots: u32,
        rng: &mut StdRng,
    ) -> HalResult<MeasurementOutcome> {
        match measurement {
            Measurement::Expval(obs) => Ok(MeasurementOutcome::Scalar(expectation(sv, obs)?)),

            Measurement::Var(obs) => {
                // The second moment needs the whole observable diagonal in
                // one basis; a sum whose terms clash on a qubit cannot be
                // measured this way.
                let rotated = rotated_for(sv, obs)?;
                let probs = rotated.probabilities();
                let mut mean = 0.0;
                let mut second = 0.0;
                for (state, p) in probs.iter().enumerate() {
                    let eig = eigenvalue(obs, state);
                    mean += p * eig;
                    second += p * eig * eig;
                }
                Ok(MeasurementOutcome::Scalar(second - mean * mean))
            }

            Measurement::Probs(selection) => {
                let qubits = selection.resolve(circuit.num_qubits());
                Ok(MeasurementOutcome::Vector(sv.marginal_probabilities(&qubits)))
            }

            Measurement::Counts(ReadoutTarget::Qubits(selection)) => {
                let qubits = selection.resolve(circuit.num_qubits());
                let mut counts = Counts::new(qubits.len());
                for _ in 0..shots {
                    counts.record(project_state(sv.sample_state(rng), &qubits));
                }
                Ok(MeasurementOutcome::Counts(counts))
            }

            Measurement::Counts(ReadoutTarget::Observable(obs)) => {
                let rotated = rotated_for(sv, obs)?;
                let mut buckets: FxHashMap<i64, u64> = FxHashMap::default();
                for _ in 0..shots {
                    let eig = eigenvalue(obs, rotated.sample_state(rng));
                    // Bucket by a stable integer key; eigenvalues of Pauli
                    // sums are sums of coefficients, keyed at fixed scale.
                    *buckets.entry((eig * 1e9).round() as i64).or_insert(0) += 1;
                }
                let mut entries: Vec<(i64, u64)> = buckets.into_iter().collect();
                entries.sort_by_key(|(k, _)| *k);
                Ok(MeasurementOutcome::EigenCounts {
                    eigvals: entries.iter().map(|(k, _)| *k as f64 / 1e9).collect(),
                    counts: entries.iter().map(|(_, c)| *c).collect(),
                })
            }

            Measurement::Sample(ReadoutTarget::Qubits(selection)) => {
                let qubits = selection.resolve(circuit.num_qubits());
                let mut data = Array2::<u8>::zeros((shots as usize, qubits.len()));
                for shot in 0..shots as usize {
                    let state = sv.sample_state(rng);
                    for (col, qubit) in qubits.iter().enumerate() {
                        data[(shot, col)] = ((state >> qubit.0) & 1) as u8;
                    }
                }
                Ok(MeasurementOutcome::Samples(Samples::new(data)))
            }

            Measurement::Sample(ReadoutTarget::Observable(obs)) => {
                let rotated = rotated_for(sv, obs)?;
                let eigenvalues = (0..shots)
                    .map(|_| eigenvalue(obs, rotated.sample_state(rng)))
                    .collect();
                Ok(MeasurementOutcome::EigenSamples(eigenvalues))
            }
        }
    }
}

/// Rotate a copy of the state into the observable's joint eigenbasis.
fn rotated_for(sv: &Statevector, obs: &Observable) -> HalResult<Statevector> {
    let gates = obs
        .diagonalizing_gates()
        .map_err(|e| HalError::UnsupportedMeasurement(e.to_string()))?;
    let mut rotated = sv.clone();
    for gate in &gates {
        rotated.apply(gate);
    }
    Ok(rotated)
}

/// Eigenvalue of a (diagonalized) observable at an amplitude index.
fn eigenvalue(obs: &Observable, state: usize) -> f64 {
    obs.terms()
        .into_iter()
        .map(|(coeff, term)| {
            let mask: usize = term.qubits().fold(0usize, |acc, q| acc | (1 << q.0));
            let parity = (state & mask).count_ones() % 2;
            if parity == 1 { -coeff } else { coeff }
        })
        .sum()
}

/// Analytic expectation value, term by term.
///
/// Each term is diagonalized independently, so sums with non-commuting
/// terms are handled exactly.
fn expectation(sv: &Statevector, obs: &Observable) -> HalResult<f64> {
    let mut total = 0.0;
    for (coeff, term) in obs.terms() {
        let term_obs = Observable::Term(term.clone());
        let rotated = rotated_for(sv, &term_obs)?;
        let mask: usize = term.qubits().fold(0usize, |acc, q| acc | (1 << q.0));
        let mut value = 0.0;
        for (state, p) in rotated.probabilities().iter().enumerate() {
            let parity = (state & mask).count_ones() % 2;
            value += if parity == 1 { -p } else { *p };
        }
        total += coeff * value;
    }
    Ok(total)
}

#[async_trait]
impl Backend for SimulatorBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    #[instrument(skip(self, circuit))]
    async fn submit(&self, circuit: &Circuit, shots: &Shots) -> HalResult<JobId> {
        match self.validate(circuit).await? {
            ValidationResult::Valid => {}
            ValidationResult::Invalid(reason) => return Err(HalError::InvalidCircuit(reason)),
            ValidationResult::RequiresRewrite(reason) => {
                return Err(HalError::UnsupportedMeasurement(reason));
            }
        }
        shots.validate(self.capabilities.max_shots)?;

        let job_id = JobId::new(Uuid::new_v4().to_string());
        debug!("Submitted job: {}", job_id);

        // Run synchronously; a real backend would queue here.
        let result = self.run_simulation(circuit, shots)?;

        let job = Job::new(job_id.clone(), shots.clone())
            .with_backend(self.name())
            .with_status(JobStatus::Completed);

        let mut jobs = self
            .jobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        jobs.insert(
            job_id.0.clone(),
            SimJob {
                job,
                result: Some(result),
            },
        );

        Ok(job_id)
    }

    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus> {
        let jobs = self
            .jobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        jobs.get(&job_id.0)
            .map(|j| j.job.status.clone())
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))
    }

    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        let jobs = self
            .jobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let sim_job = jobs
            .get(&job_id.0)
            .ok_or_else(|| HalError::JobNotFound(job_id.0.clone()))?;
        sim_job
            .result
            .clone()
            .ok_or_else(|| HalError::JobNotCompleted(job_id.0.clone()))
    }

    async fn cancel(&self, job_id: &JobId) -> HalResult<()> {
        let mut jobs = self
            .jobs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(sim_job) = jobs.get_mut(&job_id.0) {
            if !sim_job.job.status.is_terminal() {
                sim_job.job = sim_job.job.clone().with_status(JobStatus::Cancelled);
            }
            Ok(())
        } else {
            Err(HalError::JobNotFound(job_id.0.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muninn_ir::{PauliTerm, QubitSelection};

    #[tokio::test]
    async fn test_simulator_capabilities() {
        let backend = SimulatorBackend::new(4);
        assert!(backend.capabilities().is_simulator);
        assert_eq!(backend.capabilities().num_qubits, 4);
    }

    #[tokio::test]
    async fn test_bell_state_counts() {
        let mut circuit = Circuit::new("bell", 2);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.counts(ReadoutTarget::all()).unwrap();

        let backend = SimulatorBackend::new(2).with_seed(11);
        let job_id = backend.submit(&circuit, &Shots::Single(1000)).await.unwrap();
        let result = backend.wait(&job_id).await.unwrap();

        let counts = result.single().unwrap().outcomes[0].as_counts().unwrap();
        assert_eq!(counts.get(0b00) + counts.get(0b11), 1000);
        assert_eq!(counts.get(0b01) + counts.get(0b10), 0);
    }

    #[tokio::test]
    async fn test_analytic_expval_of_rotated_qubit() {
        let theta = 1.2_f64;
        let mut circuit = Circuit::new("rot", 1);
        circuit.ry(theta, QubitId(0)).unwrap();
        circuit.expval(PauliTerm::x(QubitId(0))).unwrap();
        circuit.expval(PauliTerm::z(QubitId(0))).unwrap();

        let backend = SimulatorBackend::new(1);
        let job_id = backend.submit(&circuit, &Shots::Single(100)).await.unwrap();
        let result = backend.wait(&job_id).await.unwrap();

        let shard = result.single().unwrap();
        let x = shard.outcomes[0].as_scalar().unwrap();
        let z = shard.outcomes[1].as_scalar().unwrap();
        assert!((x - theta.sin()).abs() < 1e-10);
        assert!((z - theta.cos()).abs() < 1e-10);
    }

    #[tokio::test]
    async fn test_probs_marginal() {
        let theta = 1.9_f64;
        let mut circuit = Circuit::new("rot", 4);
        circuit.ry(theta, QubitId(3)).unwrap();
        circuit
            .probs(QubitSelection::Subset(vec![QubitId(3)]))
            .unwrap();

        let backend = SimulatorBackend::new(4);
        let job_id = backend.submit(&circuit, &Shots::Single(100)).await.unwrap();
        let result = backend.wait(&job_id).await.unwrap();

        let probs = result.single().unwrap().outcomes[0].as_vector().unwrap();
        assert!((probs[0] - (theta / 2.0).cos().powi(2)).abs() < 1e-10);
        assert!((probs[1] - (theta / 2.0).sin().powi(2)).abs() < 1e-10);
    }

    #[tokio::test]
    async fn test_shot_vector_shards() {
        let mut circuit = Circuit::new("flip", 1);
        circuit.x(QubitId(0)).unwrap();
        circuit.counts(ReadoutTarget::all()).unwrap();

        let backend = SimulatorBackend::new(1).with_seed(3);
        let shots = Shots::vector([100, 200, 300]).unwrap();
        let job_id = backend.submit(&circuit, &shots).await.unwrap();
        let result = backend.wait(&job_id).await.unwrap();

        assert_eq!(result.shards.len(), 3);
        for (shard, expected) in result.shards.iter().zip([100u64, 200, 300]) {
            assert_eq!(shard.outcomes[0].as_counts().unwrap().get(1), expected);
        }
    }

    #[tokio::test]
    async fn test_restricted_descriptor_rejects_analytic() {
        let mut circuit = Circuit::new("rot", 2);
        circuit.ry(0.3, QubitId(0)).unwrap();
        circuit.expval(PauliTerm::z(QubitId(0))).unwrap();

        let backend =
            SimulatorBackend::new(2).with_capabilities(Capabilities::counts_only("readout", 2));
        let result = backend.submit(&circuit, &Shots::Single(100)).await;
        assert!(matches!(result, Err(HalError::UnsupportedMeasurement(_))));
    }

    #[tokio::test]
    async fn test_too_many_qubits() {
        let circuit = Circuit::new("big", 10);
        let backend = SimulatorBackend::new(5);
        let result = backend.submit(&circuit, &Shots::Single(10)).await;
        assert!(matches!(result, Err(HalError::InvalidCircuit(_))));
    }
}
