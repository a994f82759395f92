//! Backend trait and configuration.
//!
//! The [`Backend`] trait defines the lifecycle for interacting with a
//! quantum backend:
//!
//! ```text
//!   capabilities() ──→ validate() ──→ submit() ──→ status() ──→ result()
//!    (sync, &ref)       (async)       (async)      (async)      (async)
//! ```
//!
//! ## Design principles
//!
//! - **Async-native**: all I/O methods are async.
//! - **Thread-safe**: `Send + Sync` bound enables shared ownership.
//! - **Infallible introspection**: `capabilities()` is synchronous and
//!   infallible — a backend that cannot report capabilities without I/O
//!   is not correctly initialized.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use muninn_ir::{Circuit, Observable};

use crate::capability::Capabilities;
use crate::error::{HalError, HalResult};
use crate::job::{JobId, JobStatus};
use crate::result::ExecutionResult;
use crate::shots::Shots;

/// Configuration for a backend instance.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Name of the backend.
    pub name: String,
    /// Authentication token.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Additional configuration.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl BackendConfig {
    /// Create a new backend configuration.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Set the authentication token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Add extra configuration.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("name", &self.name)
            .field("token", &"[REDACTED]")
            .field("extra", &self.extra)
            .finish()
    }
}

/// Outcome of pre-submission circuit validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// The circuit can be submitted as-is.
    Valid,
    /// The circuit can never run on this backend.
    Invalid(String),
    /// The circuit's measurements need rewriting before submission.
    RequiresRewrite(String),
}

/// Trait for quantum backends.
///
/// # Contract
///
/// - `capabilities()` MUST be synchronous and infallible, cached at
///   construction time.
/// - `submit()` MUST return a `JobId` with initial status `Queued`.
/// - `result()` MUST only be called when status is `Completed`.
/// - `wait()` has a default implementation (50ms poll, 60s timeout).
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the capabilities of this backend.
    fn capabilities(&self) -> &Capabilities;

    /// Validate a circuit against backend constraints.
    ///
    /// The default implementation checks qubit count, native measurement
    /// support, and observable-composition flags.
    async fn validate(&self, circuit: &Circuit) -> HalResult<ValidationResult> {
        let caps = self.capabilities();

        if circuit.num_qubits() > caps.num_qubits {
            return Ok(ValidationResult::Invalid(format!(
                "circuit has {} qubits but backend only has {}",
                circuit.num_qubits(),
                caps.num_qubits
            )));
        }

        for measurement in circuit.measurements() {
            if !caps.supports(measurement.kind()) {
                return Ok(ValidationResult::RequiresRewrite(format!(
                    "{} measurements are not served natively",
                    measurement.kind()
                )));
            }
            if !caps.sum_observables {
                if let Some(Observable::Sum(_)) = measurement.observable() {
                    return Ok(ValidationResult::RequiresRewrite(
                        "sum observables are not served natively".into(),
                    ));
                }
            }
        }

        if !caps.non_commuting_observables {
            let observables: Vec<&Observable> = circuit
                .measurements()
                .iter()
                .filter_map(|m| m.observable())
                .collect();
            for (i, a) in observables.iter().enumerate() {
                for b in &observables[i + 1..] {
                    if !a.qubit_wise_commutes(b) {
                        return Ok(ValidationResult::RequiresRewrite(
                            "non-commuting observables are not served natively".into(),
                        ));
                    }
                }
            }
        }

        Ok(ValidationResult::Valid)
    }

    /// Submit a circuit for execution.
    async fn submit(&self, circuit: &Circuit, shots: &Shots) -> HalResult<JobId>;

    /// Query job status.
    async fn status(&self, job_id: &JobId) -> HalResult<JobStatus>;

    /// Retrieve execution results.
    async fn result(&self, job_id: &JobId) -> HalResult<ExecutionResult>;

    /// Cancel a running job.
    async fn cancel(&self, job_id: &JobId) -> HalResult<()>;

    /// Wait for a job to reach a terminal state and return its results.
    async fn wait(&self, job_id: &JobId) -> HalResult<ExecutionResult> {
        const POLL_INTERVAL: Duration = Duration::from_millis(50);
        const TIMEOUT: Duration = Duration::from_secs(60);

        let deadline = tokio::time::Instant::now() + TIMEOUT;
        loop {
            match self.status(job_id).await? {
                JobStatus::Completed => return self.result(job_id).await,
                JobStatus::Failed(reason) => return Err(HalError::JobFailed(reason)),
                JobStatus::Cancelled => return Err(HalError::JobCancelled),
                JobStatus::Queued | JobStatus::Running => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(HalError::Timeout(job_id.to_string()));
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }
}
