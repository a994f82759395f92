//! Muninn Hardware Abstraction Layer
//!
//! This crate provides a unified interface for shot-based quantum backends,
//! centered on what a backend can *measure*: which statistic kinds it
//! returns natively (expectation, variance, probabilities, counts, samples)
//! and which observable compositions it accepts.
//!
//! # Overview
//!
//! - A common [`Backend`] trait for job submission and management
//! - [`Capabilities`] describing native measurement support, the input to
//!   transform selection in `muninn-rewrite`
//! - [`Shots`] modeling single shot counts and shot vectors explicitly
//! - Unified result handling via [`ExecutionResult`], [`Counts`] and
//!   [`Samples`]
//!
//! # Example: Running a Circuit
//!
//! ```ignore
//! use muninn_hal::{Backend, Shots};
//! use muninn_adapter_sim::SimulatorBackend;
//! use muninn_ir::{Circuit, PauliTerm, QubitId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut circuit = Circuit::new("ramsey", 2);
//!     circuit.ry(1.2, QubitId(0))?;
//!     circuit.expval(PauliTerm::z(QubitId(0)))?;
//!
//!     let backend = SimulatorBackend::new(2);
//!     let job_id = backend.submit(&circuit, &Shots::Single(1000)).await?;
//!     let result = backend.wait(&job_id).await?;
//!     println!("{:?}", result.shards[0].outcomes[0]);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod capability;
pub mod error;
pub mod job;
pub mod result;
pub mod shots;

pub use backend::{Backend, BackendConfig, ValidationResult};
pub use capability::Capabilities;
pub use error::{HalError, HalResult};
pub use job::{Job, JobId, JobStatus};
pub use result::{Counts, ExecutionResult, MeasurementOutcome, Samples, ShardResult};
pub use shots::Shots;
