//! Muninn Measurement Rewriting
//!
//! This crate turns circuits that request analytic statistics into
//! circuits a readout-limited device can run, and reconstructs the
//! requested statistics from the raw data afterwards.
//!
//! # Overview
//!
//! A device descriptor ([`muninn_hal::Capabilities`]) states which
//! measurement kinds the device serves natively. From it, the
//! [`selector`] derives a [`TransformProgram`]:
//!
//! ```text
//! User circuit
//!       │
//!       ▼
//! ┌──────────────────┐
//! │ select_transforms│ ◄── Capabilities (immutable descriptor)
//! └──────────────────┘
//!       │
//!       ├── SplitNonCommuting / SplitToSingleTerms   (observable shape)
//!       └── MeasurementsFromCounts / ...FromSamples  (readout rewrite)
//!       │
//!       ▼
//! Rewritten circuit(s) + RewritePlan ──→ execution ──→ reconstruction
//! ```
//!
//! The readout rewrites replace the terminal measurement list with one
//! raw counts or sample request over the union of required qubits,
//! appending the basis rotations that make every requested observable
//! diagonal. The returned [`RewritePlan`] records, per original
//! measurement, the eigenvalue weighting or bit projection that recovers
//! it from the raw data.
//!
//! # Example: Rewriting for a counts-only device
//!
//! ```rust
//! use muninn_ir::{Circuit, PauliTerm, QubitId};
//! use muninn_rewrite::measurements_from_counts;
//!
//! let mut circuit = Circuit::new("ramsey", 2);
//! circuit.ry(1.2, QubitId(0)).unwrap();
//! circuit.expval(PauliTerm::x(QubitId(0))).unwrap();
//!
//! let plan = measurements_from_counts(&mut circuit).unwrap();
//! assert_eq!(circuit.measurements().len(), 1);
//! assert_eq!(plan.reconstructions().len(), 1);
//! ```
//!
//! # Custom transforms
//!
//! Implement the [`RewritePass`] trait to add transforms; the built-in
//! passes live in [`passes`].

pub mod basis;
pub mod batch;
pub mod error;
pub mod passes;
pub mod pipeline;
pub mod plan;
pub mod program;
pub mod selector;

pub use batch::{PostStep, SlotSource, TapeBatch};
pub use error::{RewriteError, RewriteResult};
pub use passes::{
    MeasurementsFromCounts, MeasurementsFromSamples, RewritePass, SplitNonCommuting,
    SplitToSingleTerms, measurements_from_counts, measurements_from_samples, pass_for,
};
pub use pipeline::Pipeline;
pub use plan::{ReadoutRegister, Reconstruction, ResolvedObservable, RewritePlan};
pub use program::{TransformKind, TransformProgram};
pub use selector::select_transforms;
