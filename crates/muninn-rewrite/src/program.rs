//! Transform program: the ordered rewrite sequence chosen for a device.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The circuit-rewriting transforms Muninn can schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransformKind {
    /// Partition measurements into qubit-wise commuting groups, one
    /// circuit per group.
    SplitNonCommuting,
    /// Expand sum-observable expectations into single-term expectations.
    SplitToSingleTerms,
    /// Replace the measurement list with one raw counts request.
    MeasurementsFromCounts,
    /// Replace the measurement list with one raw sample request.
    MeasurementsFromSamples,
}

impl TransformKind {
    /// The transform's name.
    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::SplitNonCommuting => "split_non_commuting",
            TransformKind::SplitToSingleTerms => "split_to_single_terms",
            TransformKind::MeasurementsFromCounts => "measurements_from_counts",
            TransformKind::MeasurementsFromSamples => "measurements_from_samples",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered sequence of transforms to apply before execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformProgram {
    transforms: Vec<TransformKind>,
}

impl TransformProgram {
    /// Create an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transform.
    pub fn push(&mut self, kind: TransformKind) {
        self.transforms.push(kind);
    }

    /// Whether the program contains a transform.
    pub fn contains(&self, kind: TransformKind) -> bool {
        self.transforms.contains(&kind)
    }

    /// Iterate over the transforms in application order.
    pub fn iter(&self) -> impl Iterator<Item = TransformKind> + '_ {
        self.transforms.iter().copied()
    }

    /// Number of transforms.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Whether the program is empty.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl fmt::Display for TransformProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, t) in self.transforms.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{t}")?;
        }
        write!(f, "]")
    }
}
