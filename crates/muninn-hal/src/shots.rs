//! Shot configuration.
//!
//! Shot-vector execution (several independent shot counts in one call) is
//! modeled as an explicit variant rather than inferred from result shapes.
//! Each entry of a vector produces one independent result shard, in order.

use serde::{Deserialize, Serialize};

use crate::error::{HalError, HalResult};

/// Number of shots for an execution, single or sharded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shots {
    /// One execution with the given shot count.
    Single(u32),
    /// One execution per entry, each an independent shard.
    Vector(Vec<u32>),
}

impl Shots {
    /// Build a shot vector, validating that it is non-empty and every
    /// entry is positive.
    pub fn vector(shots: impl Into<Vec<u32>>) -> HalResult<Self> {
        let shots = shots.into();
        if shots.is_empty() {
            return Err(HalError::InvalidShots("shot vector must not be empty".into()));
        }
        if shots.contains(&0) {
            return Err(HalError::InvalidShots("shot counts must be positive".into()));
        }
        Ok(Shots::Vector(shots))
    }

    /// Per-shard shot counts, a single entry for [`Shots::Single`].
    pub fn shards(&self) -> Vec<u32> {
        match self {
            Shots::Single(n) => vec![*n],
            Shots::Vector(v) => v.clone(),
        }
    }

    /// Number of result shards this configuration produces.
    pub fn num_shards(&self) -> usize {
        match self {
            Shots::Single(_) => 1,
            Shots::Vector(v) => v.len(),
        }
    }

    /// Total shots across all shards.
    pub fn total(&self) -> u64 {
        match self {
            Shots::Single(n) => u64::from(*n),
            Shots::Vector(v) => v.iter().map(|n| u64::from(*n)).sum(),
        }
    }

    /// Whether this is a sharded configuration.
    pub fn is_sharded(&self) -> bool {
        matches!(self, Shots::Vector(_))
    }

    /// Validate the configuration against a backend's shot limit.
    pub fn validate(&self, max_shots: u32) -> HalResult<()> {
        for n in self.shards() {
            if n == 0 {
                return Err(HalError::InvalidShots("shot counts must be positive".into()));
            }
            if n > max_shots {
                return Err(HalError::InvalidShots(format!(
                    "{n} shots exceeds backend limit of {max_shots}"
                )));
            }
        }
        if let Shots::Vector(v) = self {
            if v.is_empty() {
                return Err(HalError::InvalidShots("shot vector must not be empty".into()));
            }
        }
        Ok(())
    }
}

impl From<u32> for Shots {
    fn from(n: u32) -> Self {
        Shots::Single(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_shard() {
        let shots = Shots::Single(1000);
        assert_eq!(shots.num_shards(), 1);
        assert_eq!(shots.shards(), vec![1000]);
        assert!(!shots.is_sharded());
    }

    #[test]
    fn test_vector_shards_preserve_order() {
        let shots = Shots::vector([3000, 3500, 4000]).unwrap();
        assert_eq!(shots.num_shards(), 3);
        assert_eq!(shots.shards(), vec![3000, 3500, 4000]);
        assert_eq!(shots.total(), 10_500);
    }

    #[test]
    fn test_empty_vector_rejected() {
        assert!(matches!(
            Shots::vector(Vec::<u32>::new()),
            Err(HalError::InvalidShots(_))
        ));
    }

    #[test]
    fn test_zero_shots_rejected() {
        assert!(Shots::vector([1000, 0]).is_err());
        assert!(Shots::Single(0).validate(10_000).is_err());
    }

    #[test]
    fn test_limit_validation() {
        assert!(Shots::Single(5000).validate(1000).is_err());
        assert!(Shots::Single(500).validate(1000).is_ok());
    }
}
