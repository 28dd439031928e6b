//! Distance scoring between face descriptors.
//!
//! Distances are Euclidean over fixed-length vectors. The strong/weak
//! thresholds and the distance-to-confidence mapping are configuration,
//! calibrated against whichever descriptor extractor the deployment uses,
//! never hard-coded constants.

use crate::types::Descriptor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThresholdError {
    #[error("thresholds must satisfy 0 < strong < weak, got strong={strong}, weak={weak}")]
    Invalid { strong: f32, weak: f32 },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScoreError {
    #[error("descriptor dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Calibrated distance thresholds.
///
/// A pair at or below `strong` counts as a strong hit; anything beyond
/// `weak` is ignored entirely. Confidence is mapped as
/// `(1 - distance / weak)`, clamped to [0, 1], which is monotonically
/// non-increasing in distance.
#[derive(Debug, Clone, Copy)]
pub struct MatchThresholds {
    strong: f32,
    weak: f32,
}

impl MatchThresholds {
    pub fn new(strong: f32, weak: f32) -> Result<Self, ThresholdError> {
        if !(strong > 0.0 && weak > strong) {
            return Err(ThresholdError::Invalid { strong, weak });
        }
        Ok(Self { strong, weak })
    }

    pub fn strong(&self) -> f32 {
        self.strong
    }

    pub fn weak(&self) -> f32 {
        self.weak
    }

    /// Map a distance to a confidence in [0, 1].
    pub fn confidence(&self, distance: f32) -> f32 {
        (1.0 - distance / self.weak).clamp(0.0, 1.0)
    }
}

impl Default for MatchThresholds {
    /// Defaults calibrated for L2-normalized ArcFace-style embeddings.
    fn default() -> Self {
        Self {
            strong: 0.35,
            weak: 0.60,
        }
    }
}

/// Euclidean distance between two descriptors.
///
/// Total over equal-length inputs: identical vectors score 0.0.
pub fn distance(a: &Descriptor, b: &Descriptor) -> Result<f32, ScoreError> {
    if a.len() != b.len() {
        return Err(ScoreError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let sum: f32 = a
        .values
        .iter()
        .zip(b.values.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum();
    Ok(sum.sqrt())
}
