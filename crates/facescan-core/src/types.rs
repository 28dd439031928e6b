use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed-length numeric face vector produced by a descriptor extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    pub values: Vec<f32>,
    /// Model version that produced this descriptor (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    pub fn with_model_version(values: Vec<f32>, model_version: impl Into<String>) -> Self {
        Self {
            values,
            model_version: Some(model_version.into()),
        }
    }

    /// Dimensionality of this descriptor.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("profile has no descriptors")]
    EmptyDescriptorSet,
    #[error("descriptor dimensions disagree: expected {expected}, got {got}")]
    MixedDimensions { expected: usize, got: usize },
    #[error("descriptor has {got} dimensions, store expects {expected}")]
    WrongDimension { expected: usize, got: usize },
}

/// Enrolled identity for one user: one descriptor per enrollment image.
///
/// Immutable once built. Re-enrollment replaces the whole profile rather
/// than mutating descriptors in place, so concurrent scans can share it
/// read-only behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceProfile {
    pub user_id: String,
    pub descriptors: Vec<Descriptor>,
    pub created_at: DateTime<Utc>,
    /// Provenance only; never consulted during scoring.
    pub source_image_refs: Vec<String>,
}

impl FaceProfile {
    /// Build a profile, rejecting empty or dimensionally inconsistent
    /// descriptor sets. A zero-descriptor profile can never exist.
    pub fn new(
        user_id: impl Into<String>,
        descriptors: Vec<Descriptor>,
        source_image_refs: Vec<String>,
    ) -> Result<Self, ProfileError> {
        let expected = descriptors
            .first()
            .ok_or(ProfileError::EmptyDescriptorSet)?
            .len();
        for descriptor in &descriptors {
            if descriptor.len() != expected {
                return Err(ProfileError::MixedDimensions {
                    expected,
                    got: descriptor.len(),
                });
            }
        }

        Ok(Self {
            user_id: user_id.into(),
            descriptors,
            created_at: Utc::now(),
            source_image_refs,
        })
    }

    /// Dimensionality shared by every descriptor in the profile.
    pub fn dimension(&self) -> usize {
        self.descriptors[0].len()
    }
}

/// One photo under test during a scan. Supplied fresh per invocation and
/// never persisted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub photo_id: String,
    /// Opaque handle the descriptor extractor resolves to pixel data.
    pub image_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// At least one enrollment descriptor cleared the strong threshold.
    Strong,
    /// Within the weak threshold only.
    Weak,
}

/// Verdict for one candidate photo that matched the profile.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub photo_id: String,
    /// Confidence in [0, 1], mapped from the best surviving distance.
    pub confidence: f32,
    pub match_type: MatchType,
    /// How many enrollment descriptors individually cleared the strong
    /// threshold.
    pub consensus: usize,
    pub scored_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_rejects_empty_descriptor_set() {
        let err = FaceProfile::new("alice", vec![], vec![]).unwrap_err();
        assert!(matches!(err, ProfileError::EmptyDescriptorSet));
    }

    #[test]
    fn test_profile_rejects_mixed_dimensions() {
        let err = FaceProfile::new(
            "alice",
            vec![
                Descriptor::new(vec![0.0, 1.0]),
                Descriptor::new(vec![0.0, 1.0, 2.0]),
            ],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ProfileError::MixedDimensions {
                expected: 2,
                got: 3
            }
        ));
    }

    #[test]
    fn test_profile_dimension() {
        let profile = FaceProfile::new(
            "alice",
            vec![Descriptor::new(vec![0.0; 4]), Descriptor::new(vec![1.0; 4])],
            vec!["a.jpg".into(), "b.jpg".into()],
        )
        .unwrap();
        assert_eq!(profile.dimension(), 4);
        assert_eq!(profile.descriptors.len(), 2);
    }
}
