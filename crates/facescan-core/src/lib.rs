//! facescan-core — pure face-matching primitives.
//!
//! Distance scoring against calibrated thresholds, and consensus aggregation
//! over enrolled face profiles. No I/O: descriptor extraction lives behind
//! the engine's capability traits.

pub mod consensus;
pub mod scorer;
pub mod types;

pub use consensus::ConsensusAggregator;
pub use scorer::{distance, MatchThresholds, ScoreError, ThresholdError};
pub use types::{Candidate, Descriptor, FaceProfile, MatchResult, MatchType, ProfileError};
