//! Consensus aggregation: fold per-enrollment-descriptor distances for one
//! candidate into a single verdict.
//!
//! A candidate that strongly resembles *any one* enrollment pose is rewarded
//! (this is what makes off-angle enrollment photos useful), while the
//! consensus count still reports how many poses agreed.

use crate::scorer::{self, MatchThresholds};
use crate::types::{Descriptor, FaceProfile, MatchResult, MatchType};
use chrono::Utc;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusAggregator {
    thresholds: MatchThresholds,
}

impl ConsensusAggregator {
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> MatchThresholds {
        self.thresholds
    }

    /// Produce exactly one verdict for the candidate, or `None` when no
    /// enrollment descriptor lands within the weak threshold. `None` means
    /// the candidate is simply not this person, which is not an error.
    ///
    /// A dimension mismatch on a single pair is a scoring failure for that
    /// pair only; the remaining pairs still count.
    pub fn aggregate(
        &self,
        profile: &FaceProfile,
        photo_id: &str,
        candidate: &Descriptor,
    ) -> Option<MatchResult> {
        let mut best: Option<f32> = None;
        let mut consensus = 0usize;

        for enrolled in &profile.descriptors {
            let distance = match scorer::distance(candidate, enrolled) {
                Ok(d) => d,
                Err(err) => {
                    tracing::warn!(photo_id, error = %err, "descriptor pair skipped");
                    continue;
                }
            };

            if distance > self.thresholds.weak() {
                continue;
            }
            if distance <= self.thresholds.strong() {
                consensus += 1;
            }
            best = Some(match best {
                Some(b) if b <= distance => b,
                _ => distance,
            });
        }

        let best = best?;
        let match_type = if consensus >= 1 {
            MatchType::Strong
        } else {
            MatchType::Weak
        };

        Some(MatchResult {
            photo_id: photo_id.to_string(),
            confidence: self.thresholds.confidence(best),
            match_type,
            consensus,
            scored_at: Utc::now(),
        })
    }
}
