//! Batch scheduler: drives one scan as a single cooperative task.
//!
//! Candidates are partitioned into fixed-size batches purely to create
//! yield and cancellation points; there is no parallel execution across
//! candidates. Cancellation is polled before each batch and before each
//! candidate, so cancellation latency is bounded by one in-flight item.

use crate::config::EngineConfig;
use crate::eta::EtaEstimator;
use crate::events::ScanEvent;
use crate::extractor::DescriptorExtractor;
use facescan_core::{Candidate, ConsensusAggregator, FaceProfile, MatchResult, MatchType};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// How one scan ended. Cancelled runs discard accumulated results by
/// contract.
pub(crate) enum ScanOutcome {
    Completed(Vec<MatchResult>),
    Cancelled,
}

pub(crate) struct BatchScheduler {
    extractor: Arc<dyn DescriptorExtractor>,
    aggregator: ConsensusAggregator,
    batch_size: usize,
    eta_window: usize,
}

impl BatchScheduler {
    pub(crate) fn new(extractor: Arc<dyn DescriptorExtractor>, config: &EngineConfig) -> Self {
        Self {
            extractor,
            aggregator: ConsensusAggregator::new(config.thresholds),
            batch_size: config.batch_size.max(1),
            eta_window: config.eta_window.max(1),
        }
    }

    /// Run the scan to a terminal state. Fatal preconditions (profile
    /// present, candidate set non-empty) are enforced by the controller
    /// before any event is emitted here; everything that can go wrong per
    /// photo is recovered locally and surfaced as an `error` event.
    pub(crate) async fn run(
        &self,
        profile: Arc<FaceProfile>,
        candidates: Vec<Candidate>,
        events: &mpsc::Sender<ScanEvent>,
        cancel: &CancellationToken,
    ) -> ScanOutcome {
        let total = candidates.len();
        let total_batches = total.div_ceil(self.batch_size);
        let started = Instant::now();
        let mut eta = EtaEstimator::new(self.eta_window);
        let mut results: Vec<MatchResult> = Vec::new();
        let mut current = 0usize;

        emit(events, ScanEvent::Initializing { total }).await;

        for (batch_index, batch) in candidates.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                return self.cancelled(events, current, total).await;
            }
            emit(
                events,
                ScanEvent::BatchStarting {
                    batch_index,
                    total_batches,
                },
            )
            .await;

            for candidate in batch {
                if cancel.is_cancelled() {
                    return self.cancelled(events, current, total).await;
                }

                let item_started = Instant::now();
                match self.extractor.extract(&candidate.image_ref).await {
                    Ok(descriptor) => {
                        if let Some(result) =
                            self.aggregator
                                .aggregate(&profile, &candidate.photo_id, &descriptor)
                        {
                            emit(
                                events,
                                ScanEvent::MatchFound {
                                    photo_id: result.photo_id.clone(),
                                    confidence: result.confidence,
                                    match_type: result.match_type,
                                    consensus: result.consensus,
                                },
                            )
                            .await;
                            results.push(result);
                        }

                        eta.record(item_started.elapsed());
                        current += 1;
                        let estimate = eta.estimate(total - current);
                        emit(
                            events,
                            ScanEvent::Processing {
                                current,
                                total,
                                estimated_remaining_ms: estimate.map(|d| d.as_millis() as u64),
                            },
                        )
                        .await;
                    }
                    Err(err) => {
                        tracing::debug!(
                            photo_id = %candidate.photo_id,
                            error = %err,
                            "candidate skipped"
                        );
                        eta.record(item_started.elapsed());
                        current += 1;
                        emit(
                            events,
                            ScanEvent::Error {
                                photo_id: candidate.photo_id.clone(),
                                reason: err.to_string(),
                            },
                        )
                        .await;
                    }
                }
            }

            // Natural suspension point between batches.
            tokio::task::yield_now().await;
        }

        let strong_matches = results
            .iter()
            .filter(|r| r.match_type == MatchType::Strong)
            .count();
        let average_confidence = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.confidence).sum::<f32>() / results.len() as f32
        };

        tracing::info!(
            user_id = %profile.user_id,
            total,
            matches = results.len(),
            strong_matches,
            "scan completed"
        );
        emit(
            events,
            ScanEvent::Completed {
                total_matches: results.len(),
                strong_matches,
                weak_matches: results.len() - strong_matches,
                average_confidence,
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
        )
        .await;

        ScanOutcome::Completed(results)
    }

    async fn cancelled(
        &self,
        events: &mpsc::Sender<ScanEvent>,
        current: usize,
        total: usize,
    ) -> ScanOutcome {
        tracing::info!(current, total, "scan cancelled");
        emit(events, ScanEvent::Cancelled).await;
        ScanOutcome::Cancelled
    }
}

/// A dropped or lagging receiver must never abort the scan.
async fn emit(events: &mpsc::Sender<ScanEvent>, event: ScanEvent) {
    let _ = events.send(event).await;
}
