//! Job controller: at-most-one active scan per user, cancellation, and the
//! two-tier profile lookup (memory-first cache, durable repository behind it).

use crate::config::EngineConfig;
use crate::events::ScanEvent;
use crate::extractor::{DescriptorExtractor, ProfileRepository, RepositoryError};
use crate::scheduler::{BatchScheduler, ScanOutcome};
use crate::store::ProfileStore;
use chrono::{DateTime, Utc};
use facescan_core::{Candidate, FaceProfile, MatchResult, ProfileError};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Fatal scan errors. All of these reject before a single progress event is
/// emitted, so a caller can distinguish "never started" from "started and
/// had some bad photos". Per-photo failures are only ever surfaced as
/// `error` events.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("a scan is already running for user {user_id}")]
    AlreadyRunning { user_id: String },
    #[error("candidate set is empty")]
    EmptyCandidateSet,
    #[error("no enrollment profile for user {user_id}")]
    NoProfile { user_id: String },
    #[error("invalid profile: {0}")]
    InvalidProfile(#[from] ProfileError),
    #[error("enrollment image {image_ref} could not be processed: {reason}")]
    EnrollmentExtraction { image_ref: String, reason: String },
    #[error("profile load failed for user {user_id}: {reason}")]
    ProfileLoad { user_id: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Idle,
    Running,
    Cancelling,
    Completed,
    Cancelled,
    Failed,
}

/// Per-user scan bookkeeping. The controller is the sole owner; the
/// scheduler task executing the scan is the only writer while it runs.
struct ScanState {
    status: ScanStatus,
    cancel: CancellationToken,
    started_at: DateTime<Utc>,
}

/// Front door of the engine: owns the profile store, the per-user scan
/// table, and the injected capabilities.
pub struct JobController {
    config: EngineConfig,
    store: ProfileStore,
    extractor: Arc<dyn DescriptorExtractor>,
    repository: Arc<dyn ProfileRepository>,
    scans: Mutex<HashMap<String, ScanState>>,
}

impl JobController {
    pub fn new(
        config: EngineConfig,
        extractor: Arc<dyn DescriptorExtractor>,
        repository: Arc<dyn ProfileRepository>,
    ) -> Self {
        let store = ProfileStore::new(config.descriptor_dim);
        Self {
            config,
            store,
            extractor,
            repository,
            scans: Mutex::new(HashMap::new()),
        }
    }

    /// Scan `candidates` for the user's face, streaming progress into
    /// `events`.
    ///
    /// Runs on the caller's task and always reaches a terminal state. At
    /// most one scan may run per user; a second start is rejected with
    /// [`ScanError::AlreadyRunning`], not queued. Returns results in scan
    /// order; a cancelled run returns an empty list by contract.
    pub async fn start_scan(
        &self,
        user_id: &str,
        candidates: Vec<Candidate>,
        events: mpsc::Sender<ScanEvent>,
    ) -> Result<Vec<MatchResult>, ScanError> {
        if candidates.is_empty() {
            return Err(ScanError::EmptyCandidateSet);
        }

        let cancel = self.admit(user_id)?;

        let profile = match self.ensure_profile(user_id).await {
            Ok(profile) => profile,
            Err(err) => {
                self.settle(user_id, ScanStatus::Failed);
                return Err(err);
            }
        };

        tracing::info!(user_id, candidates = candidates.len(), "scan started");
        let scheduler = BatchScheduler::new(self.extractor.clone(), &self.config);
        match scheduler.run(profile, candidates, &events, &cancel).await {
            ScanOutcome::Completed(results) => {
                self.settle(user_id, ScanStatus::Completed);
                Ok(results)
            }
            ScanOutcome::Cancelled => {
                self.settle(user_id, ScanStatus::Cancelled);
                Ok(Vec::new())
            }
        }
    }

    /// Signal cancellation for the user's running scan. Idempotent; a cancel
    /// on a non-running job is a no-op, not an error. The scheduler finishes
    /// the in-flight candidate and then lands on `Cancelled`.
    pub fn cancel_scan(&self, user_id: &str) {
        let mut scans = self.scans.lock();
        if let Some(state) = scans.get_mut(user_id) {
            if matches!(state.status, ScanStatus::Running | ScanStatus::Cancelling) {
                tracing::info!(user_id, "cancellation requested");
                state.cancel.cancel();
                state.status = ScanStatus::Cancelling;
            }
        }
    }

    /// Clear the user's scan state and cached profile for a fully clean
    /// slate (e.g., before enrolling a new profile). Rejected while a scan
    /// is running.
    pub fn reset(&self, user_id: &str) -> Result<(), ScanError> {
        let mut scans = self.scans.lock();
        if let Some(state) = scans.get(user_id) {
            if matches!(state.status, ScanStatus::Running | ScanStatus::Cancelling) {
                return Err(ScanError::AlreadyRunning {
                    user_id: user_id.to_string(),
                });
            }
        }
        scans.remove(user_id);
        self.store.remove(user_id);
        Ok(())
    }

    pub fn status(&self, user_id: &str) -> ScanStatus {
        self.scans
            .lock()
            .get(user_id)
            .map(|state| state.status)
            .unwrap_or(ScanStatus::Idle)
    }

    /// When the user's most recent scan was admitted, if any.
    pub fn started_at(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.scans.lock().get(user_id).map(|state| state.started_at)
    }

    pub fn has_profile(&self, user_id: &str) -> bool {
        self.store.has(user_id)
    }

    /// Extract a descriptor per enrollment image and install the profile,
    /// replacing any prior one. Any image that fails extraction fails the
    /// whole install; a profile must cover every pose the caller supplied.
    pub async fn install_profile(
        &self,
        user_id: &str,
        enrollment_image_refs: Vec<String>,
    ) -> Result<Arc<FaceProfile>, ScanError> {
        if enrollment_image_refs.is_empty() {
            return Err(ScanError::InvalidProfile(ProfileError::EmptyDescriptorSet));
        }

        let mut descriptors = Vec::with_capacity(enrollment_image_refs.len());
        for image_ref in &enrollment_image_refs {
            let descriptor = self.extractor.extract(image_ref).await.map_err(|err| {
                ScanError::EnrollmentExtraction {
                    image_ref: image_ref.clone(),
                    reason: err.to_string(),
                }
            })?;
            descriptors.push(descriptor);
        }

        Ok(self
            .store
            .install(user_id, descriptors, enrollment_image_refs)?)
    }

    /// Two-tier lookup: memory first, then rehydrate from the durable
    /// repository by re-extracting each recorded enrollment image.
    async fn ensure_profile(&self, user_id: &str) -> Result<Arc<FaceProfile>, ScanError> {
        if let Some(profile) = self.store.get(user_id) {
            return Ok(profile);
        }

        let refs = self
            .repository
            .load_enrollment_images(user_id)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => ScanError::NoProfile {
                    user_id: user_id.to_string(),
                },
                RepositoryError::Backend { reason } => ScanError::ProfileLoad {
                    user_id: user_id.to_string(),
                    reason,
                },
            })?;
        if refs.is_empty() {
            return Err(ScanError::NoProfile {
                user_id: user_id.to_string(),
            });
        }

        tracing::info!(user_id, images = refs.len(), "rehydrating profile");
        self.install_profile(user_id, refs).await
    }

    /// Admit a new scan for the user, rejecting if one is already active.
    fn admit(&self, user_id: &str) -> Result<CancellationToken, ScanError> {
        let mut scans = self.scans.lock();
        if let Some(state) = scans.get(user_id) {
            if matches!(state.status, ScanStatus::Running | ScanStatus::Cancelling) {
                return Err(ScanError::AlreadyRunning {
                    user_id: user_id.to_string(),
                });
            }
        }

        let cancel = CancellationToken::new();
        scans.insert(
            user_id.to_string(),
            ScanState {
                status: ScanStatus::Running,
                cancel: cancel.clone(),
                started_at: Utc::now(),
            },
        );
        Ok(cancel)
    }

    fn settle(&self, user_id: &str, status: ScanStatus) {
        if let Some(state) = self.scans.lock().get_mut(user_id) {
            state.status = status;
        }
    }
}
