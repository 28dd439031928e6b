//! Test doubles for the capability seams.

use crate::extractor::{DescriptorExtractor, ExtractionError, ProfileRepository, RepositoryError};
use async_trait::async_trait;
use facescan_core::Descriptor;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Extractor backed by a fixed table of `image_ref` → outcome. Unknown refs
/// fail as unreadable.
#[derive(Default)]
pub(crate) struct TableExtractor {
    table: HashMap<String, Result<Vec<f32>, ExtractionError>>,
    calls: AtomicUsize,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl TableExtractor {
    pub(crate) fn new(
        entries: impl IntoIterator<Item = (String, Result<Vec<f32>, ExtractionError>)>,
    ) -> Self {
        Self {
            table: entries.into_iter().collect(),
            calls: AtomicUsize::new(0),
            cancel_after: None,
        }
    }

    /// Trip `token` during the `n`-th extraction call, simulating a caller
    /// cancelling while an item is in flight.
    pub(crate) fn cancel_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DescriptorExtractor for TableExtractor {
    async fn extract(&self, image_ref: &str) -> Result<Descriptor, ExtractionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, token)) = &self.cancel_after {
            if call >= *after {
                token.cancel();
            }
        }

        match self.table.get(image_ref) {
            Some(Ok(values)) => Ok(Descriptor::new(values.clone())),
            Some(Err(err)) => Err(err.clone()),
            None => Err(ExtractionError::Unreadable {
                reason: format!("no fixture for {image_ref}"),
            }),
        }
    }
}

/// Extractor that blocks until the test releases a permit, making scan
/// interleavings deterministic. Every successful call yields a zero vector
/// of the configured dimensionality.
pub(crate) struct GatedExtractor {
    gate: Semaphore,
    dim: usize,
}

impl GatedExtractor {
    pub(crate) fn new(dim: usize) -> Self {
        Self {
            gate: Semaphore::new(0),
            dim,
        }
    }

    pub(crate) fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }
}

#[async_trait]
impl DescriptorExtractor for GatedExtractor {
    async fn extract(&self, _image_ref: &str) -> Result<Descriptor, ExtractionError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ExtractionError::Inference {
                reason: "gate closed".into(),
            })?;
        permit.forget();
        Ok(Descriptor::new(vec![0.0; self.dim]))
    }
}

/// Repository backed by a fixed user → enrollment-image map.
#[derive(Default)]
pub(crate) struct TableRepository {
    users: HashMap<String, Vec<String>>,
}

impl TableRepository {
    pub(crate) fn with_user(user_id: &str, image_refs: Vec<String>) -> Self {
        let mut users = HashMap::new();
        users.insert(user_id.to_string(), image_refs);
        Self { users }
    }
}

#[async_trait]
impl ProfileRepository for TableRepository {
    async fn load_enrollment_images(&self, user_id: &str) -> Result<Vec<String>, RepositoryError> {
        self.users
            .get(user_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }
}
