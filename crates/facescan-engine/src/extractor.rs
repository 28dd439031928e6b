//! Capability seams the engine consumes but does not implement.

use async_trait::async_trait;
use facescan_core::Descriptor;
use thiserror::Error;

/// Per-image extraction failure. Recoverable during a scan: the photo is
/// reported through an `error` event and processing continues.
#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    #[error("image unreadable: {reason}")]
    Unreadable { reason: String },
    #[error("no face detected")]
    NoFaceDetected,
    #[error("inference failed: {reason}")]
    Inference { reason: String },
}

/// Turns one image into a fixed-length descriptor.
///
/// Implementations must be deterministic enough that repeated calls on the
/// same image land within negligible distance of each other. Latency is
/// outside the engine's control; the scheduler treats each call as a
/// suspension point.
#[async_trait]
pub trait DescriptorExtractor: Send + Sync {
    async fn extract(&self, image_ref: &str) -> Result<Descriptor, ExtractionError>;
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("no enrollment images recorded for user")]
    NotFound,
    #[error("repository backend: {reason}")]
    Backend { reason: String },
}

/// Durable record of which enrollment images belong to which user.
///
/// Consulted only to rehydrate the in-memory profile cache on a cold miss;
/// the engine re-extracts one descriptor per returned image.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn load_enrollment_images(&self, user_id: &str) -> Result<Vec<String>, RepositoryError>;
}
