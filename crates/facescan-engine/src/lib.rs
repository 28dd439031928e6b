//! facescan-engine — profile-driven photo scanning.
//!
//! Builds a durable identity profile per user from enrollment images, then
//! scans candidate photo collections against it: batched sequencing with
//! cooperative cancellation, per-item failure isolation, a moving-average
//! ETA, and a typed progress event stream.

pub mod config;
pub mod controller;
pub mod eta;
pub mod events;
pub mod extractor;
mod scheduler;
pub mod store;

pub use config::EngineConfig;
pub use controller::{JobController, ScanError, ScanStatus};
pub use events::ScanEvent;
pub use extractor::{DescriptorExtractor, ExtractionError, ProfileRepository, RepositoryError};
pub use store::ProfileStore;

#[cfg(test)]
pub(crate) mod testutil;
