//! In-memory, process-lifetime profile cache.

use facescan_core::{Descriptor, FaceProfile, ProfileError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Memory-first cache mapping a user to their enrolled profile.
///
/// Profiles are immutable once installed and shared read-only across
/// concurrent scans. `install` is the only mutator and replaces the whole
/// entry; reads never touch the network once a profile is hydrated.
pub struct ProfileStore {
    descriptor_dim: usize,
    profiles: RwLock<HashMap<String, Arc<FaceProfile>>>,
}

impl ProfileStore {
    pub fn new(descriptor_dim: usize) -> Self {
        Self {
            descriptor_dim,
            profiles: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<FaceProfile>> {
        self.profiles.read().get(user_id).cloned()
    }

    /// Existence check without forcing hydration.
    pub fn has(&self, user_id: &str) -> bool {
        self.profiles.read().contains_key(user_id)
    }

    /// Validate and install a profile, atomically replacing any prior one.
    ///
    /// A failed install leaves the prior profile untouched.
    pub fn install(
        &self,
        user_id: &str,
        descriptors: Vec<Descriptor>,
        source_image_refs: Vec<String>,
    ) -> Result<Arc<FaceProfile>, ProfileError> {
        for descriptor in &descriptors {
            if descriptor.len() != self.descriptor_dim {
                return Err(ProfileError::WrongDimension {
                    expected: self.descriptor_dim,
                    got: descriptor.len(),
                });
            }
        }

        let profile = Arc::new(FaceProfile::new(user_id, descriptors, source_image_refs)?);
        self.profiles
            .write()
            .insert(user_id.to_string(), profile.clone());
        tracing::info!(
            user_id,
            descriptors = profile.descriptors.len(),
            "profile installed"
        );
        Ok(profile)
    }

    pub fn remove(&self, user_id: &str) {
        self.profiles.write().remove(user_id);
    }
}
