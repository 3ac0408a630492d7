//! Registry of platform profiles keyed by id.

use std::sync::Arc;

use promptlift_config::PlatformEntry;
use tracing::{debug, info};

use super::PlatformProfile;
use super::builtin::builtin_profiles;
use crate::error::EngineError;

/// Platform profiles in registration order. Later registrations with the
/// same id replace earlier ones in place.
#[derive(Debug, Clone, Default)]
pub struct PlatformRegistry {
    profiles: Vec<Arc<PlatformProfile>>,
}

impl PlatformRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in profiles.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for profile in builtin_profiles() {
            registry.register(profile);
        }
        registry
    }

    /// Built-ins followed by configured entries, which may override by id.
    pub fn from_config(entries: &[PlatformEntry]) -> Result<Self, EngineError> {
        let mut registry = Self::with_builtins();
        for entry in entries {
            let profile = PlatformProfile::try_from(entry)?;
            info!("Loaded platform profile from config: {}", profile.id);
            registry.register(profile);
        }
        Ok(registry)
    }

    pub fn register(&mut self, profile: PlatformProfile) {
        let profile = Arc::new(profile);
        match self.profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(slot) => {
                debug!("Replacing platform profile: {}", profile.id);
                *slot = profile;
            }
            None => self.profiles.push(profile),
        }
    }

    /// First profile whose URL matcher accepts `url`.
    pub fn detect(&self, url: &str) -> Option<Arc<PlatformProfile>> {
        self.profiles.iter().find(|p| p.url.matches(url)).cloned()
    }

    pub fn get(&self, id: &str) -> Option<Arc<PlatformProfile>> {
        self.profiles.iter().find(|p| p.id == id).cloned()
    }

    pub fn list(&self) -> &[Arc<PlatformProfile>] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
