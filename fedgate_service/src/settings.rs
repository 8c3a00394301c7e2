use std::sync::atomic::{AtomicBool, Ordering};

use fedgate_clap_blocks::fragment_cache::FragmentCacheConfig;

/// Process-wide settings that may change while the service runs.
///
/// Request handlers take a [`snapshot`](Self::snapshot) at the start of every call, so a
/// change applies to the next call.
#[derive(Debug)]
pub struct ServiceSettings {
    fragment_cache_enabled: AtomicBool,
}

impl ServiceSettings {
    pub fn new(fragment_cache_enabled: bool) -> Self {
        Self {
            fragment_cache_enabled: AtomicBool::new(fragment_cache_enabled),
        }
    }

    pub fn snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            fragment_cache_enabled: self.fragment_cache_enabled.load(Ordering::Acquire),
        }
    }

    pub fn set_fragment_cache_enabled(&self, enabled: bool) {
        self.fragment_cache_enabled.store(enabled, Ordering::Release);
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::new(true)
    }
}

impl From<&FragmentCacheConfig> for ServiceSettings {
    fn from(config: &FragmentCacheConfig) -> Self {
        Self::new(config.enabled)
    }
}

/// [`ServiceSettings`] as seen by one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsSnapshot {
    pub fragment_cache_enabled: bool,
}
