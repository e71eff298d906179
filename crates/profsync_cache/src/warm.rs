//! Cache warm-up under device and sync constraints.

use crate::config::CacheConfig;
use crate::entry::{CachePriority, Provenance};
use crate::error::CacheResult;
use crate::manager::CacheManager;
use profsync_protocol::ConnectionType;
use tracing::{debug, warn};

/// Device conditions relevant to warm-up planning.
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    /// Memory available to the app, in bytes.
    pub available_memory_bytes: u64,
    /// The active connection type.
    pub connection_type: ConnectionType,
    /// Whether the OS reports low-power mode.
    pub low_power_mode: bool,
}

impl DeviceCapabilities {
    /// An unconstrained device, useful as a test baseline.
    #[must_use]
    pub fn unconstrained() -> Self {
        Self {
            available_memory_bytes: u64::MAX,
            connection_type: ConnectionType::Wifi,
            low_power_mode: false,
        }
    }
}

/// Sync-engine pressure fed back into warm-up planning.
///
/// A deep queue or unresolved conflicts mean the device is about to spend
/// memory and bandwidth on draining; warm-up yields the heavyweight
/// sections in that case.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncLoad {
    /// Operations waiting in the sync queue.
    pub queue_depth: usize,
    /// Whether any conflict is awaiting resolution.
    pub has_unresolved_conflicts: bool,
}

impl SyncLoad {
    /// Queue depth beyond which warm-up treats the engine as busy.
    pub const BUSY_QUEUE_DEPTH: usize = 5;

    /// Returns true if the engine is busy enough to constrain warm-up.
    #[must_use]
    pub fn is_heavy(&self) -> bool {
        self.queue_depth > Self::BUSY_QUEUE_DEPTH || self.has_unresolved_conflicts
    }
}

/// Loads one section's payload for warm-up.
///
/// Injected by the caller; typically backed by the durable store or the
/// remote API when online.
pub trait SectionLoader: Send + Sync {
    /// Loads the payload for `section` of `user_id`'s profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the section cannot be loaded; warm-up skips
    /// the section and continues.
    fn load(&self, user_id: &str, section: &str) -> CacheResult<Vec<u8>>;
}

impl<F> SectionLoader for F
where
    F: Fn(&str, &str) -> CacheResult<Vec<u8>> + Send + Sync,
{
    fn load(&self, user_id: &str, section: &str) -> CacheResult<Vec<u8>> {
        self(user_id, section)
    }
}

/// Plans which sections to warm, in order.
///
/// Deterministic: (1) the caller-supplied order is kept, (2) at most
/// `low_memory_section_limit` sections survive on a low-memory device,
/// (3) heavyweight sections are dropped on cellular, in low-power mode,
/// or under heavy sync load.
#[must_use]
pub fn plan_warm_sections(
    sections: &[String],
    capabilities: &DeviceCapabilities,
    sync_load: SyncLoad,
    config: &CacheConfig,
) -> Vec<String> {
    let mut planned: Vec<String> = sections.to_vec();

    if capabilities.available_memory_bytes < config.low_memory_threshold {
        planned.truncate(config.low_memory_section_limit);
    }

    let drop_heavyweight = capabilities.connection_type == ConnectionType::Cellular
        || capabilities.low_power_mode
        || sync_load.is_heavy();
    if drop_heavyweight {
        planned.retain(|s| !config.heavyweight_sections.contains(s));
    }

    planned
}

impl CacheManager {
    /// Warms the planned sections for `user_id` through `loader`.
    ///
    /// Sections are loaded sequentially in plan order to respect device
    /// memory and battery constraints; each successful load is stored at
    /// [`CachePriority::High`]. A loader failure skips that section.
    ///
    /// Returns the sections actually warmed.
    ///
    /// # Errors
    ///
    /// Returns an error only on a cache contract violation; loader
    /// failures are logged and skipped.
    pub fn warm(
        &self,
        user_id: &str,
        sections: &[String],
        capabilities: &DeviceCapabilities,
        sync_load: SyncLoad,
        loader: &dyn SectionLoader,
    ) -> CacheResult<Vec<String>> {
        let plan = plan_warm_sections(sections, capabilities, sync_load, self.config());
        debug!(user_id, planned = plan.len(), requested = sections.len(), "warm-up plan");

        let mut warmed = Vec::new();
        for section in plan {
            match loader.load(user_id, &section) {
                Ok(payload) => {
                    let key = format!("{user_id}/{section}");
                    self.set_with_provenance(
                        &key,
                        payload,
                        None,
                        CachePriority::High,
                        Provenance::Confirmed,
                    )?;
                    warmed.push(section);
                }
                Err(e) => {
                    warn!(user_id, section, error = %e, "warm-up load failed, skipping");
                }
            }
        }
        Ok(warmed)
    }
}
