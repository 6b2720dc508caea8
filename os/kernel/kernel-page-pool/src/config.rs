//! # Pool Configuration
//!
//! Compile-time defaults and the [`PoolConfig`] value a pool is created from.

use kernel_memory_addresses::PageSize;

/// Default quota of an OS-backed pool: 32 MiB.
pub const DEFAULT_QUOTA_BYTES: u64 = 32 * 1024 * 1024;

/// Name used in diagnostics when none is configured.
pub const DEFAULT_POOL_NAME: &str = "os";

/// Creation parameters for a [`PagePool`](crate::PagePool).
///
/// ```
/// use kernel_page_pool::config::PoolConfig;
/// use kernel_memory_addresses::Size4K;
///
/// let config = PoolConfig::new().with_name("gpu").with_quota_bytes(3 * 4096 + 100);
/// assert_eq!(config.max_pages::<Size4K>(), 3);
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PoolConfig {
    name: &'static str,
    quota_bytes: u64,
}

impl PoolConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: DEFAULT_POOL_NAME,
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }

    #[must_use]
    pub const fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    #[must_use]
    pub const fn with_quota_bytes(mut self, quota_bytes: u64) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn quota_bytes(&self) -> u64 {
        self.quota_bytes
    }

    /// Quota in whole pages of granule `S` (rounded down).
    #[must_use]
    pub fn max_pages<S: PageSize>(&self) -> usize {
        usize::try_from(S::pages_in(self.quota_bytes)).unwrap_or(usize::MAX)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
