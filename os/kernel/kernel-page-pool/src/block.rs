//! Physical blocks and the allocations built from them.

use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicU64, Ordering};
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage};
use log::warn;

/// One physically contiguous run backing part of an [`Allocation`].
///
/// Pools hand out exactly one page per block; adjacent pages are never
/// coalesced.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PhysicalBlock {
    addr: PhysicalAddress,
    size: u64,
}

impl PhysicalBlock {
    #[must_use]
    pub const fn new(addr: PhysicalAddress, size: u64) -> Self {
        Self { addr, size }
    }

    #[must_use]
    pub const fn from_page<S: PageSize>(page: PhysicalPage<S>) -> Self {
        Self::new(page.base(), S::SIZE)
    }

    #[must_use]
    pub const fn addr(&self) -> PhysicalAddress {
        self.addr
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// The `S` page this block starts in.
    #[must_use]
    pub const fn page<S: PageSize>(&self) -> PhysicalPage<S> {
        self.addr.page::<S>()
    }
}

/// Identity of the pool an [`Allocation`] was carved from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PoolId(u64);

impl PoolId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// A granted memory request: the pages behind it, in allocation order.
///
/// Allocations only come out of a pool and only go back through
/// [`PagePool::release`](crate::PagePool::release). Dropping one that still
/// holds pages leaks them (and says so).
#[must_use = "dropping an allocation leaks its pages; release it through its pool"]
pub struct Allocation<S: PageSize> {
    pool: PoolId,
    requested_size: u64,
    blocks: Vec<PhysicalBlock>,
    _granule: PhantomData<S>,
}

impl<S: PageSize> Allocation<S> {
    pub(crate) const fn new(pool: PoolId, requested_size: u64, blocks: Vec<PhysicalBlock>) -> Self {
        Self {
            pool,
            requested_size,
            blocks,
            _granule: PhantomData,
        }
    }

    #[must_use]
    pub const fn pool_id(&self) -> PoolId {
        self.pool
    }

    /// Bytes the consumer asked for.
    #[must_use]
    pub const fn requested_size(&self) -> u64 {
        self.requested_size
    }

    #[must_use]
    pub fn blocks(&self) -> &[PhysicalBlock] {
        &self.blocks
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.blocks.len()
    }

    /// Bytes actually backed, i.e. the request rounded up to whole pages.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.blocks.iter().map(PhysicalBlock::size).sum()
    }

    pub(crate) fn take_blocks(&mut self) -> Vec<PhysicalBlock> {
        core::mem::take(&mut self.blocks)
    }
}

impl<S: PageSize> fmt::Debug for Allocation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocation")
            .field("pool", &self.pool)
            .field("granule", &S::as_str())
            .field("requested_size", &self.requested_size)
            .field("pages", &self.blocks.len())
            .finish()
    }
}

impl<S: PageSize> Drop for Allocation<S> {
    fn drop(&mut self) {
        if !self.blocks.is_empty() {
            warn!(
                "{}: allocation of {} bytes dropped without release, leaking {} pages",
                self.pool,
                self.requested_size,
                self.blocks.len()
            );
        }
    }
}
