//! # Page Pool Allocator
//!
//! A [`PagePool`] owns a quota of page units and turns byte-sized requests
//! into [`Allocation`]s, one [`PhysicalBlock`] per page drawn from its
//! [`PageProvider`].
//!
//! ## Accounting
//!
//! `allocated_pages` lives inside a [`SpinMutex`] and is only ever changed
//! while the lock is held, so concurrent requests cannot jointly exceed the
//! quota. Waiting for that lock is interruptible.
//!
//! - **allocate** is all-or-nothing: pages obtained by a call that ends up
//!   short are handed back before the lock is dropped and the counter is left
//!   untouched.
//! - **release** updates the counter under the lock and returns the pages to
//!   the provider after dropping it.
//!
//! ```
//! use kernel_memory_addresses::Size4K;
//! use kernel_page_pool::config::PoolConfig;
//! use kernel_page_pool::{PagePool, PageProvider};
//! use kernel_memory_addresses::PhysicalPage;
//! use kernel_sync::Uninterruptible;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! struct Bump(AtomicU64);
//!
//! impl PageProvider<Size4K> for Bump {
//!     fn alloc_page(&self) -> Option<PhysicalPage<Size4K>> {
//!         Some(PhysicalPage::from_frame_number(self.0.fetch_add(1, Ordering::Relaxed)))
//!     }
//!     fn scrub_page(&self, _page: PhysicalPage<Size4K>) {}
//!     fn free_page(&self, _page: PhysicalPage<Size4K>) {}
//! }
//!
//! let pool = PagePool::<_, Size4K>::new(
//!     PoolConfig::new().with_quota_bytes(3 * 4096),
//!     Bump(AtomicU64::new(0x78000)),
//! );
//!
//! let a = pool.allocate(2 * 4096, &Uninterruptible).unwrap();
//! assert_eq!(a.page_count(), 2);
//! assert!(pool.allocate(2 * 4096, &Uninterruptible).is_err());
//!
//! pool.release(a, &Uninterruptible).unwrap();
//! assert_eq!(pool.usage().allocated_pages, 0);
//! ```

use crate::block::{Allocation, PhysicalBlock, PoolId};
use crate::config::PoolConfig;
use crate::provider::PageProvider;
use alloc::vec::Vec;
use core::marker::PhantomData;
use kernel_memory_addresses::PageSize;
use kernel_sync::{Interrupt, Interrupted, MutexGuard, RawSpin, SpinMutex};
use log::{debug, error, trace, warn};

/// Failure of [`PagePool::allocate`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Quota or provider exhausted. Nothing was kept.
    #[error("insufficient memory: needed {needed} pages, obtained {obtained}")]
    InsufficientMemory { needed: u64, obtained: u64 },
    /// A signal arrived while waiting for the pool lock. Nothing was touched.
    #[error("interrupted while waiting for the pool lock")]
    Interrupted,
    /// The block list for the request could not be allocated.
    #[error("failed to allocate the block list for {pages} pages")]
    AllocationFailed { pages: u64 },
}

impl From<Interrupted> for PoolError {
    fn from(_: Interrupted) -> Self {
        Self::Interrupted
    }
}

/// Failure of [`PagePool::release`]; hands the allocation back.
#[derive(Debug, thiserror::Error)]
pub enum ReleaseError<S: PageSize> {
    /// A signal arrived while waiting for the pool lock. Nothing was freed;
    /// retry with the contained allocation.
    #[error("interrupted while waiting for the pool lock, {} pages still held", .0.page_count())]
    Interrupted(Allocation<S>),
}

impl<S: PageSize> ReleaseError<S> {
    #[must_use]
    pub fn into_allocation(self) -> Allocation<S> {
        match self {
            Self::Interrupted(allocation) => allocation,
        }
    }
}

/// Snapshot of a pool's accounting.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PoolUsage {
    pub max_pages: usize,
    pub allocated_pages: usize,
}

impl PoolUsage {
    #[must_use]
    pub const fn free_pages(&self) -> usize {
        self.max_pages - self.allocated_pages
    }
}

/// The allocate/release seam a mapped region releases through.
///
/// [`PagePool`] is the OS-page backend; other backends (a dedicated carve-out
/// handed out in one piece, for instance) implement the same contract.
pub trait MemoryBackend {
    type Granule: PageSize;

    /// # Errors
    /// See [`PagePool::allocate`].
    fn allocate(
        &self,
        size_bytes: u64,
        interrupt: &dyn Interrupt,
    ) -> Result<Allocation<Self::Granule>, PoolError>;

    /// # Errors
    /// See [`PagePool::release`].
    fn release(
        &self,
        allocation: Allocation<Self::Granule>,
        interrupt: &dyn Interrupt,
    ) -> Result<(), ReleaseError<Self::Granule>>;

    /// Release from a context that must not give up, e.g. address-space
    /// teardown.
    fn release_uninterruptible(&self, allocation: Allocation<Self::Granule>);

    fn usage(&self) -> PoolUsage;

    /// Tag carried by every allocation this backend hands out.
    fn pool_id(&self) -> PoolId;
}

/// Quota-bounded pool of `S`-sized physical pages drawn from `P`.
pub struct PagePool<P, S: PageSize> {
    id: PoolId,
    name: &'static str,
    max_pages: usize,
    provider: P,
    allocated_pages: SpinMutex<usize>,
    _granule: PhantomData<S>,
}

impl<P, S> PagePool<P, S>
where
    P: PageProvider<S>,
    S: PageSize,
{
    /// Create a pool with `config.quota_bytes() / S::SIZE` pages of quota.
    #[must_use]
    pub fn new(config: PoolConfig, provider: P) -> Self {
        let pool = Self {
            id: PoolId::next(),
            name: config.name(),
            max_pages: config.max_pages::<S>(),
            provider,
            allocated_pages: SpinMutex::new(0),
            _granule: PhantomData,
        };

        debug!(
            "{} ({}): created with a quota of {} {} pages",
            pool.name,
            pool.id,
            pool.max_pages,
            S::as_str()
        );
        pool
    }

    #[must_use]
    pub const fn id(&self) -> PoolId {
        self.id
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn usage(&self) -> PoolUsage {
        PoolUsage {
            max_pages: self.max_pages,
            allocated_pages: *self.allocated_pages.lock(),
        }
    }

    /// Grant `size_bytes`, rounded up to whole pages.
    ///
    /// Every page is scrubbed before it is exposed. A zero-byte request
    /// succeeds with no blocks.
    ///
    /// # Errors
    /// - [`PoolError::Interrupted`] if `interrupt` fired while waiting for the
    ///   lock.
    /// - [`PoolError::AllocationFailed`] if the block list could not be
    ///   allocated.
    /// - [`PoolError::InsufficientMemory`] if the quota or the provider ran
    ///   out; every page taken by this call has been returned.
    pub fn allocate<I>(&self, size_bytes: u64, interrupt: &I) -> Result<Allocation<S>, PoolError>
    where
        I: Interrupt + ?Sized,
    {
        let needed = S::pages_for(size_bytes);
        if needed == 0 {
            return Ok(Allocation::new(self.id, 0, Vec::new()));
        }

        let mut allocated = self.allocated_pages.lock_interruptible(interrupt).inspect_err(|_| {
            warn!("{}: interrupted waiting to allocate {size_bytes} bytes", self.name);
        })?;

        let available = self.max_pages - *allocated;
        let wanted = match usize::try_from(needed) {
            Ok(wanted) if wanted <= available => wanted,
            _ => {
                drop(allocated);
                debug!(
                    "{}: {needed} pages requested, {available} left in quota",
                    self.name
                );
                return Err(PoolError::InsufficientMemory {
                    needed,
                    obtained: 0,
                });
            }
        };

        let mut blocks = Vec::new();
        if blocks.try_reserve_exact(wanted).is_err() {
            drop(allocated);
            error!("{}: block list for {wanted} pages could not be allocated", self.name);
            return Err(PoolError::AllocationFailed { pages: needed });
        }

        while blocks.len() < wanted {
            let Some(page) = self.provider.alloc_page() else {
                break;
            };
            self.provider.scrub_page(page);
            trace!("{}: obtained {page}", self.name);
            blocks.push(PhysicalBlock::from_page(page));
        }

        if blocks.len() < wanted {
            let obtained = blocks.len() as u64;
            for block in blocks.drain(..).rev() {
                self.provider.free_page(block.page::<S>());
            }
            drop(allocated);

            warn!(
                "{}: provider refused after {obtained} of {needed} pages",
                self.name
            );
            return Err(PoolError::InsufficientMemory { needed, obtained });
        }

        *allocated += wanted;
        let now = *allocated;
        drop(allocated);

        debug!(
            "{}: allocated {wanted} pages for {size_bytes} bytes, {now} of {} in use",
            self.name, self.max_pages
        );
        Ok(Allocation::new(self.id, size_bytes, blocks))
    }

    /// Return `allocation` to the pool.
    ///
    /// The counter is decremented under the lock; the pages go back to the
    /// provider after the lock has been dropped.
    ///
    /// # Errors
    /// [`ReleaseError::Interrupted`] if `interrupt` fired while waiting for the
    /// lock. The allocation is handed back untouched.
    ///
    /// # Panics
    /// If `allocation` belongs to another pool, or holds more pages than this
    /// pool has accounted as allocated. Either means the bookkeeping is
    /// already corrupt.
    pub fn release<I>(
        &self,
        allocation: Allocation<S>,
        interrupt: &I,
    ) -> Result<(), ReleaseError<S>>
    where
        I: Interrupt + ?Sized,
    {
        self.check_owner(&allocation);

        match self.allocated_pages.lock_interruptible(interrupt) {
            Ok(allocated) => {
                self.finish_release(allocated, allocation);
                Ok(())
            }
            Err(Interrupted) => {
                warn!(
                    "{}: interrupted waiting to release {} pages",
                    self.name,
                    allocation.page_count()
                );
                Err(ReleaseError::Interrupted(allocation))
            }
        }
    }

    /// [`release`](Self::release) that waits for the lock no matter what.
    ///
    /// # Panics
    /// Same conditions as [`release`](Self::release).
    pub fn release_uninterruptible(&self, allocation: Allocation<S>) {
        self.check_owner(&allocation);
        let allocated = self.allocated_pages.lock();
        self.finish_release(allocated, allocation);
    }

    /// Tear the pool down, reporting pages that were never released.
    pub fn shutdown(self) {
        drop(self);
    }

    fn check_owner(&self, allocation: &Allocation<S>) {
        assert_eq!(
            allocation.pool_id(),
            self.id,
            "{}: allocation from {} released into {}",
            self.name,
            allocation.pool_id(),
            self.id
        );
    }

    fn finish_release(
        &self,
        mut allocated: MutexGuard<'_, usize, RawSpin>,
        mut allocation: Allocation<S>,
    ) {
        let pages = allocation.page_count();
        assert!(
            pages <= *allocated,
            "{}: releasing {pages} pages but only {} are accounted as allocated",
            self.name,
            *allocated
        );

        *allocated -= pages;
        drop(allocated);

        debug!("{}: releasing {pages} pages", self.name);
        for block in allocation.take_blocks() {
            self.provider.free_page(block.page::<S>());
        }
    }
}

impl<P, S> MemoryBackend for PagePool<P, S>
where
    P: PageProvider<S>,
    S: PageSize,
{
    type Granule = S;

    fn allocate(
        &self,
        size_bytes: u64,
        interrupt: &dyn Interrupt,
    ) -> Result<Allocation<S>, PoolError> {
        Self::allocate(self, size_bytes, interrupt)
    }

    fn release(
        &self,
        allocation: Allocation<S>,
        interrupt: &dyn Interrupt,
    ) -> Result<(), ReleaseError<S>> {
        Self::release(self, allocation, interrupt)
    }

    fn release_uninterruptible(&self, allocation: Allocation<S>) {
        Self::release_uninterruptible(self, allocation);
    }

    fn usage(&self) -> PoolUsage {
        Self::usage(self)
    }

    fn pool_id(&self) -> PoolId {
        self.id
    }
}

impl<P, S: PageSize> Drop for PagePool<P, S> {
    fn drop(&mut self) {
        let allocated = *self.allocated_pages.get_mut();
        if allocated == 0 {
            debug!("{} ({}): shut down", self.name, self.id);
        } else {
            error!(
                "{} ({}): {allocated} pages still in use during shutdown",
                self.name, self.id
            );
        }
    }
}
