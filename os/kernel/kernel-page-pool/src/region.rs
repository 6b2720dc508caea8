//! # Mapped-Region Lifetime Tracking
//!
//! A [`MappedRegion`] is the virtual window through which one [`Allocation`]
//! is exposed. Every holder of the window (the original mapping and any
//! duplicates created by `fork`) accounts for one reference; the allocation
//! goes back to its [`MemoryBackend`] when the last holder closes.
//!
//! ```text
//!   attach ──► Active(1) ──on_duplicate──► Active(2) ──on_destroy──► Active(1)
//!                  │                                                    │
//!                  └────────────────────on_destroy──────────────────────┤
//!                                                                       ▼
//!                                                                   Released
//! ```
//!
//! Reference counting is lock free. The only lock taken on the close path is
//! the one guarding the allocation slot, and only by the decrementer that
//! observed the count reach zero.
//!
//! The environment drives a region through [`RegionOps`] and installs
//! translations through an [`AddressSpace`] it provides.

use crate::attributes::RegionAttributes;
use crate::block::{Allocation, PhysicalBlock, PoolId};
use crate::pool::MemoryBackend;
use core::sync::atomic::{AtomicUsize, Ordering};
use kernel_memory_addresses::{PageSize, PhysicalAddress, VirtualAddress};
use kernel_sync::SpinMutex;
use log::{debug, error, trace};

/// Page-aligned span of virtual addresses reserved for a region.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VirtualRange {
    start: VirtualAddress,
    len: u64,
}

impl VirtualRange {
    #[must_use]
    pub const fn new(start: VirtualAddress, len: u64) -> Self {
        Self { start, len }
    }

    #[must_use]
    pub const fn start(&self) -> VirtualAddress {
        self.start
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `[offset, offset + len)` lies inside the range.
    #[must_use]
    pub const fn covers(&self, offset: u64, len: u64) -> bool {
        match offset.checked_add(len) {
            Some(end) => end <= self.len,
            None => false,
        }
    }

    /// First address past the range, or `None` if the range wraps the
    /// address space.
    #[must_use]
    pub const fn end(&self) -> Option<VirtualAddress> {
        self.start.checked_add(self.len)
    }

    #[must_use]
    pub fn is_aligned<S: PageSize>(&self) -> bool {
        self.start.is_aligned::<S>() && S::is_aligned(self.len)
    }
}

/// Failure reported by the environment when installing a translation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstallError {
    #[error("out of memory for page tables")]
    OutOfMemory,
    #[error("virtual address {0} is already mapped")]
    AlreadyMapped(VirtualAddress),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    /// `[offset, offset + len)` does not fit the reserved range, or is not
    /// page aligned.
    #[error(
        "cannot map {len:#x} bytes at offset {offset:#x} into a region of {range_len:#x} bytes"
    )]
    MappingFault { offset: u64, len: u64, range_len: u64 },
    /// The environment refused to install the translation.
    #[error("installing the translation at offset {offset:#x} failed")]
    InstallFailed {
        offset: u64,
        #[source]
        source: InstallError,
    },
    /// A fault was delivered for a region that is mapped eagerly.
    #[error("unexpected fault at {address} in region starting at {start}")]
    UnexpectedFault {
        address: VirtualAddress,
        start: VirtualAddress,
    },
    /// The allocation was not produced by the region's backend.
    #[error("allocation from {allocation} cannot be attached to a region backed by {backend}")]
    ForeignAllocation { allocation: PoolId, backend: PoolId },
    /// The region's last reference is already gone.
    #[error("region has been released")]
    Released,
}

/// Failure of [`MappedRegion::attach`]; hands the allocation back.
#[derive(Debug, thiserror::Error)]
#[error("failed to attach allocation: {reason}")]
pub struct AttachError<S: PageSize> {
    #[source]
    pub reason: RegionError,
    pub allocation: Allocation<S>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegionState {
    /// Live, with this many holders.
    Active(usize),
    /// The backing allocation has been returned. Terminal.
    Released,
}

/// Environment side of a region: where translations go.
pub trait AddressSpace {
    /// Map `[va, va + len)` to `[pa, pa + len)` with `attributes`.
    ///
    /// # Errors
    /// Whatever the environment cannot do; see [`InstallError`].
    fn install(
        &self,
        va: VirtualAddress,
        pa: PhysicalAddress,
        len: u64,
        attributes: RegionAttributes,
    ) -> Result<(), InstallError>;
}

/// Callbacks the environment invokes on a region's holders.
pub trait RegionOps {
    /// A holder was duplicated. Returns the new count.
    ///
    /// # Errors
    /// [`RegionError::Released`] if the region is already gone.
    fn on_duplicate(&self) -> Result<usize, RegionError>;

    /// A holder closed. The call that drops the count to zero releases the
    /// backing allocation.
    ///
    /// # Errors
    /// [`RegionError::Released`] if the region is already gone.
    fn on_destroy(&self) -> Result<RegionState, RegionError>;

    /// A page fault hit the region. Never resolvable here.
    fn on_access_fault(&self, address: VirtualAddress) -> RegionError;
}

/// Reference-counted virtual window onto one backend allocation.
pub struct MappedRegion<'b, B: MemoryBackend + ?Sized> {
    backend: &'b B,
    range: VirtualRange,
    attributes: RegionAttributes,
    references: AtomicUsize,
    backing: SpinMutex<Option<Allocation<B::Granule>>>,
}

impl<'b, B: MemoryBackend + ?Sized> MappedRegion<'b, B> {
    /// Bind `allocation` to `range` with a single holder.
    ///
    /// The region is always configured I/O-like and write-combining on top of
    /// the requested `access` rights.
    ///
    /// # Errors
    /// The allocation is handed back in every case.
    /// - [`RegionError::ForeignAllocation`] if `allocation` did not come from
    ///   `backend`.
    /// - [`RegionError::MappingFault`] if `range` is not page aligned, wraps
    ///   the address space, or is too small for the allocation.
    pub fn attach(
        backend: &'b B,
        range: VirtualRange,
        access: RegionAttributes,
        allocation: Allocation<B::Granule>,
    ) -> Result<Self, AttachError<B::Granule>> {
        if allocation.pool_id() != backend.pool_id() {
            return Err(AttachError {
                reason: RegionError::ForeignAllocation {
                    allocation: allocation.pool_id(),
                    backend: backend.pool_id(),
                },
                allocation,
            });
        }

        let needed = allocation.size_bytes();
        let fits = range.end().is_some() && range.covers(0, needed);
        if !range.is_aligned::<B::Granule>() || !fits {
            return Err(AttachError {
                reason: RegionError::MappingFault {
                    offset: 0,
                    len: needed,
                    range_len: range.len(),
                },
                allocation,
            });
        }

        debug!(
            "region {}+{:#x}: attached {} pages",
            range.start(),
            range.len(),
            allocation.page_count()
        );

        Ok(Self {
            backend,
            range,
            attributes: access.device_shared(),
            references: AtomicUsize::new(1),
            backing: SpinMutex::new(Some(allocation)),
        })
    }

    #[must_use]
    pub const fn range(&self) -> VirtualRange {
        self.range
    }

    #[must_use]
    pub const fn attributes(&self) -> RegionAttributes {
        self.attributes
    }

    #[must_use]
    pub const fn backend(&self) -> &'b B {
        self.backend
    }

    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.references.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state(&self) -> RegionState {
        match self.reference_count() {
            0 => RegionState::Released,
            n => RegionState::Active(n),
        }
    }

    /// Install the translation for `block` at `offset` into the region.
    ///
    /// # Errors
    /// - [`RegionError::Released`] if the region is gone.
    /// - [`RegionError::MappingFault`] if the block does not fit the range or
    ///   `offset` is not page aligned.
    /// - [`RegionError::InstallFailed`] if the environment refused.
    pub fn map_block<A>(
        &self,
        space: &A,
        offset: u64,
        block: &PhysicalBlock,
    ) -> Result<(), RegionError>
    where
        A: AddressSpace + ?Sized,
    {
        if self.reference_count() == 0 {
            return Err(RegionError::Released);
        }

        let fault = RegionError::MappingFault {
            offset,
            len: block.size(),
            range_len: self.range.len(),
        };
        let aligned = <B::Granule as PageSize>::is_aligned(offset);
        if !aligned || !self.range.covers(offset, block.size()) {
            return Err(fault);
        }
        let va = self.range.start().checked_add(offset).ok_or(fault)?;
        if va.checked_add(block.size()).is_none() {
            return Err(fault);
        }

        trace!("region: {va} -> {} ({:#x} bytes)", block.addr(), block.size());
        space
            .install(va, block.addr(), block.size(), self.attributes)
            .map_err(|source| RegionError::InstallFailed { offset, source })
    }

    /// Map every block of the backing allocation at consecutive offsets.
    ///
    /// # Errors
    /// The first failure of [`map_block`](Self::map_block).
    pub fn map_all<A>(&self, space: &A) -> Result<(), RegionError>
    where
        A: AddressSpace + ?Sized,
    {
        let blocks = self
            .backing
            .with_lock(|backing| backing.as_ref().map(|a| a.blocks().to_vec()))
            .ok_or(RegionError::Released)?;

        let mut offset = 0;
        for block in &blocks {
            self.map_block(space, offset, block)?;
            offset += block.size();
        }
        Ok(())
    }
}

impl<B: MemoryBackend + ?Sized> RegionOps for MappedRegion<'_, B> {
    fn on_duplicate(&self) -> Result<usize, RegionError> {
        self.references
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n != 0).then(|| n + 1)
            })
            .map(|previous| previous + 1)
            .map_err(|_| RegionError::Released)
    }

    fn on_destroy(&self) -> Result<RegionState, RegionError> {
        let previous = self
            .references
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map_err(|_| RegionError::Released)?;

        if previous > 1 {
            return Ok(RegionState::Active(previous - 1));
        }

        // Only the decrementer that saw 1 -> 0 gets here.
        let backing = self.backing.lock().take();
        if let Some(allocation) = backing {
            debug!(
                "region {}: last reference gone, releasing {} pages",
                self.range.start(),
                allocation.page_count()
            );
            self.backend.release_uninterruptible(allocation);
        }
        Ok(RegionState::Released)
    }

    fn on_access_fault(&self, address: VirtualAddress) -> RegionError {
        error!(
            "region {}+{:#x}: unexpected fault at {address}",
            self.range.start(),
            self.range.len()
        );
        RegionError::UnexpectedFault {
            address,
            start: self.range.start(),
        }
    }
}
