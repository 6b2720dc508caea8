//! # Physical Page Pool and Mapped-Region Lifetime Tracking
//!
//! This crate is the memory backend a GPU driver uses for buffers that live
//! in ordinary OS pages. It reserves a bounded quota of physical pages from
//! an OS page provider, hands them out as block lists for logical
//! allocations, and tracks the virtual windows that expose those allocations
//! so that each one goes back to the pool exactly once.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Mapped Region ([`region`])             │
//! │    • Lock-free reference count per holder           │
//! │    • Releases the allocation on the last close      │
//! │    • Installs translations via `AddressSpace`       │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ MemoryBackend
//! ┌─────────────────▼───────────────────────────────────┐
//! │                 Page Pool ([`PagePool`])            │
//! │    • Quota in page units, accounted under a lock    │
//! │    • All-or-nothing allocate, interruptible waits   │
//! │    • One block per page, no coalescing              │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ PageProvider
//! ┌─────────────────▼───────────────────────────────────┐
//! │          OS Page Provider ([`provider`])            │
//! │    • Single-page alloc / free                       │
//! │    • Scrub: zero + data cache clean                 │
//! │    • e.g. [`window::WindowPageProvider`]            │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Page Pool ([`pool`])
//!
//! * **Quota**: `max_pages = quota_bytes / page size`, fixed at creation
//!   ([`config::PoolConfig`], 32 MiB by default).
//! * **Accounting**: `allocated_pages` never leaves `0..=max_pages` and only
//!   changes while the pool lock is held.
//! * **Rollback**: a request the provider cannot fully satisfy returns every
//!   page it obtained before failing.
//! * **Ownership**: an [`Allocation`] is stamped with the [`PoolId`] of the
//!   pool that produced it and consumed by release.
//!
//! ### Mapped Region ([`region`])
//!
//! * **Attach**: binds an allocation to a reserved virtual range, I/O-like and
//!   write-combining ([`attributes::RegionAttributes`]).
//! * **Duplicate / destroy**: atomic count; exactly the close that observes
//!   zero releases the allocation.
//! * **Faults**: regions are mapped eagerly, so any fault is reported as
//!   unexpected.
//!
//! ## Usage
//!
//! ```rust
//! use kernel_memory_addresses::{PhysicalAddress, Size4K, VirtualAddress};
//! use kernel_page_pool::attributes::RegionAttributes;
//! use kernel_page_pool::config::PoolConfig;
//! use kernel_page_pool::phys_mapper::HhdmPhysMapper;
//! use kernel_page_pool::region::{MappedRegion, RegionOps, RegionState, VirtualRange};
//! use kernel_page_pool::window::WindowPageProvider;
//! use kernel_page_pool::PagePool;
//! use kernel_sync::Uninterruptible;
//!
//! // A 16-page "carve-out" backed by a heap buffer.
//! let mut dram = vec![0xA5u8; 17 * 4096];
//! let base = (dram.as_mut_ptr() as u64 + 4095) & !4095;
//! let provider = unsafe {
//!     WindowPageProvider::<Size4K, _>::new(
//!         PhysicalAddress::new(base),
//!         16 * 4096,
//!         HhdmPhysMapper::new(0),
//!     )
//! }
//! .unwrap();
//!
//! let pool = PagePool::new(PoolConfig::new().with_quota_bytes(8 * 4096), provider);
//! let allocation = pool.allocate(3 * 4096, &Uninterruptible).unwrap();
//!
//! let range = VirtualRange::new(VirtualAddress::new(0x4000_0000), 3 * 4096);
//! let region =
//!     MappedRegion::attach(&pool, range, RegionAttributes::user_rw(), allocation).unwrap();
//! assert_eq!(pool.usage().allocated_pages, 3);
//!
//! assert_eq!(region.on_destroy(), Ok(RegionState::Released));
//! assert_eq!(pool.usage().allocated_pages, 0);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

pub mod attributes;
mod block;
pub mod config;
pub mod phys_mapper;
pub mod pool;
pub mod provider;
pub mod region;
pub mod window;

pub use block::{Allocation, PhysicalBlock, PoolId};
pub use pool::{MemoryBackend, PagePool, PoolError, PoolUsage, ReleaseError};
pub use provider::PageProvider;
