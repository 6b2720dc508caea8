//! # Physical memory access for page scrubbing
//!
//! Pages must be zeroed through a CPU virtual mapping before they are handed
//! out. [`PhysMapper`] abstracts how a physical page is made visible; with a
//! higher-half direct map (HHDM) every physical address `pa` is reachable at
//! `offset + pa`.
//!
//! ## Example
//! ```rust
//! use kernel_memory_addresses::{PhysicalAddress, Size4K};
//! use kernel_page_pool::phys_mapper::{HhdmPhysMapper, PhysMapper};
//!
//! // Pretend physical 0x7800_0000 lives in this buffer.
//! let mut backing = vec![0xAAu8; 4096];
//! let offset = (backing.as_mut_ptr() as u64).wrapping_sub(0x7800_0000);
//! let mapper = HhdmPhysMapper::new(offset);
//!
//! let page = PhysicalAddress::new(0x7800_0000).page::<Size4K>();
//! unsafe { mapper.page_bytes(page) }.fill(0);
//! mapper.clean_dcache(page);
//! assert!(backing.iter().all(|&b| b == 0));
//! ```

use kernel_memory_addresses::{PageSize, PhysicalPage};

pub trait PhysMapper {
    /// Writable view of the whole page.
    ///
    /// # Safety
    /// - `page` must be covered by this mapper's mapping and writable.
    /// - The caller must own the page exclusively for `'a`.
    unsafe fn page_bytes<'a, S: PageSize>(&self, page: PhysicalPage<S>) -> &'a mut [u8];

    /// Clean the page's lines out of the CPU data cache to the point of
    /// coherency, so bus masters see what the CPU wrote.
    fn clean_dcache<S: PageSize>(&self, page: PhysicalPage<S>);
}

/// [`PhysMapper`] for kernels with a higher-half direct map at a fixed offset.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HhdmPhysMapper {
    offset: u64,
}

impl HhdmPhysMapper {
    #[must_use]
    pub const fn new(offset: u64) -> Self {
        Self { offset }
    }

    const fn virt<S: PageSize>(&self, page: PhysicalPage<S>) -> u64 {
        self.offset.wrapping_add(page.base().as_u64())
    }
}

impl PhysMapper for HhdmPhysMapper {
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn page_bytes<'a, S: PageSize>(&self, page: PhysicalPage<S>) -> &'a mut [u8] {
        let va = self.virt(page) as *mut u8;
        // SAFETY: Caller guarantees the page is mapped at offset + pa and exclusively owned.
        unsafe { core::slice::from_raw_parts_mut(va, S::SIZE as usize) }
    }

    fn clean_dcache<S: PageSize>(&self, page: PhysicalPage<S>) {
        clean_dcache_range(self.virt(page), S::SIZE);
    }
}

/// Smallest data cache line on the cores we run on.
#[cfg(target_arch = "aarch64")]
const DCACHE_LINE: u64 = 64;

#[cfg(target_arch = "aarch64")]
fn clean_dcache_range(start: u64, len: u64) {
    let end = start + len;
    let mut line = start & !(DCACHE_LINE - 1);
    while line < end {
        unsafe {
            core::arch::asm!("dc cvac, {}", in(reg) line, options(nostack, preserves_flags));
        }
        line += DCACHE_LINE;
    }
    unsafe {
        core::arch::asm!("dsb sy", options(nostack, preserves_flags));
    }
}

// Coherent caches: ordering the zeroing stores is all that is needed.
#[cfg(not(target_arch = "aarch64"))]
fn clean_dcache_range(_start: u64, _len: u64) {
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}
