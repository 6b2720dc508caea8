//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw memory addresses and page bases used by
//! the page pool and the region mapping code.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`MemoryAddress`] | A raw 64-bit address, either physical or virtual. |
//! | [`PhysicalAddress`] | An address in system DRAM / bus address space. |
//! | [`VirtualAddress`] | An address in a (user) virtual address space. |
//! | [`PhysicalPage<S>`] | A page-aligned physical page of granule `S`. |
//!
//! ## Page Granules
//!
//! The page size is a type parameter implementing [`PageSize`]:
//!
//! - [`Size4K`]: 4 KiB pages
//! - [`Size16K`]: 16 KiB pages
//! - [`Size64K`]: 64 KiB pages
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x7800_3123);
//! let page = pa.page::<Size4K>();
//! assert_eq!(page.base().as_u64(), 0x7800_3000);
//! assert_eq!(Size16K::pages_for(3 * Size4K::SIZE), 1);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod memory_address;
mod page_size;
mod physical_address;
mod physical_page;
mod virtual_address;

pub use memory_address::MemoryAddress;
pub use page_size::{PageSize, Size4K, Size16K, Size64K};
pub use physical_address::PhysicalAddress;
pub use physical_page::PhysicalPage;
pub use virtual_address::VirtualAddress;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_rounding() {
        assert_eq!(Size4K::pages_for(0), 0);
        assert_eq!(Size4K::pages_for(4095), 1);
        assert_eq!(Size4K::pages_for(8193), 3);
        assert_eq!(Size64K::pages_for(Size4K::SIZE), 1);
        assert_eq!(Size4K::pages_in(32 * 1024 * 1024), 8192);
        assert_eq!(Size4K::pages_in(4095), 0);
    }

    #[test]
    fn alignment_helpers() {
        let a = MemoryAddress::new(0x12345);
        assert_eq!(a.align_down::<Size4K>().as_u64(), 0x12000);
        assert_eq!(a.checked_align_up::<Size4K>().unwrap().as_u64(), 0x13000);
        assert_eq!(a.page_offset::<Size4K>(), 0x345);
        assert!(MemoryAddress::new(u64::MAX).checked_align_up::<Size4K>().is_none());
    }

    #[test]
    fn physical_pages() {
        let pa = PhysicalAddress::new(0x0000_0010_2000_0042);
        let pp = pa.page::<Size16K>();
        assert!(pp.base().is_aligned::<Size16K>());
        assert_eq!(pp.base().as_u64() + pa.page_offset::<Size16K>(), pa.as_u64());
        assert_eq!(PhysicalPage::<Size16K>::from_frame_number(pp.frame_number()), pp);
        assert_eq!(pp.size(), 16 * 1024);
    }

    #[test]
    fn virtual_checked_add() {
        let va = VirtualAddress::new(0x4000_0000);
        assert_eq!(va.checked_add(0x1000), Some(VirtualAddress::new(0x4000_1000)));
        assert_eq!(VirtualAddress::new(u64::MAX).checked_add(1), None);
        assert!(va.is_aligned::<Size64K>());
    }
}
