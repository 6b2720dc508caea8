//! # OS page provider interface
//!
//! The pool never owns physical memory itself; it draws single pages from a
//! [`PageProvider`] and gives them back. In a kernel that is the buddy
//! allocator (`alloc_page` / `__free_page`), in tests a mock, and on boards
//! with a reserved DRAM carve-out the [`WindowPageProvider`](crate::window::WindowPageProvider).

use kernel_memory_addresses::{PageSize, PhysicalPage};

/// Source of single physical pages of granule `S`.
///
/// Implementations must be callable concurrently from several threads: the
/// pool returns pages outside of its own lock.
pub trait PageProvider<S: PageSize> {
    /// Take one page, or `None` if the OS refuses (memory pressure).
    ///
    /// Refusal is an expected outcome, not an error; it must not retry hard
    /// or warn.
    fn alloc_page(&self) -> Option<PhysicalPage<S>>;

    /// Zero `page` and clean it out of the data cache so that neither the CPU
    /// nor a bus master can observe stale contents.
    fn scrub_page(&self, page: PhysicalPage<S>);

    /// Give back a page previously returned by [`alloc_page`](Self::alloc_page).
    fn free_page(&self, page: PhysicalPage<S>);
}
