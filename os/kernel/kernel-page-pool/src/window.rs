//! # Page provider over a reserved physical window
//!
//! Boards that carve a DRAM window out of the kernel's view (e.g. a
//! `mem=` boot parameter leaving the top 64 MiB to the GPU) hand that window
//! to a [`WindowPageProvider`], which tracks it with one bit per page.
//!
//! * **Bitmap**: one `u64` word per 64 pages, `1` = in use.
//! * **Next-fit**: scanning resumes at the word after the last grant, so
//!   recently freed pages are not immediately reused.
//! * **Scrubbing** goes through a [`PhysMapper`].

use crate::phys_mapper::PhysMapper;
use crate::provider::PageProvider;
use alloc::vec;
use alloc::vec::Vec;
use core::marker::PhantomData;
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage};
use kernel_sync::SpinMutex;
use log::{debug, trace};

const BITS_PER_WORD: usize = u64::BITS as usize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("window base {0} is not page aligned")]
    Unaligned(PhysicalAddress),
    #[error("window of {0} bytes holds no whole page")]
    Empty(u64),
    #[error("window end overflows the physical address space")]
    Overflow,
}

struct WindowState {
    bitmap: Vec<u64>,
    next_word: usize,
    free: usize,
}

/// Bitmap-tracked [`PageProvider`] for `[base, base + size)`.
pub struct WindowPageProvider<S: PageSize, M: PhysMapper> {
    first_frame: u64,
    pages: usize,
    mapper: M,
    state: SpinMutex<WindowState>,
    _granule: PhantomData<S>,
}

impl<S: PageSize, M: PhysMapper> WindowPageProvider<S, M> {
    /// Manage the whole pages inside `[base, base + size_bytes)`.
    ///
    /// # Safety
    /// - The window must be RAM that nothing else allocates from.
    /// - `mapper` must give writable access to every page in the window.
    ///
    /// # Errors
    /// - [`WindowError::Unaligned`] if `base` is not `S`-aligned.
    /// - [`WindowError::Empty`] if the window holds no whole page.
    /// - [`WindowError::Overflow`] if the window wraps the address space.
    pub unsafe fn new(
        base: PhysicalAddress,
        size_bytes: u64,
        mapper: M,
    ) -> Result<Self, WindowError> {
        if !base.is_aligned::<S>() {
            return Err(WindowError::Unaligned(base));
        }
        if base.checked_add(size_bytes).is_none() {
            return Err(WindowError::Overflow);
        }

        let pages = usize::try_from(S::pages_in(size_bytes)).map_err(|_| WindowError::Overflow)?;
        if pages == 0 {
            return Err(WindowError::Empty(size_bytes));
        }

        let words = pages.div_ceil(BITS_PER_WORD);
        let mut bitmap = vec![0u64; words];

        // Bits past the end of the window are permanently "in use".
        let tail = pages % BITS_PER_WORD;
        if tail != 0 {
            bitmap[words - 1] = !0u64 << tail;
        }

        debug!(
            "page window {base}+{size_bytes:#x}: {pages} pages of {}",
            S::as_str()
        );

        Ok(Self {
            first_frame: base.page::<S>().frame_number(),
            pages,
            mapper,
            state: SpinMutex::new(WindowState {
                bitmap,
                next_word: 0,
                free: pages,
            }),
            _granule: PhantomData,
        })
    }

    #[must_use]
    pub const fn total_pages(&self) -> usize {
        self.pages
    }

    #[must_use]
    pub fn free_pages(&self) -> usize {
        self.state.lock().free
    }

    #[must_use]
    pub const fn base(&self) -> PhysicalAddress {
        PhysicalPage::<S>::from_frame_number(self.first_frame).base()
    }

    /// Whether `page` lies inside this window.
    #[must_use]
    pub fn contains(&self, page: PhysicalPage<S>) -> bool {
        self.index_of(page).is_some()
    }

    fn index_of(&self, page: PhysicalPage<S>) -> Option<usize> {
        let index = page.frame_number().checked_sub(self.first_frame)?;
        usize::try_from(index).ok().filter(|&i| i < self.pages)
    }

    fn page_at(&self, index: usize) -> PhysicalPage<S> {
        PhysicalPage::from_frame_number(self.first_frame + index as u64)
    }
}

impl<S: PageSize, M: PhysMapper> PageProvider<S> for WindowPageProvider<S, M> {
    fn alloc_page(&self) -> Option<PhysicalPage<S>> {
        let mut state = self.state.lock();
        if state.free == 0 {
            return None;
        }

        let words = state.bitmap.len();
        let mut granted = None;
        for i in 0..words {
            let w = (state.next_word + i) % words;
            let word = state.bitmap[w];
            if word != u64::MAX {
                let bit = (!word).trailing_zeros() as usize;
                state.bitmap[w] = word | (1 << bit);
                state.next_word = (w + 1) % words;
                granted = Some(w * BITS_PER_WORD + bit);
                break;
            }
        }
        let index = granted?;

        state.free -= 1;
        drop(state);

        let page = self.page_at(index);
        trace!("page window: granted {page}");
        Some(page)
    }

    fn scrub_page(&self, page: PhysicalPage<S>) {
        debug_assert!(self.contains(page), "scrubbing page {page} outside the window");
        // SAFETY: The page lies in the window, which the mapper covers, and was
        // just granted to the caller.
        unsafe { self.mapper.page_bytes(page) }.fill(0);
        self.mapper.clean_dcache(page);
    }

    fn free_page(&self, page: PhysicalPage<S>) {
        let Some(index) = self.index_of(page) else {
            panic!("page {page} does not belong to this window");
        };

        let (word, bit) = (index / BITS_PER_WORD, index % BITS_PER_WORD);
        let mut state = self.state.lock();
        assert!(
            state.bitmap[word] & (1 << bit) != 0,
            "double free of page {page}"
        );
        state.bitmap[word] &= !(1 << bit);
        state.free += 1;
        drop(state);

        trace!("page window: returned {page}");
    }
}
