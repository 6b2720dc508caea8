#![allow(dead_code)]

use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalPage, Size4K, VirtualAddress};
use kernel_page_pool::attributes::RegionAttributes;
use kernel_page_pool::config::PoolConfig;
use kernel_page_pool::region::{AddressSpace, InstallError};
use kernel_page_pool::{
    Allocation, MemoryBackend, PagePool, PageProvider, PoolError, PoolId, PoolUsage, ReleaseError,
};
use kernel_sync::Interrupt;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

/// First frame handed out; frames step by two so that no two grants are
/// physically adjacent.
pub const FIRST_PFN: u64 = 0x78000;

#[derive(Default)]
struct ProviderState {
    next_pfn: u64,
    remaining: Option<usize>,
    outstanding: HashSet<u64>,
    scrubbed: HashSet<u64>,
    granted: usize,
    freed: usize,
}

/// Mock OS page provider that records everything the pool does with it.
pub struct TestProvider<S: PageSize> {
    state: Mutex<ProviderState>,
    gate_closed: AtomicBool,
    parked: AtomicBool,
    _granule: PhantomData<S>,
}

impl<S: PageSize> TestProvider<S> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProviderState {
                next_pfn: FIRST_PFN,
                ..ProviderState::default()
            }),
            gate_closed: AtomicBool::new(false),
            parked: AtomicBool::new(false),
            _granule: PhantomData,
        }
    }

    /// Refuse every request after `grants` pages have been handed out.
    pub fn with_limit(self, grants: usize) -> Self {
        self.state.lock().unwrap().remaining = Some(grants);
        self
    }

    pub fn outstanding(&self) -> usize {
        self.state.lock().unwrap().outstanding.len()
    }

    pub fn granted(&self) -> usize {
        self.state.lock().unwrap().granted
    }

    pub fn freed(&self) -> usize {
        self.state.lock().unwrap().freed
    }

    pub fn was_scrubbed(&self, page: PhysicalPage<S>) -> bool {
        self.state.lock().unwrap().scrubbed.contains(&page.frame_number())
    }

    /// Make the next `alloc_page` park until [`open_gate`](Self::open_gate).
    pub fn close_gate(&self) {
        self.parked.store(false, Ordering::SeqCst);
        self.gate_closed.store(true, Ordering::SeqCst);
    }

    pub fn open_gate(&self) {
        self.gate_closed.store(false, Ordering::SeqCst);
    }

    pub fn wait_until_parked(&self) {
        while !self.parked.load(Ordering::SeqCst) {
            thread::yield_now();
        }
    }
}

impl<S: PageSize> PageProvider<S> for TestProvider<S> {
    fn alloc_page(&self) -> Option<PhysicalPage<S>> {
        if self.gate_closed.load(Ordering::SeqCst) {
            self.parked.store(true, Ordering::SeqCst);
            while self.gate_closed.load(Ordering::SeqCst) {
                thread::yield_now();
            }
        }

        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = state.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        let pfn = state.next_pfn;
        state.next_pfn += 2;
        state.granted += 1;
        assert!(state.outstanding.insert(pfn));
        Some(PhysicalPage::from_frame_number(pfn))
    }

    fn scrub_page(&self, page: PhysicalPage<S>) {
        let mut state = self.state.lock().unwrap();
        let pfn = page.frame_number();
        assert!(state.outstanding.contains(&pfn), "scrubbing page {page} nobody owns");
        state.scrubbed.insert(pfn);
    }

    fn free_page(&self, page: PhysicalPage<S>) {
        let mut state = self.state.lock().unwrap();
        let pfn = page.frame_number();
        assert!(state.outstanding.remove(&pfn), "double free of {page}");
        state.scrubbed.remove(&pfn);
        state.freed += 1;
    }
}

pub type TestPool = PagePool<TestProvider<Size4K>, Size4K>;

pub fn pool_with_pages(pages: u64) -> TestPool {
    PagePool::new(
        PoolConfig::new().with_quota_bytes(pages * Size4K::SIZE),
        TestProvider::new(),
    )
}

/// [`MemoryBackend`] wrapper counting how often allocations come back.
pub struct CountingBackend<B> {
    pub inner: B,
    releases: AtomicUsize,
}

impl<B> CountingBackend<B> {
    pub const fn new(inner: B) -> Self {
        Self {
            inner,
            releases: AtomicUsize::new(0),
        }
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl<B: MemoryBackend> MemoryBackend for CountingBackend<B> {
    type Granule = B::Granule;

    fn allocate(
        &self,
        size_bytes: u64,
        interrupt: &dyn Interrupt,
    ) -> Result<Allocation<Self::Granule>, PoolError> {
        self.inner.allocate(size_bytes, interrupt)
    }

    fn release(
        &self,
        allocation: Allocation<Self::Granule>,
        interrupt: &dyn Interrupt,
    ) -> Result<(), ReleaseError<Self::Granule>> {
        self.inner.release(allocation, interrupt)?;
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release_uninterruptible(&self, allocation: Allocation<Self::Granule>) {
        self.inner.release_uninterruptible(allocation);
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn usage(&self) -> PoolUsage {
        self.inner.usage()
    }

    fn pool_id(&self) -> PoolId {
        self.inner.pool_id()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Installed {
    pub va: VirtualAddress,
    pub pa: PhysicalAddress,
    pub len: u64,
    pub attributes: RegionAttributes,
}

/// Address space that records every translation, optionally refusing all.
#[derive(Default)]
pub struct RecordingSpace {
    pub installed: Mutex<Vec<Installed>>,
    pub refuse: bool,
}

impl RecordingSpace {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn installed(&self) -> Vec<Installed> {
        self.installed.lock().unwrap().clone()
    }
}

impl AddressSpace for RecordingSpace {
    fn install(
        &self,
        va: VirtualAddress,
        pa: PhysicalAddress,
        len: u64,
        attributes: RegionAttributes,
    ) -> Result<(), InstallError> {
        if self.refuse {
            return Err(InstallError::OutOfMemory);
        }

        let mut installed = self.installed.lock().unwrap();
        if installed.iter().any(|i| i.va == va) {
            return Err(InstallError::AlreadyMapped(va));
        }
        installed.push(Installed {
            va,
            pa,
            len,
            attributes,
        });
        Ok(())
    }
}
