use bitfield_struct::bitfield;

/// How a mapped region is presented to the address space.
///
/// The environment translates these into its own page-table and VMA flags;
/// this crate only decides which ones a pool-backed region carries.
///
/// ### Bit layout
///
/// | Bit | Name | Meaning |
/// |-----|------|---------|
/// | 0 | `readable` | Loads allowed |
/// | 1 | `writable` | Stores allowed |
/// | 2 | `user` | Accessible from user mode |
/// | 3 | `io` | Not ordinary memory; no `get_user_pages`, no reclaim |
/// | 4 | `dont_expand` | Region may not be grown by `mremap` |
/// | 5 | `dont_dump` | Excluded from core dumps |
/// | 6 | `write_combine` | Normal non-cacheable, write-combining |
/// | 7–31 | reserved | Must be zero |
///
/// ### Example
/// ```rust
/// # use kernel_page_pool::attributes::RegionAttributes;
/// let attrs = RegionAttributes::user_rw().device_shared();
/// assert!(attrs.io() && attrs.dont_expand() && attrs.dont_dump());
/// assert!(attrs.write_combine());
/// assert!(attrs.writable());
/// ```
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct RegionAttributes {
    /// Loads through the mapping are allowed.
    pub readable: bool,

    /// Stores through the mapping are allowed.
    pub writable: bool,

    /// The mapping is reachable from user mode.
    pub user: bool,

    /// I/O-like region: the pages are not managed by the host VM.
    pub io: bool,

    /// The region cannot be expanded after creation.
    pub dont_expand: bool,

    /// The region is skipped when writing core dumps.
    pub dont_dump: bool,

    /// Mapped write-combining instead of cacheable.
    pub write_combine: bool,

    #[bits(25)]
    __: u32,
}

impl RegionAttributes {
    /// Read/write user mapping with default caching.
    #[inline]
    #[must_use]
    pub const fn user_rw() -> Self {
        Self::new()
            .with_readable(true)
            .with_writable(true)
            .with_user(true)
    }

    /// The same access rights, configured the way pool memory shared with a
    /// bus master is always mapped.
    #[inline]
    #[must_use]
    pub const fn device_shared(self) -> Self {
        self.with_io(true)
            .with_dont_expand(true)
            .with_dont_dump(true)
            .with_write_combine(true)
    }

    /// Whether [`device_shared`](Self::device_shared) has been applied.
    #[inline]
    #[must_use]
    pub const fn is_device_shared(&self) -> bool {
        self.io() && self.dont_expand() && self.dont_dump() && self.write_combine()
    }
}
