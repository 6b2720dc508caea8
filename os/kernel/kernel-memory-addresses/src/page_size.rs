use core::fmt;
use core::hash::Hash;

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for the page granules a pool can be built on.
///
/// ARM MMUs (and the GPU MMUs paired with them) translate with a 4 KiB,
/// 16 KiB or 64 KiB granule; the host kernel's page size is one of these.
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Display + fmt::Debug
{
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE), i.e., number of low bits used for the offset.
    const SHIFT: u32;

    fn as_str() -> &'static str;

    /// Number of whole pages needed to hold `bytes` (rounds up).
    ///
    /// ```
    /// # use kernel_memory_addresses::*;
    /// assert_eq!(Size4K::pages_for(0), 0);
    /// assert_eq!(Size4K::pages_for(1), 1);
    /// assert_eq!(Size4K::pages_for(4096), 1);
    /// assert_eq!(Size4K::pages_for(4097), 2);
    /// ```
    #[inline]
    #[must_use]
    fn pages_for(bytes: u64) -> u64 {
        (bytes >> Self::SHIFT) + u64::from(bytes & (Self::SIZE - 1) != 0)
    }

    /// Number of whole pages that fit into `bytes` (rounds down).
    #[inline]
    #[must_use]
    fn pages_in(bytes: u64) -> u64 {
        bytes >> Self::SHIFT
    }

    #[inline]
    #[must_use]
    fn is_aligned(value: u64) -> bool {
        value & (Self::SIZE - 1) == 0
    }
}

macro_rules! granule {
    ($(#[$meta:meta])* $name:ident, $shift:literal, $label:literal) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name;

        impl sealed::Sealed for $name {}

        impl PageSize for $name {
            const SIZE: u64 = 1 << $shift;
            const SHIFT: u32 = $shift;

            fn as_str() -> &'static str {
                $label
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(Self::as_str())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Display::fmt(&self, f)
            }
        }
    };
}

granule!(
    /// 4 KiB granule (4096 bytes).
    Size4K, 12, "4K"
);

granule!(
    /// 16 KiB granule (`16_384` bytes).
    Size16K, 14, "16K"
);

granule!(
    /// 64 KiB granule (`65_536` bytes).
    Size64K, 16, "64K"
);
