//! # Kernel synchronization primitives
//!
//! A spin-based [`Mutex`] parameterized over its raw lock, plus the
//! [`Interrupt`] abstraction used to abort a contended wait when the caller
//! has a signal pending.
//!
//! ```
//! use kernel_sync::{InterruptFlag, SpinMutex};
//!
//! let m = SpinMutex::new(0u32);
//! let signal = InterruptFlag::new();
//!
//! // Uncontended acquires always succeed, even with a signal pending.
//! signal.raise();
//! *m.lock_interruptible(&signal).unwrap() += 1;
//! assert_eq!(*m.lock(), 1);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod interrupt;
mod mutex;
mod raw_spin;

pub use interrupt::{Interrupt, InterruptFlag, Interrupted, Uninterruptible};
pub use mutex::{Mutex, MutexGuard};
pub use raw_spin::RawSpin;

pub type SpinMutex<T> = Mutex<T, RawSpin>;

impl<T> SpinMutex<T> {
    pub const fn new(value: T) -> Self {
        Self::from_raw(RawSpin::new(), value)
    }
}

pub trait RawLock {
    fn raw_lock(&self);
    fn raw_try_lock(&self) -> bool;

    /// Spin until the lock is taken or `abort` returns `true`.
    ///
    /// `abort` is only consulted while the lock is contended. Returns whether
    /// the lock is now held.
    fn raw_lock_unless(&self, abort: &mut dyn FnMut() -> bool) -> bool {
        loop {
            if self.raw_try_lock() {
                return true;
            }
            if abort() {
                return false;
            }
            core::hint::spin_loop();
        }
    }
}

pub trait RawUnlock {
    unsafe fn raw_unlock(&self);
}
