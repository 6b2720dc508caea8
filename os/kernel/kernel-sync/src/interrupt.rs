use core::sync::atomic::{AtomicBool, Ordering};

/// Source of asynchronous cancellation for a blocking wait.
///
/// Models "does the calling context have a signal pending". Waits that are
/// interruptible poll this while contended and give up once it reports `true`.
pub trait Interrupt {
    fn is_pending(&self) -> bool;
}

/// A wait that can never be interrupted.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Uninterruptible;

impl Interrupt for Uninterruptible {
    #[inline]
    fn is_pending(&self) -> bool {
        false
    }
}

/// Atomic pending-signal flag.
///
/// Raised by whoever delivers the signal; cleared by the owner once handled.
#[derive(Debug, Default)]
pub struct InterruptFlag {
    pending: AtomicBool,
}

impl InterruptFlag {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn raise(&self) {
        self.pending.store(true, Ordering::Release);
    }

    #[inline]
    pub fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }
}

impl Interrupt for InterruptFlag {
    #[inline]
    fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl<I: Interrupt + ?Sized> Interrupt for &I {
    #[inline]
    fn is_pending(&self) -> bool {
        (**self).is_pending()
    }
}

/// A contended wait was abandoned because a signal became pending.
#[derive(Debug, Copy, Clone, Eq, PartialEq, thiserror::Error)]
#[error("wait interrupted by pending signal")]
pub struct Interrupted;
