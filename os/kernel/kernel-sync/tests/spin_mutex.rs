use kernel_sync::{InterruptFlag, Interrupted, SpinMutex, Uninterruptible};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn guard_unlocks_on_drop() {
    let m = SpinMutex::new(0_u32);

    {
        let mut g = m.lock();
        *g = 41;
        assert!(m.raw().is_locked());
    }

    assert!(!m.raw().is_locked());
    *m.lock() += 1;
    assert_eq!(*m.lock(), 42);
}

#[test]
fn try_lock_fails_while_held() {
    let m = SpinMutex::new(1u8);

    let g1 = m.try_lock();
    assert!(g1.is_some());
    assert!(m.try_lock().is_none());

    drop(g1);
    assert!(m.try_lock().is_some());
}

#[test]
fn uncontended_interruptible_lock_ignores_pending_signal() {
    let m = SpinMutex::new(String::from("a"));
    let signal = InterruptFlag::new();
    signal.raise();

    let mut g = m.lock_interruptible(&signal).expect("lock is free");
    g.push('b');
    drop(g);

    assert_eq!(m.with_lock(|s| s.clone()), "ab");
}

#[test]
fn contended_interruptible_lock_aborts_on_signal() {
    let m = Arc::new(SpinMutex::new(7u32));
    let signal = Arc::new(InterruptFlag::new());
    let waiting = Arc::new(AtomicBool::new(false));

    let held = m.lock();

    let waiter = {
        let m = Arc::clone(&m);
        let signal = Arc::clone(&signal);
        let waiting = Arc::clone(&waiting);
        thread::spawn(move || {
            waiting.store(true, Ordering::SeqCst);
            m.lock_interruptible(&*signal).map(|mut g| {
                *g += 1;
            })
        })
    };

    while !waiting.load(Ordering::SeqCst) {
        thread::yield_now();
    }
    thread::sleep(Duration::from_millis(20));
    signal.raise();

    assert_eq!(waiter.join().unwrap(), Err(Interrupted));
    drop(held);

    // The aborted waiter never touched the value.
    assert_eq!(*m.lock(), 7);
}

#[test]
fn uninterruptible_waits_until_released() {
    let m = Arc::new(SpinMutex::new(0u32));
    let held = m.lock();

    let waiter = {
        let m = Arc::clone(&m);
        thread::spawn(move || {
            let mut g = m.lock_interruptible(&Uninterruptible).unwrap();
            *g += 1;
        })
    };

    thread::sleep(Duration::from_millis(10));
    drop(held);
    waiter.join().unwrap();
    assert_eq!(*m.lock(), 1);
}

#[test]
fn contended_increments_are_exact_and_exclusive() {
    let threads = 8;
    let iters = 5_000;

    let lock = Arc::new(SpinMutex::new(0usize));
    let in_cs = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(threads));

    let mut handles = Vec::with_capacity(threads);
    for _ in 0..threads {
        let lock = Arc::clone(&lock);
        let in_cs = Arc::clone(&in_cs);
        let start = Arc::clone(&start);
        handles.push(thread::spawn(move || {
            start.wait();
            for _ in 0..iters {
                let mut g = lock.lock_interruptible(&Uninterruptible).unwrap();
                let prev = in_cs.fetch_add(1, Ordering::SeqCst);
                assert_eq!(prev, 0, "mutual exclusion violated");
                *g += 1;
                in_cs.fetch_sub(1, Ordering::SeqCst);
                drop(g);
                thread::yield_now();
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(lock.with_lock(|v| *v), threads * iters);
    assert_eq!(in_cs.load(Ordering::SeqCst), 0);
}

#[test]
fn spin_mutex_is_sync_for_send_t() {
    fn takes_sync<S: Sync>(_s: &S) {}
    let m = SpinMutex::new(0u8);
    takes_sync(&m);
}
