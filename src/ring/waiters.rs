//! FIFO waiter queues and the cooperative wake-up protocol.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::task::Waker;

use super::core::RingHooks;

/// The liveness witness and waker cell shared between a waiter's queue entry
/// and the future awaiting it.
///
/// The future holds the `Arc`; the queue holds only a `Weak` clone. Once the
/// future is dropped the `Arc` count reaches zero, and the next wake-loop
/// pass over the queue finds a dead `Weak` and discards the entry.
///
/// `completed` is the only source of truth for whether a *registered* waiter
/// may resolve: the wake loop is what pops a waiter from its queue in FIFO
/// order, so a future that has already enqueued must wait for the loop to
/// set this flag rather than re-testing the ring's raw fill level, which
/// would let it jump ahead of an earlier, still-blocked waiter.
pub struct WaiterShared {
    waker: Mutex<Option<Waker>>,
    completed: AtomicBool,
}

impl WaiterShared {
    fn new(waker: Waker) -> Arc<Self> {
        Arc::new(Self {
            waker: Mutex::new(Some(waker)),
            completed: AtomicBool::new(false),
        })
    }

    fn replace_waker(&self, waker: Waker) {
        *self.waker.lock().unwrap() = Some(waker);
    }

    /// Whether the wake loop has already popped this waiter from its queue.
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    fn wake(&self) {
        self.completed.store(true, Ordering::Release);
        if let Some(waker) = self.waker.lock().unwrap().take() {
            waker.wake();
        }
    }
}

/// One entry in a waiter queue: the threshold it's blocked on, plus a `Weak`
/// reference to the shared waker slot.
struct Waiter {
    min_size: usize,
    shared: Weak<WaiterShared>,
}

/// FIFO queues of suspended `wait_not_full`/`wait_not_empty` futures, plus
/// the running totals of resumed and cancelled-and-skipped waiters.
#[derive(Default)]
pub struct RingWaiters {
    waiting_not_full: VecDeque<Waiter>,
    waiting_not_empty: VecDeque<Waiter>,
    woken_up: u64,
    woken_up_skipped: u64,
}

impl RingWaiters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for "at least `min_free` bytes writable", storing
    /// `waker` in a fresh shared slot and returning it so the future can
    /// keep it alive and update it on subsequent polls.
    pub fn enqueue_not_full(&mut self, min_free: usize, waker: Waker) -> Arc<WaiterShared> {
        let shared = WaiterShared::new(waker);
        self.waiting_not_full.push_back(Waiter {
            min_size: min_free,
            shared: Arc::downgrade(&shared),
        });
        shared
    }

    /// Registers a waiter for "at least `min_ready` bytes readable".
    pub fn enqueue_not_empty(&mut self, min_ready: usize, waker: Waker) -> Arc<WaiterShared> {
        let shared = WaiterShared::new(waker);
        self.waiting_not_empty.push_back(Waiter {
            min_size: min_ready,
            shared: Arc::downgrade(&shared),
        });
        shared
    }

    /// Total number of waiters woken since construction.
    pub fn woken_up(&self) -> u64 {
        self.woken_up
    }

    /// Total number of stale (cancelled) waiters discarded since construction.
    pub fn woken_up_skipped(&self) -> u64 {
        self.woken_up_skipped
    }

    fn drain_queue(queue: &mut VecDeque<Waiter>, current_threshold: usize) -> (u64, u64) {
        let mut woken = 0;
        let mut skipped = 0;
        loop {
            let (min_size, shared) = match queue.front() {
                None => break,
                Some(w) => (w.min_size, w.shared.upgrade()),
            };
            match shared {
                None => {
                    queue.pop_front();
                    skipped += 1;
                }
                Some(shared) => {
                    if min_size <= current_threshold {
                        queue.pop_front();
                        shared.wake();
                        woken += 1;
                    } else {
                        break;
                    }
                }
            }
        }
        (woken, skipped)
    }
}

/// Bridges `RingCore`'s `&self`-only movement hooks (`commit`/`consume` run
/// on a shared ring, see [`RingCore::commit`]) to the waiter queues, which
/// need mutable access to pop and wake entries. Both the hook calls and the
/// enqueue path below go through `borrow_mut`, since neither can assume
/// exclusive access to the `RefCell` any more than `RingCore` can assume
/// exclusive access to the ring.
impl RingHooks for RefCell<RingWaiters> {
    fn on_commit(&self, non_filled_size: usize) {
        let mut waiters = self.borrow_mut();
        let (woken, skipped) = RingWaiters::drain_queue(&mut waiters.waiting_not_full, non_filled_size);
        waiters.woken_up += woken;
        waiters.woken_up_skipped += skipped;
    }

    fn on_consume(&self, filled_size: usize) {
        let mut waiters = self.borrow_mut();
        let (woken, skipped) = RingWaiters::drain_queue(&mut waiters.waiting_not_empty, filled_size);
        waiters.woken_up += woken;
        waiters.woken_up_skipped += skipped;
    }
}

impl RingWaiters {
    /// Enqueues (or re-registers) a not-full waiter via a shared borrow.
    pub fn enqueue_not_full_shared(
        this: &RefCell<Self>,
        min_free: usize,
        waker: Waker,
    ) -> Arc<WaiterShared> {
        this.borrow_mut().enqueue_not_full(min_free, waker)
    }

    /// Enqueues (or re-registers) a not-empty waiter via a shared borrow.
    pub fn enqueue_not_empty_shared(
        this: &RefCell<Self>,
        min_ready: usize,
        waker: Waker,
    ) -> Arc<WaiterShared> {
        this.borrow_mut().enqueue_not_empty(min_ready, waker)
    }

    /// Updates the stored waker for an already-enqueued waiter, used when a
    /// future is polled again with a new `Context` before being resumed.
    pub fn update_waker(shared: &Arc<WaiterShared>, waker: Waker) {
        shared.replace_waker(waker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::{RawWaker, RawWakerVTable};

    fn noop_raw_waker() -> RawWaker {
        fn clone(_: *const ()) -> RawWaker {
            noop_raw_waker()
        }
        fn wake(_: *const ()) {}
        fn wake_by_ref(_: *const ()) {}
        fn drop(_: *const ()) {}
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, wake, wake_by_ref, drop);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    fn noop_waker() -> Waker {
        unsafe { Waker::from_raw(noop_raw_waker()) }
    }

    #[test]
    fn fifo_order_is_preserved() {
        let waiters = RefCell::new(RingWaiters::new());
        let a = waiters.borrow_mut().enqueue_not_full(10, noop_waker());
        let b = waiters.borrow_mut().enqueue_not_full(100, noop_waker());
        let c = waiters.borrow_mut().enqueue_not_full(20, noop_waker());

        // A threshold of 15 would satisfy the head (10), but not `b`
        // (100); FIFO means `b` staying at the head blocks `c` (20) too,
        // even though 20 alone would have been satisfied.
        let (woken, skipped) =
            RingWaiters::drain_queue(&mut waiters.borrow_mut().waiting_not_full, 15);
        assert_eq!(woken, 1);
        assert_eq!(skipped, 0);
        assert_eq!(waiters.borrow().waiting_not_full.len(), 2);

        let (woken, _) = RingWaiters::drain_queue(&mut waiters.borrow_mut().waiting_not_full, 100);
        assert_eq!(woken, 2);
        assert_eq!(waiters.borrow().waiting_not_full.len(), 0);
        let _ = (a, b, c);
    }

    #[test]
    fn dead_witness_is_skipped() {
        let waiters = RefCell::new(RingWaiters::new());
        {
            let _shared = waiters.borrow_mut().enqueue_not_empty(5, noop_waker());
        }
        let (woken, skipped) = RingWaiters::drain_queue(&mut waiters.borrow_mut().waiting_not_empty, 100);
        assert_eq!(woken, 0);
        assert_eq!(skipped, 1);
    }
}
