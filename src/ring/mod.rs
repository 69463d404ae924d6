//! A magic-mapped contiguous ring buffer with cooperative wake-up.
//!
//! [`Ring`] is a fixed-capacity byte queue backed by a doubled
//! virtual-memory mapping ([`crate::map::LinearMap`]), so any in-bounds
//! readable or writable span is always a single contiguous slice, even one
//! that wraps past the nominal end of the buffer. Producers and consumers
//! sharing one executor thread coordinate through [`Ring::wait_not_full`]
//! and [`Ring::wait_not_empty`], a pair of `Future`s woken in FIFO order as
//! soon as their threshold is met.

mod core;
mod waiters;

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::Result;
use self::core::RingCore;
use self::waiters::{RingWaiters, WaiterShared};

/// A fixed-capacity byte ring buffer with cooperative wake-up.
///
/// All operations other than [`wait_not_full`](Ring::wait_not_full) and
/// [`wait_not_empty`](Ring::wait_not_empty) are synchronous; those two
/// return `Future`s intended to be polled from a single-threaded executor
/// alongside the ring itself.
pub struct Ring {
    core: RingCore<RefCell<RingWaiters>>,
}

impl Ring {
    /// Creates a new ring of at least `size` bytes, with advisory
    /// `low_watermark`/`high_watermark` thresholds for flow control.
    ///
    /// The actual capacity rounds `size` up to the system's allocation
    /// granularity; use [`Ring::ready_write_size`] after construction if the
    /// exact value matters.
    pub fn new(size: usize, low_watermark: usize, high_watermark: usize) -> Result<Self> {
        let core = RingCore::new(
            size,
            low_watermark,
            high_watermark,
            RefCell::new(RingWaiters::new()),
        )?;
        Ok(Self { core })
    }

    /// A contiguous view of every readable byte.
    pub fn readable(&self) -> &[u8] {
        self.core.readable()
    }

    /// A contiguous view of up to `max` readable bytes.
    pub fn readable_max(&self, max: usize) -> &[u8] {
        self.core.readable_max(max)
    }

    /// A contiguous view of every writable byte.
    pub fn writable(&mut self) -> &mut [u8] {
        self.core.writable()
    }

    /// A contiguous view of up to `max` writable bytes.
    pub fn writable_max(&mut self, max: usize) -> &mut [u8] {
        self.core.writable_max(max)
    }

    /// Copies `src` into the ring and makes it readable in one step.
    pub fn memcpy_in(&mut self, src: &[u8]) -> Result<()> {
        self.core.memcpy_in(src)
    }

    /// Copies readable bytes out of the ring into `dst` and frees them.
    pub fn memcpy_out(&mut self, dst: &mut [u8]) -> Result<()> {
        self.core.memcpy_out(dst)
    }

    /// Reader side: marks `n` bytes as consumed, freeing them for writes.
    ///
    /// Takes `&self`: a producer and a consumer sharing one `Ring` each hold
    /// a plain `&Ring`, coordinating through [`Ring::wait_not_full`] and
    /// [`Ring::wait_not_empty`] rather than trading off exclusive access.
    pub fn commit(&self, n: usize) -> Result<()> {
        self.core.commit(n)
    }

    /// Writer side: marks `n` bytes as filled, making them readable. Takes
    /// `&self`, see [`Self::commit`].
    pub fn consume(&self, n: usize) -> Result<()> {
        self.core.consume(n)
    }

    /// Reads the filled byte `pos` bytes into the readable region.
    pub fn peek_byte_at(&self, pos: usize) -> u8 {
        self.core.peek_byte_at(pos)
    }

    /// Reads the first four filled bytes as a native-endian `i32`.
    pub fn peek_i32(&self) -> Result<i32> {
        self.core.peek_i32()
    }

    /// A contiguous view of the first `len` filled bytes.
    pub fn peek_bytes(&self, len: usize) -> Result<&[u8]> {
        self.core.peek_bytes(len)
    }

    /// Empties the ring. Callers must quiesce any pending waits first, since
    /// this does not notify waiters.
    pub fn reset(&self) {
        self.core.reset()
    }

    /// Number of bytes currently available to read.
    pub fn ready_size(&self) -> usize {
        self.core.filled_size()
    }

    /// Number of bytes currently available to write.
    pub fn ready_write_size(&self) -> usize {
        self.core.non_filled_size()
    }

    /// Whether there is nothing to read.
    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    /// `true` when the filled region is below the advisory low watermark.
    pub fn below_low_watermark(&self) -> bool {
        self.core.below_low_watermark()
    }

    /// `true` when the filled region is below the advisory high watermark.
    pub fn below_high_watermark(&self) -> bool {
        self.core.below_high_watermark()
    }

    /// Returns a future that resolves once at least `min_free` bytes are
    /// writable.
    pub fn wait_not_full(&self, min_free: usize) -> WaitNotFull<'_> {
        WaitNotFull {
            ring: self,
            min_free,
            shared: None,
        }
    }

    /// Returns a future that resolves once at least `min_ready` bytes are
    /// readable.
    pub fn wait_not_empty(&self, min_ready: usize) -> WaitNotEmpty<'_> {
        WaitNotEmpty {
            ring: self,
            min_ready,
            shared: None,
        }
    }

    /// Total number of waiters resumed since construction.
    pub fn woken_up(&self) -> u64 {
        self.core.hooks().borrow().woken_up()
    }

    /// Total number of cancelled waiters silently discarded since construction.
    pub fn woken_up_skipped(&self) -> u64 {
        self.core.hooks().borrow().woken_up_skipped()
    }
}

/// Future returned by [`Ring::wait_not_full`].
///
/// On first poll, if the threshold is already met the future resolves
/// without touching the waiter queue. Otherwise it registers a waker and
/// returns `Pending`; once registered, only the wake loop driven by
/// `commit` can resolve it (in FIFO order), so later polls never re-test
/// the raw fill level — they just refresh the stored waker and check
/// whether the wake loop has already fired.
pub struct WaitNotFull<'a> {
    ring: &'a Ring,
    min_free: usize,
    shared: Option<Arc<WaiterShared>>,
}

impl Future for WaitNotFull<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        match &this.shared {
            // Already enqueued: only the wake loop may resolve this future,
            // in the FIFO order it enforces. Re-testing the raw fill level
            // here would let a later, smaller waiter cut in front of an
            // earlier, still-blocked one.
            Some(shared) => {
                if shared.is_completed() {
                    return Poll::Ready(());
                }
                RingWaiters::update_waker(shared, cx.waker().clone());
                Poll::Pending
            }
            // First poll: no queue entry exists yet, so it's correct to
            // resolve immediately if the threshold is already met.
            None => {
                if this.ring.core.non_filled_size() >= this.min_free {
                    return Poll::Ready(());
                }
                let shared = RingWaiters::enqueue_not_full_shared(
                    this.ring.core.hooks(),
                    this.min_free,
                    cx.waker().clone(),
                );
                this.shared = Some(shared);
                Poll::Pending
            }
        }
    }
}

/// Future returned by [`Ring::wait_not_empty`].
///
/// See [`WaitNotFull`] for the polling protocol; this is the symmetric
/// reader-side wait.
pub struct WaitNotEmpty<'a> {
    ring: &'a Ring,
    min_ready: usize,
    shared: Option<Arc<WaiterShared>>,
}

impl Future for WaitNotEmpty<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        match &this.shared {
            // Already enqueued: same FIFO rule as `WaitNotFull::poll` above.
            Some(shared) => {
                if shared.is_completed() {
                    return Poll::Ready(());
                }
                RingWaiters::update_waker(shared, cx.waker().clone());
                Poll::Pending
            }
            None => {
                if this.ring.core.filled_size() >= this.min_ready {
                    return Poll::Ready(());
                }
                let shared = RingWaiters::enqueue_not_empty_shared(
                    this.ring.core.hooks(),
                    this.min_ready,
                    cx.waker().clone(),
                );
                this.shared = Some(shared);
                Poll::Pending
            }
        }
    }
}
