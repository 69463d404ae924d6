//! Circular accounting and contiguous span views over a [`LinearMap`].

use std::cell::Cell;
use std::slice;

use crate::error::{Error, Input, Operation, Result};
use crate::map::LinearMap;

/// Invoked by [`RingCore`] after every cursor movement so a wake-up policy
/// can react to the new fill level. Implemented once, by `RingWaiters`.
pub trait RingHooks {
    /// Called after `commit` grows the writable region by `n` bytes.
    ///
    /// `non_filled_size` is the writer-side free space immediately after
    /// the movement.
    fn on_commit(&self, non_filled_size: usize);

    /// Called after `consume` grows the readable region by `n` bytes.
    ///
    /// `filled_size` is the reader-side available data immediately after
    /// the movement.
    fn on_consume(&self, filled_size: usize);
}

/// A circular byte queue built over a doubled virtual-memory mapping.
///
/// Because the mapping aliases `[0, capacity)` at `[capacity, 2*capacity)`,
/// the readable and writable regions are always addressable as a single
/// contiguous slice, no matter where their start offset falls.
///
/// The cursor fields live in `Cell`s so that `commit`/`consume` only need a
/// shared `&self`: two roles sharing one ring (a producer driving writes, a
/// consumer driving reads) each hold an ordinary `&Ring` and move the
/// cursors through it, rather than needing turns with exclusive `&mut`
/// access. Only `writable`/`writable_max` (which hand out a `&mut [u8]` into
/// the mapping) still require `&mut self`, since two live mutable spans over
/// the same bytes would alias.
pub struct RingCore<H> {
    map: LinearMap,
    filled_start: Cell<usize>,
    filled_size: Cell<usize>,
    non_filled_start: Cell<usize>,
    non_filled_size: Cell<usize>,
    low_watermark: usize,
    high_watermark: usize,
    hooks: H,
}

impl<H: RingHooks> RingCore<H> {
    /// Builds a ring of at least `size` bytes, with the given advisory
    /// watermarks, delegating its hook notifications to `hooks`.
    pub fn new(size: usize, low_watermark: usize, high_watermark: usize, hooks: H) -> Result<Self> {
        let map = LinearMap::new(size)?;
        let capacity = map.len();
        Ok(Self {
            map,
            filled_start: Cell::new(0),
            filled_size: Cell::new(0),
            non_filled_start: Cell::new(0),
            non_filled_size: Cell::new(capacity),
            low_watermark,
            high_watermark,
            hooks,
        })
    }

    /// The rounded allocation size backing this ring.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.map.len()
    }

    /// Number of bytes currently available to read.
    #[inline]
    pub fn filled_size(&self) -> usize {
        self.filled_size.get()
    }

    /// Number of bytes currently available to write.
    #[inline]
    pub fn non_filled_size(&self) -> usize {
        self.non_filled_size.get()
    }

    /// Whether there is nothing to read.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filled_size.get() == 0
    }

    /// `true` when the filled region is below the advisory high watermark.
    #[inline]
    pub fn below_high_watermark(&self) -> bool {
        self.filled_size.get() < self.high_watermark
    }

    /// `true` when the filled region is below the advisory low watermark.
    #[inline]
    pub fn below_low_watermark(&self) -> bool {
        self.filled_size.get() < self.low_watermark
    }

    /// A contiguous view of every readable byte.
    #[inline]
    pub fn readable(&self) -> &[u8] {
        self.readable_max(self.filled_size.get())
    }

    /// A contiguous view of up to `max` readable bytes.
    pub fn readable_max(&self, max: usize) -> &[u8] {
        let len = self.filled_size.get().min(max);
        unsafe { slice::from_raw_parts(self.map.as_ptr().add(self.filled_start.get()), len) }
    }

    /// A contiguous view of every writable byte.
    #[inline]
    pub fn writable(&mut self) -> &mut [u8] {
        self.writable_max(self.non_filled_size.get())
    }

    /// A contiguous view of up to `max` writable bytes.
    pub fn writable_max(&mut self, max: usize) -> &mut [u8] {
        let len = self.non_filled_size.get().min(max);
        let start = self.non_filled_start.get();
        unsafe { slice::from_raw_parts_mut(self.map.as_mut_ptr().add(start), len) }
    }

    /// Copies `src` into the writable region and marks it filled in one step.
    pub fn memcpy_in(&mut self, src: &[u8]) -> Result<()> {
        if src.len() > self.non_filled_size.get() {
            return Err(Error::input(Operation::RingConsume, Input::InsufficientSpace));
        }
        self.writable_max(src.len()).copy_from_slice(src);
        self.consume(src.len())
    }

    /// Copies out of the readable region into `dst` and frees it in one step.
    pub fn memcpy_out(&mut self, dst: &mut [u8]) -> Result<()> {
        if dst.len() > self.filled_size.get() {
            return Err(Error::input(Operation::RingCommit, Input::InsufficientData));
        }
        dst.copy_from_slice(self.readable_max(dst.len()));
        self.commit(dst.len())
    }

    /// Reader side: marks `n` previously-readable bytes as consumed,
    /// freeing them for the writer.
    ///
    /// Takes `&self`: a reader and a writer sharing one ring each hold a
    /// plain `&Ring`, so this has to work without exclusive access.
    pub fn commit(&self, n: usize) -> Result<()> {
        let filled_size = self.filled_size.get();
        if n > filled_size {
            return Err(Error::input(Operation::RingCommit, Input::PreconditionViolation));
        }
        let non_filled_size = self.non_filled_size.get() + n;
        self.non_filled_size.set(non_filled_size);
        self.filled_size.set(filled_size - n);
        self.filled_start.set((self.filled_start.get() + n) % self.capacity());
        self.hooks.on_commit(non_filled_size);
        Ok(())
    }

    /// Writer side: marks `n` previously-writable bytes as filled, making
    /// them available to the reader. Takes `&self`, see [`Self::commit`].
    pub fn consume(&self, n: usize) -> Result<()> {
        let non_filled_size = self.non_filled_size.get();
        if n > non_filled_size {
            return Err(Error::input(Operation::RingConsume, Input::PreconditionViolation));
        }
        let filled_size = self.filled_size.get() + n;
        self.filled_size.set(filled_size);
        self.non_filled_size.set(non_filled_size - n);
        self.non_filled_start.set((self.non_filled_start.get() + n) % self.capacity());
        self.hooks.on_consume(filled_size);
        Ok(())
    }

    /// Reads the filled byte at `pos` bytes past `filled_start`.
    ///
    /// `pos` is relative to the start of the currently readable region, not
    /// an absolute mapping offset.
    pub fn peek_byte_at(&self, pos: usize) -> u8 {
        self.readable_max(self.filled_size.get())[pos]
    }

    /// Reads the first four filled bytes as a native-endian `i32`.
    pub fn peek_i32(&self) -> Result<i32> {
        if self.filled_size.get() < 4 {
            return Err(Error::input(Operation::RingPeek, Input::InsufficientData));
        }
        let bytes = self.readable_max(4);
        Ok(i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// A contiguous view of the first `len` filled bytes.
    pub fn peek_bytes(&self, len: usize) -> Result<&[u8]> {
        if len > self.filled_size.get() {
            return Err(Error::input(Operation::RingPeek, Input::InsufficientData));
        }
        Ok(self.readable_max(len))
    }

    /// Empties the ring, restoring it to its just-constructed accounting
    /// state. Does not notify waiters; callers must quiesce any pending
    /// waits before calling this.
    pub fn reset(&self) {
        self.filled_start.set(0);
        self.filled_size.set(0);
        self.non_filled_start.set(0);
        self.non_filled_size.set(self.capacity());
    }

    /// Borrows the hooks object, e.g. so a wrapper can delegate enqueue
    /// calls to it directly.
    pub fn hooks(&self) -> &H {
        &self.hooks
    }
}

#[cfg(test)]
mod tests {
    use super::{RingCore, RingHooks};

    struct NoHooks;
    impl RingHooks for NoHooks {
        fn on_commit(&self, _non_filled_size: usize) {}
        fn on_consume(&self, _filled_size: usize) {}
    }

    #[test]
    fn fresh_ring_is_empty_and_fully_writable() {
        let ring = RingCore::new(1000, 0, 0, NoHooks).expect("failed to create ring");
        assert_eq!(ring.filled_size(), 0);
        assert_eq!(ring.non_filled_size(), ring.capacity());
        assert!(ring.is_empty());
    }

    #[test]
    fn consume_then_commit_round_trips() {
        let mut ring = RingCore::new(1000, 0, 0, NoHooks).expect("failed to create ring");
        let cap = ring.capacity();
        ring.memcpy_in(b"hello").expect("failed to write");
        assert_eq!(ring.filled_size(), 5);
        assert_eq!(ring.non_filled_size(), cap - 5);

        let mut out = [0u8; 5];
        ring.memcpy_out(&mut out).expect("failed to read");
        assert_eq!(&out, b"hello");
        assert_eq!(ring.filled_size(), 0);
        assert_eq!(ring.non_filled_size(), cap);
    }

    #[test]
    fn wrap_keeps_reads_contiguous() {
        let mut ring = RingCore::new(1000, 0, 0, NoHooks).expect("failed to create ring");
        let bytes = b"anthropomorphologically";
        let cap = ring.capacity();
        let n = cap / bytes.len();
        for _ in 0..n {
            ring.memcpy_in(bytes).expect("failed to write");
        }
        ring.commit((n - 1) * bytes.len()).expect("failed to commit");
        assert_eq!(ring.filled_size(), bytes.len());
        ring.memcpy_in(bytes).expect("failed to write");
        assert_eq!(ring.filled_size(), 2 * bytes.len());

        let expected = b"anthropomorphologicallyanthropomorphologically";
        assert_eq!(ring.readable_max(expected.len()), &expected[..]);
    }

    #[test]
    fn commit_past_filled_size_is_rejected() {
        let ring = RingCore::new(1000, 0, 0, NoHooks).expect("failed to create ring");
        assert!(ring.commit(1).is_err());
    }

    #[test]
    fn consume_past_non_filled_size_is_rejected() {
        let ring = RingCore::new(1000, 0, 0, NoHooks).expect("failed to create ring");
        let cap = ring.capacity();
        assert!(ring.consume(cap + 1).is_err());
    }

    #[test]
    fn peek_i32_reads_native_endian() {
        let mut ring = RingCore::new(1000, 0, 0, NoHooks).expect("failed to create ring");
        ring.memcpy_in(&42i32.to_ne_bytes()).expect("failed to write");
        assert_eq!(ring.peek_i32().unwrap(), 42);
    }

    #[test]
    fn reset_restores_fresh_accounting() {
        let mut ring = RingCore::new(1000, 0, 0, NoHooks).expect("failed to create ring");
        ring.memcpy_in(b"pending").expect("failed to write");
        ring.reset();
        assert_eq!(ring.filled_size(), 0);
        assert_eq!(ring.non_filled_size(), ring.capacity());
    }
}
