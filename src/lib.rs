//! A magic-mapped contiguous ring buffer with cooperative wake-up.
//!
//! [`Ring`] maps a fixed-capacity byte region twice into adjacent virtual
//! addresses, so the readable and writable spans are always addressable as
//! a single contiguous slice, no matter where their start offset falls or
//! whether the requested range wraps past the nominal end of the buffer.
//! Producers and consumers sharing one executor thread coordinate through a
//! pair of cooperative `Future`s, [`Ring::wait_not_full`] and
//! [`Ring::wait_not_empty`], resumed in FIFO enqueue order as soon as their
//! threshold is met.

//#![deny(missing_docs)]

mod error;
mod map;
mod ring;
mod size;

/// Low-level cross-platform virtual memory functions.
pub mod os;

pub use crate::error::{Error, Input, KernelResult, Operation, Result};
pub use crate::map::LinearMap;
pub use crate::ring::{Ring, WaitNotEmpty, WaitNotFull};
pub use crate::size::Size;
