//! On-region binary layout of the ring buffer.
//!
//! The layout is little-endian and fixed so that unrelated processes built
//! from this crate agree byte-for-byte:
//!
//! ```text
//! offset 0           ┌──────────────────────────────────────────────┐
//!                    │ RingHeader { head │ capacity │ element_size  │  (64 B)
//!                    │              │ num_consumers │ padding }     │
//! offset 64          ├──────────────────────────────────────────────┤
//!                    │ ConsumerTail[0]  { tail │ padding }          │  (64 B)
//!                    │ ConsumerTail[1]  ...                         │  (64 B each)
//! offset 64 + 64*N   ├──────────────────────────────────────────────┤
//!                    │ Slot[0]   element_size bytes                 │
//!                    │ Slot[1]   ...                                │
//!                    │ Slot[capacity-1]                             │
//!                    └──────────────────────────────────────────────┘
//! ```
//!
//! The header and every tail entry occupy one full cache line each. Per-entry
//! padding for the tails is mandatory: independent consumers store to their
//! own `tail` on the hot path, and sharing a line would ping-pong it between
//! cores. The padded entry size is also the stride used for all offset
//! arithmetic.

use std::sync::atomic::AtomicU32;

use crate::error::{Error, Result};

/// Cache-line size the layout is padded to.
pub const CACHE_LINE: usize = 64;

/// Bytes occupied by [`RingHeader`] at the start of a region.
pub const HEADER_BYTES: usize = CACHE_LINE;

/// Bytes occupied by each [`ConsumerTail`] entry, padding included.
pub const TAIL_ENTRY_BYTES: usize = CACHE_LINE;

/// Region header at offset 0.
///
/// `head` is the producer's write position and the only mutable field; the
/// three geometry fields are written once by the initializing process and
/// read-only afterwards. `capacity == 0` is the sentinel for "mapped but not
/// yet initialized": fresh pages read as zero, and the initializer makes
/// `capacity` nonzero only after the rest of the header and all tails are in
/// place.
#[repr(C, align(64))]
pub struct RingHeader {
    /// Producer write position in `[0, capacity)`.
    pub head: AtomicU32,
    /// Number of slots. Zero means uninitialized.
    pub capacity: u32,
    /// Bytes per slot.
    pub element_size: u32,
    /// Number of consumer tails that follow the header.
    pub num_consumers: u32,
}

/// One consumer's read position, alone on its cache line.
#[repr(C, align(64))]
pub struct ConsumerTail {
    /// Read position in `[0, capacity)`.
    pub tail: AtomicU32,
}

/// The tuple of parameters that defines a region's shape.
///
/// Two regions are compatible when every field matches; the derived total
/// size then matches as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingGeometry {
    /// Number of slots, at least 2 (one slot always stays empty to tell a
    /// full ring from an empty one).
    pub capacity: u32,
    /// Bytes per slot.
    pub element_size: u32,
    /// Number of consumers, at least 1.
    pub num_consumers: u32,
}

impl RingGeometry {
    pub fn validate(&self) -> Result<()> {
        if self.capacity < 2 {
            return Err(Error::InvalidArgument("capacity must be at least 2"));
        }
        if self.element_size == 0 {
            return Err(Error::InvalidArgument("element_size must be nonzero"));
        }
        if self.num_consumers == 0 {
            return Err(Error::InvalidArgument("num_consumers must be at least 1"));
        }
        Ok(())
    }

    /// Byte offset of the slot array.
    #[inline]
    pub fn slots_offset(&self) -> usize {
        HEADER_BYTES + self.num_consumers as usize * TAIL_ENTRY_BYTES
    }

    /// Byte offset of consumer `i`'s tail entry.
    #[inline]
    pub fn tail_offset(consumer_id: u32) -> usize {
        HEADER_BYTES + consumer_id as usize * TAIL_ENTRY_BYTES
    }

    /// Total region size: header + tail array + slot array.
    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.slots_offset() as u64 + self.capacity as u64 * self.element_size as u64
    }
}

impl RingHeader {
    /// Geometry recorded in an initialized header.
    #[inline]
    pub fn geometry(&self) -> RingGeometry {
        RingGeometry {
            capacity: self.capacity,
            element_size: self.element_size,
            num_consumers: self.num_consumers,
        }
    }
}
