//! Lock-free SPMC broadcast ring buffer over a named shared region.
//!
//! One producer and a fixed number of independent consumers share a region
//! laid out per [`crate::layout`]. Every consumer sees every message; a slot
//! is reused only after the slowest consumer has moved past it, so a stalled
//! consumer back-pressures the producer (`push` returns `Ok(false)`) and is
//! never overtaken.
//!
//! # Memory-ordering protocol
//!
//! The producer is the sole writer of `head`; consumer `i` is the sole
//! writer of `tails[i]`. No compare-and-swap is needed, only three
//! orderings:
//!
//! - a counter's owner reads it `Relaxed` (single writer reading itself),
//! - the counter read that gates reading slot bytes is `Acquire`,
//! - the counter write that publishes slot bytes is `Release`.
//!
//! The producer's `Release` store of `head` happens-after its copy into the
//! slot, so a consumer's `Acquire` load of `head` guarantees it reads fully
//! initialized bytes. Symmetrically, a consumer's `Release` store of its
//! tail happens-after its copy out, so the producer's `Acquire` loads of the
//! tails guarantee nobody is still reading a slot it is about to reuse.
//!
//! Both operations are wait-free: a bounded number of loads, one copy, one
//! store. There is no blocking primitive; callers poll on `Ok(false)`.

use std::io;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::atomic::Ordering;

use basalt_shm::{ShmMap, ShmMapMut};

use crate::error::{Error, Result};
use crate::layout::{ConsumerTail, RingGeometry, RingHeader, HEADER_BYTES};

/// Flags controlling the create-or-attach rendezvous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachOptions {
    /// Unlink any existing region first and create a fresh one.
    pub force_recreate: bool,
    /// Only attach to an existing, geometry-compatible region; never create.
    pub no_create: bool,
}

/// Producer/consumer handle onto a shared ring.
///
/// Each process constructs its own handle; the region itself outlives any
/// one of them. The handle that initialized the region unlinks the name on
/// drop. Attached handles leave the name alone, so a consumer exiting does
/// not tear the bus down under the producer.
///
/// The handle is `Send` but deliberately not `Sync`: the single-writer
/// discipline (one producer for `head`, one consumer per tail) is part of
/// the protocol, not something the type system can check across processes.
#[derive(Debug)]
pub struct RingBuffer {
    /// Owns the mapping lifetime; accessed only through `base` after setup.
    _map: ShmMapMut,
    /// Start of the mapped region (header location).
    base: *mut u8,
    path: PathBuf,
    geometry: RingGeometry,
    slots_offset: usize,
    initialized_here: bool,
}

// SAFETY: `base` points into `_map`, which this handle owns for its whole
// lifetime. Cross-handle coordination goes through the atomics in the mapped
// header, so the handle may move between threads. Not `Sync`: each counter
// has exactly one writer.
unsafe impl Send for RingBuffer {}

/// Outcome of a read-only geometry probe against an existing region.
enum Probe {
    Missing,
    Mismatch,
    Match,
}

fn probe(path: &Path, geometry: &RingGeometry) -> Result<Probe> {
    let map = match ShmMap::open_ro(path) {
        Ok(map) => map,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Probe::Missing),
        Err(err) => return Err(Error::Io(err)),
    };
    if map.len() as u64 != geometry.total_bytes() {
        return Ok(Probe::Mismatch);
    }
    // Length matched, so at least a header's worth of bytes is mapped.
    let header = unsafe { &*(map.as_ptr() as *const RingHeader) };
    if header.geometry() == *geometry {
        Ok(Probe::Match)
    } else {
        Ok(Probe::Mismatch)
    }
}

fn incompatible(path: &Path) -> Error {
    Error::IncompatibleGeometry {
        name: path.display().to_string(),
    }
}

fn not_found(path: &Path) -> Error {
    Error::NotFound(path.display().to_string())
}

/// Number of published slots between `tail` and `head`, walking forward
/// modulo `capacity`.
#[inline(always)]
fn fill_depth(head: u32, tail: u32, capacity: u32) -> u32 {
    if head >= tail {
        head - tail
    } else {
        capacity - tail + head
    }
}

impl RingBuffer {
    /// Rendezvous on the named region.
    ///
    /// - both flags set is rejected outright;
    /// - `no_create` attaches to an existing compatible region or fails with
    ///   [`Error::NotFound`] / [`Error::IncompatibleGeometry`];
    /// - `force_recreate` unlinks any existing region first;
    /// - otherwise a compatible region is attached, an incompatible one is
    ///   unlinked and recreated, a missing one is created.
    ///
    /// Creation is idempotent: if the mapped header already carries a
    /// nonzero `capacity`, some other process won the initialization race
    /// and this handle attaches in place without rewriting anything. A size
    /// mismatch discovered after mapping is reported as
    /// [`Error::IncompatibleGeometry`].
    pub fn create_or_attach<P: AsRef<Path>>(
        path: P,
        geometry: RingGeometry,
        options: AttachOptions,
    ) -> Result<RingBuffer> {
        let path = path.as_ref();
        geometry.validate()?;
        if options.force_recreate && options.no_create {
            return Err(Error::InvalidArgument(
                "force_recreate and no_create are contradictory",
            ));
        }

        if options.no_create {
            match probe(path, &geometry)? {
                Probe::Missing => return Err(not_found(path)),
                Probe::Mismatch => return Err(incompatible(path)),
                Probe::Match => {}
            }
            let map = match ShmMapMut::open_rw(path) {
                Ok(map) => map,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return Err(not_found(path));
                }
                Err(err) => return Err(Error::Io(err)),
            };
            if map.len() as u64 != geometry.total_bytes() {
                return Err(incompatible(path));
            }
            return Ok(Self::from_map(map, path, geometry, false));
        }

        if options.force_recreate {
            let _ = basalt_shm::unlink(path);
        } else if matches!(probe(path, &geometry)?, Probe::Mismatch) {
            let _ = basalt_shm::unlink(path);
        }

        let map = ShmMapMut::create_rw(path, geometry.total_bytes())?;
        if map.len() as u64 != geometry.total_bytes() {
            // Lost a sizing race against a creator with different geometry.
            return Err(incompatible(path));
        }

        let mut ring = Self::from_map(map, path, geometry, false);
        if ring.header().capacity == 0 {
            ring.initialize();
            ring.initialized_here = true;
        } else if ring.header().geometry() != geometry {
            return Err(incompatible(path));
        }
        Ok(ring)
    }

    fn from_map(
        mut map: ShmMapMut,
        path: &Path,
        geometry: RingGeometry,
        initialized_here: bool,
    ) -> RingBuffer {
        let base = map.as_mut_ptr();
        RingBuffer {
            _map: map,
            base,
            path: path.to_path_buf(),
            geometry,
            slots_offset: geometry.slots_offset(),
            initialized_here,
        }
    }

    /// Write the header and zero every tail on a freshly mapped region.
    ///
    /// `capacity` goes last: a nonzero capacity is the sentinel that tells
    /// concurrent openers the region is ready, so head and all tails must be
    /// in place before it appears.
    fn initialize(&mut self) {
        unsafe {
            for i in 0..self.geometry.num_consumers {
                let entry = self.base.add(RingGeometry::tail_offset(i)) as *mut ConsumerTail;
                (*entry).tail.store(0, Ordering::Relaxed);
            }
            let header = self.base as *mut RingHeader;
            (*header).head.store(0, Ordering::Relaxed);
            ptr::addr_of_mut!((*header).element_size).write(self.geometry.element_size);
            ptr::addr_of_mut!((*header).num_consumers).write(self.geometry.num_consumers);
            ptr::addr_of_mut!((*header).capacity).write(self.geometry.capacity);
        }
    }

    #[inline(always)]
    fn header(&self) -> &RingHeader {
        // SAFETY: base points at a mapped region at least HEADER_BYTES long.
        unsafe { &*(self.base as *const RingHeader) }
    }

    #[inline(always)]
    fn tail_entry(&self, consumer_id: u32) -> &ConsumerTail {
        // SAFETY: consumer_id is checked against num_consumers by callers,
        // and the mapping covers the whole tail array.
        unsafe { &*(self.base.add(RingGeometry::tail_offset(consumer_id)) as *const ConsumerTail) }
    }

    #[inline(always)]
    fn slot_ptr(&self, index: u32) -> *const u8 {
        // SAFETY: index is always in [0, capacity), and the mapping covers
        // the whole slot array.
        unsafe {
            self.base
                .add(self.slots_offset + index as usize * self.geometry.element_size as usize)
        }
    }

    /// Min-tail: `min_i(tails[i])`, the slowest consumer's position. The
    /// producer may not advance `head` onto this slot.
    #[inline(always)]
    fn min_tail(&self) -> u32 {
        let mut min = self.tail_entry(0).tail.load(Ordering::Acquire);
        for i in 1..self.geometry.num_consumers {
            let tail = self.tail_entry(i).tail.load(Ordering::Acquire);
            if tail < min {
                min = tail;
            }
        }
        min
    }

    #[inline(always)]
    fn check_consumer(&self, consumer_id: u32) -> Result<()> {
        if consumer_id >= self.geometry.num_consumers {
            return Err(Error::OutOfRange {
                consumer_id,
                num_consumers: self.geometry.num_consumers,
            });
        }
        Ok(())
    }

    /// Copy one element into the ring. Producer-only.
    ///
    /// Returns `Ok(false)` when the ring is full for the slowest consumer;
    /// no bytes are written and `head` does not move.
    #[inline(always)]
    pub fn push(&mut self, src: &[u8]) -> Result<bool> {
        let element_size = self.geometry.element_size as usize;
        if src.len() < element_size {
            return Err(Error::InvalidArgument(
                "source buffer shorter than element_size",
            ));
        }

        let head = self.header().head.load(Ordering::Relaxed);
        let next_head = (head + 1) % self.geometry.capacity;
        if next_head == self.min_tail() {
            return Ok(false);
        }

        // SAFETY: slot `head` is owned by the producer until the release
        // store below publishes it; no consumer reads it before then.
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), self.slot_ptr(head) as *mut u8, element_size);
        }
        self.header().head.store(next_head, Ordering::Release);
        Ok(true)
    }

    /// Copy the next element for `consumer_id` out of the ring.
    ///
    /// Returns `Ok(false)` when the ring is empty for this consumer.
    #[inline(always)]
    pub fn pop(&mut self, consumer_id: u32, dst: &mut [u8]) -> Result<bool> {
        self.check_consumer(consumer_id)?;
        let element_size = self.geometry.element_size as usize;
        if dst.len() < element_size {
            return Err(Error::InvalidArgument(
                "destination buffer shorter than element_size",
            ));
        }

        let tail = self.tail_entry(consumer_id).tail.load(Ordering::Relaxed);
        let head = self.header().head.load(Ordering::Acquire);
        if tail == head {
            return Ok(false);
        }

        // SAFETY: the acquire load of head orders this copy after the
        // producer's writes; the release store below frees the slot.
        unsafe {
            ptr::copy_nonoverlapping(self.slot_ptr(tail), dst.as_mut_ptr(), element_size);
        }
        let next_tail = (tail + 1) % self.geometry.capacity;
        self.tail_entry(consumer_id)
            .tail
            .store(next_tail, Ordering::Release);
        Ok(true)
    }

    pub fn empty(&self, consumer_id: u32) -> Result<bool> {
        self.check_consumer(consumer_id)?;
        let head = self.header().head.load(Ordering::Acquire);
        let tail = self.tail_entry(consumer_id).tail.load(Ordering::Acquire);
        Ok(head == tail)
    }

    pub fn full(&self) -> bool {
        let head = self.header().head.load(Ordering::Relaxed);
        let next_head = (head + 1) % self.geometry.capacity;
        next_head == self.min_tail()
    }

    /// Fill depth seen by consumer `consumer_id`.
    pub fn size(&self, consumer_id: u32) -> Result<u32> {
        self.check_consumer(consumer_id)?;
        let head = self.header().head.load(Ordering::Acquire);
        let tail = self.tail_entry(consumer_id).tail.load(Ordering::Acquire);
        Ok(fill_depth(head, tail, self.geometry.capacity))
    }

    pub fn capacity(&self) -> u32 {
        self.geometry.capacity
    }

    pub fn element_size(&self) -> u32 {
        self.geometry.element_size
    }

    pub fn num_consumers(&self) -> u32 {
        self.geometry.num_consumers
    }

    /// Whether this handle initialized the region (and will unlink it).
    pub fn is_creator(&self) -> bool {
        self.initialized_here
    }

    /// Read-only probe: does an initialized region with exactly this
    /// geometry exist under `path`? Side-effect free.
    pub fn is_compatible<P: AsRef<Path>>(path: P, geometry: RingGeometry) -> bool {
        matches!(probe(path.as_ref(), &geometry), Ok(Probe::Match))
    }

    /// Read-only snapshot of a region's header for introspection tools.
    ///
    /// A region that exists but has not been initialized yet is reported
    /// with `capacity == 0` and no tails.
    pub fn inspect<P: AsRef<Path>>(path: P) -> Result<RingInfo> {
        let path = path.as_ref();
        let map = match ShmMap::open_ro(path) {
            Ok(map) => map,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(not_found(path)),
            Err(err) => return Err(Error::Io(err)),
        };
        if map.len() < HEADER_BYTES {
            return Err(incompatible(path));
        }
        let header = unsafe { &*(map.as_ptr() as *const RingHeader) };
        if header.capacity == 0 {
            return Ok(RingInfo {
                capacity: 0,
                element_size: 0,
                num_consumers: 0,
                head: 0,
                tails: Vec::new(),
            });
        }

        let geometry = header.geometry();
        if map.len() as u64 != geometry.total_bytes() {
            return Err(incompatible(path));
        }
        let head = header.head.load(Ordering::Acquire);
        let tails = (0..geometry.num_consumers)
            .map(|i| {
                let entry =
                    unsafe { &*(map.as_ptr().add(RingGeometry::tail_offset(i)) as *const ConsumerTail) };
                entry.tail.load(Ordering::Acquire)
            })
            .collect();

        Ok(RingInfo {
            capacity: geometry.capacity,
            element_size: geometry.element_size,
            num_consumers: geometry.num_consumers,
            head,
            tails,
        })
    }
}

impl Drop for RingBuffer {
    fn drop(&mut self) {
        // Only the initializing handle removes the name; an attaching
        // handle dropping must not tear the bus down under its peers.
        if self.initialized_here {
            let _ = basalt_shm::unlink(&self.path);
        }
    }
}

/// Snapshot of a region header taken by [`RingBuffer::inspect`].
#[derive(Debug, Clone)]
pub struct RingInfo {
    pub capacity: u32,
    pub element_size: u32,
    pub num_consumers: u32,
    pub head: u32,
    pub tails: Vec<u32>,
}

impl RingInfo {
    pub fn is_initialized(&self) -> bool {
        self.capacity != 0
    }

    /// Fill depth seen by consumer `consumer_id` at snapshot time.
    pub fn depth(&self, consumer_id: usize) -> u32 {
        fill_depth(self.head, self.tails[consumer_id], self.capacity)
    }

    pub fn geometry(&self) -> RingGeometry {
        RingGeometry {
            capacity: self.capacity,
            element_size: self.element_size,
            num_consumers: self.num_consumers,
        }
    }
}
