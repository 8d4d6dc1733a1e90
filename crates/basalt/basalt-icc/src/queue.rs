//! Framing layer: typed, timestamped, sequenced messages over the raw ring.
//!
//! A [`MessageQueue`] owns a [`RingBuffer`] whose element size is
//! `FRAME_HEADER_BYTES + max_payload`. `produce` stages a frame into a
//! process-local scratch slot and pushes it whole; `consume` hands the
//! caller the raw frame bytes (header at offset 0, payload right after) to
//! decode with [`FrameHeader::read_from`].

use std::path::Path;

use crate::clock::mono_now_ns;
use crate::error::{Error, Result};
use crate::frame::{FrameHeader, MessageType, FRAME_HEADER_BYTES};
use crate::layout::RingGeometry;
use crate::ring::{AttachOptions, RingBuffer};

/// One process's handle onto a framed broadcast queue.
///
/// Sequence numbers are issued per handle, starting at 0, and advance only
/// when a frame is actually committed to the ring. They are not coordinated
/// across handles: a region reopened by a new producer restarts at 0, so
/// consumers must not assume continuity across producer restarts.
#[derive(Debug)]
pub struct MessageQueue {
    ring: RingBuffer,
    max_payload: u32,
    element_size: u32,
    next_sequence: u64,
    /// Staging area for one frame, reused across `produce` calls. Bytes past
    /// the current payload keep stale contents; `payload_size` fences them
    /// off from readers.
    scratch: Vec<u8>,
}

impl MessageQueue {
    /// Create or attach to the named queue.
    ///
    /// `capacity` counts messages, not bytes. Region lifecycle, including
    /// the `force_recreate` / `no_create` rendezvous rules, is delegated to
    /// [`RingBuffer::create_or_attach`].
    pub fn open<P: AsRef<Path>>(
        path: P,
        capacity: u32,
        max_payload: u32,
        num_consumers: u32,
        options: AttachOptions,
    ) -> Result<MessageQueue> {
        if max_payload == 0 {
            return Err(Error::InvalidArgument("max_payload must be nonzero"));
        }
        let element_size = FRAME_HEADER_BYTES as u64 + max_payload as u64;
        if element_size > u32::MAX as u64 {
            return Err(Error::Overflow);
        }
        let element_size = element_size as u32;

        let ring = RingBuffer::create_or_attach(
            path,
            RingGeometry {
                capacity,
                element_size,
                num_consumers,
            },
            options,
        )?;

        Ok(MessageQueue {
            ring,
            max_payload,
            element_size,
            next_sequence: 0,
            scratch: vec![0; element_size as usize],
        })
    }

    /// Frame `payload` and broadcast it.
    ///
    /// Returns `Ok(false)` when the ring is full; the frame is not
    /// committed and the sequence counter does not advance.
    pub fn produce(&mut self, msg_type: MessageType, payload: &[u8]) -> Result<bool> {
        if payload.len() > self.max_payload as usize {
            return Err(Error::InvalidArgument("payload exceeds max_payload"));
        }

        let header = FrameHeader {
            msg_type,
            payload_size: payload.len() as u32,
            timestamp: mono_now_ns(),
            sequence: self.next_sequence,
        };
        header.write_to(&mut self.scratch);
        self.scratch[FRAME_HEADER_BYTES..FRAME_HEADER_BYTES + payload.len()]
            .copy_from_slice(payload);

        let pushed = self.ring.push(&self.scratch)?;
        if pushed {
            self.next_sequence += 1;
        }
        Ok(pushed)
    }

    /// Pop the next frame for `consumer_id` into `out`.
    ///
    /// `out` must hold at least [`MessageQueue::element_size`] bytes. On
    /// `Ok(true)` it contains the frame header at offset 0 and the payload
    /// at [`FRAME_HEADER_BYTES`].
    pub fn consume(&mut self, consumer_id: u32, out: &mut [u8]) -> Result<bool> {
        if out.len() < self.element_size as usize {
            return Err(Error::InvalidArgument(
                "output buffer shorter than element_size",
            ));
        }
        self.ring.pop(consumer_id, out)
    }

    pub fn empty(&self, consumer_id: u32) -> Result<bool> {
        self.ring.empty(consumer_id)
    }

    pub fn full(&self) -> bool {
        self.ring.full()
    }

    pub fn capacity(&self) -> u32 {
        self.ring.capacity()
    }

    /// Fill depth (messages waiting) seen by consumer `consumer_id`.
    pub fn size(&self, consumer_id: u32) -> Result<u32> {
        self.ring.size(consumer_id)
    }

    pub fn max_payload(&self) -> u32 {
        self.max_payload
    }

    /// Bytes per slot: `FRAME_HEADER_BYTES + max_payload`. This is the
    /// minimum buffer length for [`MessageQueue::consume`].
    pub fn element_size(&self) -> u32 {
        self.element_size
    }

    /// Whether this handle initialized the region (and will unlink it).
    pub fn is_creator(&self) -> bool {
        self.ring.is_creator()
    }

    /// Does an initialized region under `path` match this queue shape
    /// exactly (every header field and the total size)? Side-effect free;
    /// missing, undersized, or mismatched regions all report `false`.
    pub fn is_header_compatible<P: AsRef<Path>>(
        path: P,
        capacity: u32,
        max_payload: u32,
        num_consumers: u32,
    ) -> bool {
        let element_size = FRAME_HEADER_BYTES as u64 + max_payload as u64;
        let Ok(element_size) = u32::try_from(element_size) else {
            return false;
        };
        RingBuffer::is_compatible(
            path,
            RingGeometry {
                capacity,
                element_size,
                num_consumers,
            },
        )
    }
}
