//! Message framing: the typed, sequenced, timestamped envelope stored at the
//! start of every slot.
//!
//! Wire layout (little-endian, 24 bytes):
//!
//! ```text
//! offset 0   type:          u32
//! offset 4   payload_size:  u32
//! offset 8   timestamp:     u64   monotonic nanoseconds, producer-local epoch
//! offset 16  sequence:      u64
//! offset 24  payload:       payload_size bytes, then undefined up to element_size
//! ```
//!
//! The codec goes through explicit byte accessors rather than a struct
//! transmute so the encoding stays stable regardless of host struct layout.

/// Bytes occupied by [`FrameHeader`] at the start of a slot.
pub const FRAME_HEADER_BYTES: usize = 24;

/// Open message-type tag.
///
/// The well-known values below cover the demo drivers; applications mint
/// their own tags by constructing `MessageType(n)` with any `u32`.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageType(pub u32);

impl MessageType {
    pub const UNKNOWN: MessageType = MessageType(0);
    pub const MARKET_DATA: MessageType = MessageType(1);
    pub const ORDER_UPDATE: MessageType = MessageType(2);
    pub const HEARTBEAT: MessageType = MessageType(3);
}

/// Decoded frame header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub msg_type: MessageType,
    /// Actual payload length; the rest of the slot is never read.
    pub payload_size: u32,
    /// `mono_now_ns()` at produce time.
    pub timestamp: u64,
    /// Per-producer-instance sequence, contiguous from 0.
    pub sequence: u64,
}

impl FrameHeader {
    /// Encode into the first [`FRAME_HEADER_BYTES`] of `buf`.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than [`FRAME_HEADER_BYTES`].
    pub fn write_to(&self, buf: &mut [u8]) {
        buf[0..4].copy_from_slice(&self.msg_type.0.to_le_bytes());
        buf[4..8].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[8..16].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[16..24].copy_from_slice(&self.sequence.to_le_bytes());
    }

    /// Decode from the first [`FRAME_HEADER_BYTES`] of `buf`.
    ///
    /// # Panics
    /// Panics if `buf` is shorter than [`FRAME_HEADER_BYTES`].
    pub fn read_from(buf: &[u8]) -> FrameHeader {
        FrameHeader {
            msg_type: MessageType(u32::from_le_bytes(buf[0..4].try_into().unwrap())),
            payload_size: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            timestamp: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
            sequence: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
        }
    }
}
