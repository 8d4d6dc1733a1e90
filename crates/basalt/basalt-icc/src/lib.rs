//! `basalt-icc`: the core of the basalt bus, a lock-free single-producer
//! multi-consumer broadcast message queue in named shared memory.
//!
//! Built for ultra-low-latency fan-out between cooperating processes on one
//! host (the canonical use is market-data distribution). A bounded ring of
//! fixed-size slots lives in a named region; one producer broadcasts and
//! every consumer sees every message. A slow consumer back-pressures the
//! producer; nothing is dropped or overwritten.
//!
//! # Core Components
//!
//! - [`MessageQueue`]: framed produce/consume with type tags, timestamps and
//!   sequence numbers
//! - [`RingBuffer`]: the raw slot ring, attach protocol and introspection
//! - [`AttachOptions`]: `force_recreate` / `no_create` rendezvous control
//! - [`FrameHeader`] / [`MessageType`]: the per-message envelope
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐        named shared region        ┌──────────────┐
//! │   producer   │ ───────────────────────────────── │  consumer 0  │
//! │ (Process A)  │   header │ tails[N] │ slots[C]    └──────────────┘
//! └──────────────┘                                   ┌──────────────┐
//!                                                    │  consumer 1  │
//!                                                    └──────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use basalt_icc::{AttachOptions, FrameHeader, MessageQueue, MessageType, FRAME_HEADER_BYTES};
//!
//! // Producer process
//! let mut queue =
//!     MessageQueue::open("/dev/shm/ticks", 1024, 64, 2, AttachOptions::default())?;
//! queue.produce(MessageType::MARKET_DATA, b"payload")?;
//!
//! // Consumer process (id 0)
//! let mut queue =
//!     MessageQueue::open("/dev/shm/ticks", 1024, 64, 2, AttachOptions::default())?;
//! let mut buf = vec![0u8; queue.element_size() as usize];
//! if queue.consume(0, &mut buf)? {
//!     let header = FrameHeader::read_from(&buf);
//!     let payload = &buf[FRAME_HEADER_BYTES..][..header.payload_size as usize];
//! }
//! ```
//!
//! # Internal Modules
//!
//! - `ring`: SPMC ring, memory-ordering protocol, attach protocol
//! - `layout`: on-region binary layout and geometry arithmetic
//! - `frame`: frame-header codec and message types
//! - `queue`: the framing layer over the ring
//! - `clock`: monotonic nanosecond timestamps

#[cfg(not(unix))]
compile_error!("basalt-icc only supports Unix-like operating systems.");

mod clock;
mod error;
mod frame;
mod layout;
mod queue;
mod ring;

pub use clock::mono_now_ns;
pub use error::{Error, Result};
pub use frame::{FrameHeader, MessageType, FRAME_HEADER_BYTES};
pub use layout::{RingGeometry, CACHE_LINE, HEADER_BYTES, TAIL_ENTRY_BYTES};
pub use queue::MessageQueue;
pub use ring::{AttachOptions, RingBuffer, RingInfo};
