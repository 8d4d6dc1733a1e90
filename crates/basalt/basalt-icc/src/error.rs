//! Error kinds surfaced by the bus core.
//!
//! Everything is reported to the caller; the core never retries, never logs,
//! never aborts. Ring-full and ring-empty are **not** errors: `push`, `pop`,
//! `produce` and `consume` report them as `Ok(false)`.

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Zero or otherwise illegal geometry, oversized payload, undersized
    /// caller buffer, or contradictory attach flags.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Frame header plus payload would not fit a 32-bit element size.
    #[error("element size exceeds the 32-bit range")]
    Overflow,

    /// `no_create` was requested and the region does not exist.
    #[error("shared region '{0}' does not exist")]
    NotFound(String),

    /// An existing region differs in total size or in a header field.
    #[error("shared region '{name}' has incompatible geometry")]
    IncompatibleGeometry { name: String },

    /// A consumer id at or beyond `num_consumers`.
    #[error("consumer id {consumer_id} out of range (num_consumers = {num_consumers})")]
    OutOfRange {
        consumer_id: u32,
        num_consumers: u32,
    },

    /// Region creation, sizing, or mapping failed in the OS.
    #[error("shared memory I/O failed")]
    Io(#[from] io::Error),
}
