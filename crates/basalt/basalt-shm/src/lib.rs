//! Memory-mapped shared-region primitives.
//!
//! A basalt region is an ordinary file (typically under `/dev/shm`) mapped
//! with `MAP_SHARED` so that unrelated processes can rendezvous on it by
//! name. This crate only handles the mapping lifecycle; it never interprets
//! region contents. Geometry checks and header initialization live in
//! `basalt-icc`.
//!
//! The wrappers keep the backing `File` alive for the lifetime of the map.
//! Unlinking a name (`unlink`) removes it from the namespace; mappings that
//! are already established stay valid until dropped.

use memmap2::{Mmap, MmapMut};
use std::{
    fs::{File, OpenOptions},
    io,
    path::Path,
};

/// A writable shared mapping.
#[derive(Debug)]
pub struct ShmMapMut {
    _file: File,
    mmap: MmapMut,
}

/// A read-only shared mapping, used for probes and introspection.
#[derive(Debug)]
pub struct ShmMap {
    _file: File,
    mmap: Mmap,
}

impl ShmMapMut {
    /// Create-or-open `path` and map it read-write.
    ///
    /// The file is opened with create semantics but **without truncation**:
    /// an existing region's contents survive. A zero-length file (fresh, or
    /// racing another creator that has not sized it yet) is grown to
    /// `size_bytes`; any other length is left untouched so the caller can
    /// detect a size mismatch from [`ShmMapMut::len`].
    pub fn create_rw<P: AsRef<Path>>(path: P, size_bytes: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        if file.metadata()?.len() == 0 {
            file.set_len(size_bytes)?;
        }

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Map an existing file read-write without creating or resizing it.
    pub fn open_rw<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self { _file: file, mmap })
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    /// Return raw pointer to start of the mapped region.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }
}

impl ShmMap {
    /// Map an existing file read-only.
    pub fn open_ro<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path)?;

        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Self { _file: file, mmap })
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.mmap.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }
}

/// Remove `path` from the filesystem namespace.
///
/// Established mappings remain valid; only new openers are affected.
pub fn unlink<P: AsRef<Path>>(path: P) -> io::Result<()> {
    std::fs::remove_file(path)
}
