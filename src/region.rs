//! The memory-extension boundary: a [`Region`] is a contiguous byte range
//! that only ever grows. [`SbrkRegion`] grows the real process data segment
//! through `sbrk(2)`; [`BoundedRegion`] grows an owned buffer up to a fixed
//! capacity, standing in for the data segment in tests and anywhere heap
//! growth must stay confined.

use std::{fmt, slice};

use libc::{c_void, intptr_t, sbrk};

/// Failure to extend a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
  /// The environment cannot grant more memory.
  OutOfMemory,
}

impl fmt::Display for Error {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Error::OutOfMemory => write!(f, "out of memory"),
    }
  }
}

impl std::error::Error for Error {}

/// A growable contiguous byte range: "extend by N bytes, get the old end
/// back, or fail." Block references are offsets into this range, so the
/// backing storage may move as long as the byte contents stay put.
pub trait Region {
  /// Extends the region by `incr` bytes and returns the old end offset.
  fn extend(
    &mut self,
    incr: usize,
  ) -> Result<usize, Error>;

  /// Bytes granted so far.
  fn len(&self) -> usize;

  fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn bytes(&self) -> &[u8];

  fn bytes_mut(&mut self) -> &mut [u8];
}

/// Region backed by the process data segment. Growth moves the program
/// break; the bytes never move once granted.
pub struct SbrkRegion {
  base: *mut u8,
  len: usize,
}

impl SbrkRegion {
  /// Anchors the region at the current program break.
  pub fn new() -> Self {
    let base = unsafe { sbrk(0) } as *mut u8;

    Self { base, len: 0 }
  }
}

impl Default for SbrkRegion {
  fn default() -> Self {
    Self::new()
  }
}

impl Region for SbrkRegion {
  fn extend(
    &mut self,
    incr: usize,
  ) -> Result<usize, Error> {
    let address = unsafe { sbrk(incr as intptr_t) };

    if address == usize::MAX as *mut c_void {
      return Err(Error::OutOfMemory);
    }

    // Another caller moved the break since our last extension; the new
    // grant is not contiguous with ours and cannot be addressed by
    // offset, so treat it as unavailable.
    if address as *mut u8 != unsafe { self.base.add(self.len) } {
      return Err(Error::OutOfMemory);
    }

    let old_end = self.len;
    self.len += incr;

    Ok(old_end)
  }

  fn len(&self) -> usize {
    self.len
  }

  fn bytes(&self) -> &[u8] {
    unsafe { slice::from_raw_parts(self.base, self.len) }
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    unsafe { slice::from_raw_parts_mut(self.base, self.len) }
  }
}

/// Region over an owned, zero-filled buffer with a hard capacity limit.
/// Extension past the limit fails the way an exhausted data segment would.
pub struct BoundedRegion {
  buf: Vec<u8>,
  limit: usize,
}

impl BoundedRegion {
  pub fn new(limit: usize) -> Self {
    Self {
      buf: Vec::with_capacity(limit),
      limit,
    }
  }
}

impl Region for BoundedRegion {
  fn extend(
    &mut self,
    incr: usize,
  ) -> Result<usize, Error> {
    let old_end = self.buf.len();

    if old_end + incr > self.limit {
      return Err(Error::OutOfMemory);
    }

    self.buf.resize(old_end + incr, 0);

    Ok(old_end)
  }

  fn len(&self) -> usize {
    self.buf.len()
  }

  fn bytes(&self) -> &[u8] {
    &self.buf
  }

  fn bytes_mut(&mut self) -> &mut [u8] {
    &mut self.buf
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_bounded_extend_returns_old_end() {
    let mut region = BoundedRegion::new(128);

    assert_eq!(region.extend(32), Ok(0));
    assert_eq!(region.extend(64), Ok(32));
    assert_eq!(region.len(), 96);
    assert!(region.bytes().iter().all(|&b| b == 0));
  }

  #[test]
  fn test_bounded_exhaustion() {
    let mut region = BoundedRegion::new(64);

    assert_eq!(region.extend(64), Ok(0));
    assert_eq!(region.extend(1), Err(Error::OutOfMemory));

    // A failed extension leaves the region usable.
    assert_eq!(region.len(), 64);
  }

  #[test]
  fn test_bounded_contents_survive_growth() {
    let mut region = BoundedRegion::new(256);

    region.extend(16).unwrap();
    region.bytes_mut()[..4].copy_from_slice(b"tags");

    region.extend(128).unwrap();

    assert_eq!(&region.bytes()[..4], b"tags");
  }
}
