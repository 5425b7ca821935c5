//! Placement policy seam. The heap hands every search to a [`Fit`]
//! implementation, so the scan policy can change without touching the
//! split, extend, or coalesce logic.

use crate::block::BlockRef;
use crate::list::FreeBlocks;

/// Chooses a free block from a forward scan of the free list.
pub trait Fit {
  /// Returns a scanned block whose size is at least `size`, or `None`
  /// when no such block exists. `None` is not an error; it tells the
  /// heap to grow instead.
  fn pick(
    &mut self,
    scan: FreeBlocks<'_>,
    size: usize,
  ) -> Option<BlockRef>;
}

/// First-fit: takes the first adequately sized block the scan reaches,
/// trading average fragmentation for a cheap search.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstFit;

impl Fit for FirstFit {
  fn pick(
    &mut self,
    mut scan: FreeBlocks<'_>,
    size: usize,
  ) -> Option<BlockRef> {
    scan.find(|&(_, have)| have >= size).map(|(bp, _)| bp)
  }
}
