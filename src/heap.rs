//! Allocator core: carves blocks out of free space, returns them, and
//! keeps the boundary tags and free list consistent around every public
//! operation.

use log::{debug, trace};

use crate::align;
use crate::block::{self, BlockRef, CHUNK, DSIZE, MIN_BLOCK, WSIZE};
use crate::fit::{FirstFit, Fit};
use crate::list::{self, FreeBlocks};
use crate::region::{Error, Region};

/// An explicit-free-list heap over a growable [`Region`].
///
/// Each heap is an independent context; nothing is shared between
/// instances and nothing is global. All operations take `&mut self` and
/// run to completion on the caller's thread, so a heap shared across
/// threads needs an external lock (or one heap per thread).
pub struct Heap<R, F = FirstFit> {
  region: R,
  fit: F,
  anchor: usize,
}

impl<R: Region> Heap<R, FirstFit> {
  /// Builds a heap over `region` with the first-fit policy, seeding it
  /// with one [`CHUNK`]-byte free block.
  pub fn new(region: R) -> Result<Self, Error> {
    Self::with_fit(region, FirstFit)
  }
}

impl<R: Region, F: Fit> Heap<R, F> {
  /// Builds a heap with a caller-chosen placement policy.
  pub fn with_fit(
    region: R,
    fit: F,
  ) -> Result<Self, Error> {
    let mut heap = Self {
      region,
      fit,
      anchor: 0,
    };

    let start = heap.region.extend(8 * WSIZE)?;
    debug_assert_eq!(start % DSIZE, 0);

    heap.anchor = start + 2 * WSIZE;

    let anchor = heap.anchor;
    let epilogue = start + 6 * WSIZE;
    let bytes = heap.region.bytes_mut();

    // Alignment padding, then the two sentinels. The prologue is a
    // minimum-size allocated block anchoring the free list; the epilogue
    // is a zero-size allocated tag carrying the list's tail links.
    block::put(bytes, start, 0);
    block::put(bytes, start + WSIZE, block::pack(MIN_BLOCK, true));
    block::put(bytes, start + 4 * WSIZE, block::pack(MIN_BLOCK, true));
    block::put(bytes, start + 5 * WSIZE, block::pack(0, true));

    list::set_pred(bytes, anchor, block::NIL);
    list::set_succ(bytes, anchor, epilogue);
    list::set_pred(bytes, epilogue, anchor);
    list::set_succ(bytes, epilogue, block::NIL);

    if heap.extend(CHUNK / WSIZE).is_none() {
      return Err(Error::OutOfMemory);
    }

    Ok(heap)
  }

  /// Allocates `size` payload bytes.
  ///
  /// Returns `None` for a zero-size request (a no-op, not an error) and
  /// on resource exhaustion. The returned payload is double-word aligned
  /// and at least `size` bytes long.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<BlockRef> {
    if size == 0 {
      return None;
    }

    // A request this size would overflow the rounding arithmetic; no
    // region could grant it either way.
    if size > usize::MAX - 2 * DSIZE {
      return None;
    }

    // Room for the two tag words, rounded to the double-word boundary,
    // never below the smallest span that can rejoin the free list.
    let asize = align!(size + DSIZE).max(MIN_BLOCK);

    if let Some(bp) = self.fit.pick(list::iter(self.region.bytes(), self.anchor), asize) {
      self.place(bp.0, asize);
      return Some(bp);
    }

    let extend_size = asize.max(CHUNK);
    debug!("no fit for {asize} bytes, extending by {extend_size}");

    let bp = self.extend(extend_size / WSIZE)?;
    self.place(bp.0, asize);

    Some(bp)
  }

  /// Returns a block to the free pool and merges it with any free
  /// physical neighbor.
  ///
  /// `bp` must have come from [`allocate`](Self::allocate) or
  /// [`reallocate`](Self::reallocate) on this heap and must not have been
  /// released already; a double release is not detected.
  pub fn release(
    &mut self,
    bp: BlockRef,
  ) {
    let anchor = self.anchor;
    let bytes = self.region.bytes_mut();
    let size = block::block_size(bytes, bp.0);

    debug_assert!(block::block_alloc(bytes, bp.0));

    block::set_tags(bytes, bp.0, size, false);
    list::insert(bytes, anchor, bp.0);

    self.coalesce(bp.0);
  }

  /// Resizes a block by allocate-copy-release.
  ///
  /// `None` in degenerates to [`allocate`](Self::allocate); a zero size
  /// degenerates to [`release`](Self::release) and returns `None`. The
  /// surviving prefix of the old contents is preserved. On exhaustion the
  /// old block is left untouched and `None` is returned.
  pub fn reallocate(
    &mut self,
    bp: Option<BlockRef>,
    size: usize,
  ) -> Option<BlockRef> {
    let old = match bp {
      Some(old) => old,
      None => return self.allocate(size),
    };

    if size == 0 {
      self.release(old);
      return None;
    }

    let new = self.allocate(size)?;
    let count = self.payload(old).len().min(self.payload(new).len());

    let bytes = self.region.bytes_mut();
    bytes.copy_within(old.0..old.0 + count, new.0);

    self.release(old);

    Some(new)
  }

  /// Usable bytes of an allocated block. At least as long as the size
  /// requested from [`allocate`](Self::allocate); the slack past the
  /// request is the internal fragmentation the rounding rules accept.
  pub fn payload(
    &self,
    bp: BlockRef,
  ) -> &[u8] {
    let bytes = self.region.bytes();
    let size = block::block_size(bytes, bp.0);

    &bytes[bp.0..bp.0 + size - DSIZE]
  }

  pub fn payload_mut(
    &mut self,
    bp: BlockRef,
  ) -> &mut [u8] {
    let bytes = self.region.bytes_mut();
    let size = block::block_size(bytes, bp.0);

    &mut bytes[bp.0..bp.0 + size - DSIZE]
  }

  /// Scans the free list: `(block, size)` pairs in list order.
  pub fn free_blocks(&self) -> FreeBlocks<'_> {
    list::iter(self.region.bytes(), self.anchor)
  }

  pub fn region(&self) -> &R {
    &self.region
  }

  /// Unlinks `bp` and marks `asize` bytes of it allocated, splitting off
  /// the remainder as a new free block when it is large enough to ever
  /// rejoin the list.
  fn place(
    &mut self,
    bp: usize,
    asize: usize,
  ) {
    let anchor = self.anchor;
    let bytes = self.region.bytes_mut();
    let csize = block::block_size(bytes, bp);

    list::unlink(bytes, bp);

    if csize - asize >= MIN_BLOCK {
      // Split low: the request takes the front of the block.
      block::set_tags(bytes, bp, asize, true);

      let rest = bp + asize;
      block::set_tags(bytes, rest, csize - asize, false);
      list::insert(bytes, anchor, rest);
    } else {
      block::set_tags(bytes, bp, csize, true);
    }
  }

  /// Merges `bp` with whichever physical neighbors are free and returns
  /// the payload offset of the surviving block.
  fn coalesce(
    &mut self,
    bp: usize,
  ) -> usize {
    let bytes = self.region.bytes_mut();

    let prev_alloc = block::is_alloc(block::get(bytes, bp - DSIZE));
    let next = block::next_bp(bytes, bp);
    let next_alloc = block::block_alloc(bytes, next);
    let mut size = block::block_size(bytes, bp);

    if prev_alloc && next_alloc {
      return bp;
    }

    if prev_alloc && !next_alloc {
      trace!("coalesce: absorbing next block at {next}");
      size += block::block_size(bytes, next);
      list::unlink(bytes, next);
      block::set_tags(bytes, bp, size, false);
      return bp;
    }

    let prev = block::prev_bp(bytes, bp);

    if !prev_alloc && next_alloc {
      trace!("coalesce: folding into previous block at {prev}");
      size += block::block_size(bytes, prev);
      list::unlink(bytes, bp);
      block::set_tags(bytes, prev, size, false);
      return prev;
    }

    trace!("coalesce: folding into previous block at {prev} and absorbing {next}");
    size += block::block_size(bytes, prev) + block::block_size(bytes, next);
    list::unlink(bytes, bp);
    list::unlink(bytes, next);
    block::set_tags(bytes, prev, size, false);

    prev
  }

  /// Grows the region by `words` words (rounded up to keep alignment) and
  /// turns the grant into one free block.
  ///
  /// The old epilogue node becomes the new block in place: it keeps its
  /// tail position in the free list and its zero-size header is rewritten
  /// to the span just granted, then a fresh epilogue is written at the
  /// new end. Coalescing handles an already-free block at the old end.
  fn extend(
    &mut self,
    words: usize,
  ) -> Option<BlockRef> {
    let size = if words % 2 == 1 {
      (words + 1) * WSIZE
    } else {
      words * WSIZE
    };

    // Tags and list links ride in 32-bit words; a heap grown past what
    // they can encode could no longer address itself.
    if size > ((u32::MAX & !0x7) as usize).saturating_sub(self.region.len()) {
      return None;
    }

    let old_end = match self.region.extend(size) {
      Ok(end) => end,
      Err(Error::OutOfMemory) => return None,
    };

    let bp = old_end - 2 * WSIZE;
    let epilogue = bp + size;
    let bytes = self.region.bytes_mut();

    block::set_tags(bytes, bp, size, false);
    block::put(bytes, block::hdr(epilogue), block::pack(0, true));

    list::set_succ(bytes, bp, epilogue);
    list::set_pred(bytes, epilogue, bp);
    list::set_succ(bytes, epilogue, block::NIL);

    debug!("extended heap by {size} bytes, free block at {bp}");

    Some(BlockRef(self.coalesce(bp)))
  }

  pub(crate) fn bytes(&self) -> &[u8] {
    self.region.bytes()
  }

  #[cfg(test)]
  pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
    self.region.bytes_mut()
  }

  pub(crate) fn anchor(&self) -> usize {
    self.anchor
  }
}
