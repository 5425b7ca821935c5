//! Intrusive doubly-linked free list. Free blocks store predecessor and
//! successor offsets in their first two payload words; the always-allocated
//! prologue anchors the head and the zero-size epilogue is the permanent
//! tail node, so insertion and unlinking never touch a null neighbor.

use crate::block::{self, BlockRef, WSIZE};

pub(crate) fn pred(
  bytes: &[u8],
  bp: usize,
) -> usize {
  block::get(bytes, bp) as usize
}

pub(crate) fn succ(
  bytes: &[u8],
  bp: usize,
) -> usize {
  block::get(bytes, bp + WSIZE) as usize
}

pub(crate) fn set_pred(
  bytes: &mut [u8],
  bp: usize,
  to: usize,
) {
  block::put(bytes, bp, to as u32);
}

pub(crate) fn set_succ(
  bytes: &mut [u8],
  bp: usize,
  to: usize,
) {
  block::put(bytes, bp + WSIZE, to as u32);
}

/// Links `bp` in right after the anchor: most-recently-freed-first.
/// The block's tags must already mark it free with its final size.
pub(crate) fn insert(
  bytes: &mut [u8],
  anchor: usize,
  bp: usize,
) {
  let first = succ(bytes, anchor);

  set_succ(bytes, anchor, bp);
  set_pred(bytes, first, bp);
  set_pred(bytes, bp, anchor);
  set_succ(bytes, bp, first);
}

/// Splices `bp` out by relinking its neighbors past it. The block's own
/// link words are stale afterwards.
pub(crate) fn unlink(
  bytes: &mut [u8],
  bp: usize,
) {
  let prev = pred(bytes, bp);
  let next = succ(bytes, bp);

  set_succ(bytes, prev, next);
  set_pred(bytes, next, prev);
}

pub(crate) fn iter(
  bytes: &[u8],
  anchor: usize,
) -> FreeBlocks<'_> {
  FreeBlocks {
    bytes,
    at: succ(bytes, anchor),
  }
}

/// Forward scan of the free list, yielding each free block and its size.
/// The scan starts past the anchor and stops at the zero-size epilogue.
pub struct FreeBlocks<'a> {
  bytes: &'a [u8],
  at: usize,
}

impl<'a> Iterator for FreeBlocks<'a> {
  type Item = (BlockRef, usize);

  fn next(&mut self) -> Option<Self::Item> {
    if self.at == block::NIL {
      return None;
    }

    let size = block::block_size(self.bytes, self.at);

    if size == 0 {
      return None;
    }

    let bp = self.at;
    self.at = succ(self.bytes, self.at);

    Some((BlockRef(bp), size))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::NIL;

  // A hand-built region: anchor block at bp 8, two candidate free blocks
  // at bp 24 and bp 56, epilogue node at bp 80.
  fn fixture() -> (Vec<u8>, usize, usize, usize, usize) {
    let mut bytes = vec![0u8; 96];

    let anchor = 8;
    let a = 24;
    let b = 56;
    let epilogue = 80;

    block::set_tags(&mut bytes, anchor, 16, true);
    block::set_tags(&mut bytes, a, 24, false);
    block::set_tags(&mut bytes, b, 16, false);
    block::put(&mut bytes, block::hdr(epilogue), block::pack(0, true));

    set_pred(&mut bytes, anchor, NIL);
    set_succ(&mut bytes, anchor, epilogue);
    set_pred(&mut bytes, epilogue, anchor);
    set_succ(&mut bytes, epilogue, NIL);

    (bytes, anchor, a, b, epilogue)
  }

  #[test]
  fn test_insert_orders_most_recent_first() {
    let (mut bytes, anchor, a, b, epilogue) = fixture();

    insert(&mut bytes, anchor, a);
    insert(&mut bytes, anchor, b);

    assert_eq!(succ(&bytes, anchor), b);
    assert_eq!(pred(&bytes, b), anchor);
    assert_eq!(succ(&bytes, b), a);
    assert_eq!(pred(&bytes, a), b);
    assert_eq!(succ(&bytes, a), epilogue);
    assert_eq!(pred(&bytes, epilogue), a);

    let scanned: Vec<usize> = iter(&bytes, anchor).map(|(bp, _)| bp.offset()).collect();

    assert_eq!(scanned, vec![b, a]);
  }

  #[test]
  fn test_unlink_bypasses_block() {
    let (mut bytes, anchor, a, b, epilogue) = fixture();

    insert(&mut bytes, anchor, a);
    insert(&mut bytes, anchor, b);

    unlink(&mut bytes, b);

    assert_eq!(succ(&bytes, anchor), a);
    assert_eq!(pred(&bytes, a), anchor);

    let scanned: Vec<usize> = iter(&bytes, anchor).map(|(bp, _)| bp.offset()).collect();

    assert_eq!(scanned, vec![a]);

    unlink(&mut bytes, a);

    assert_eq!(succ(&bytes, anchor), epilogue);
    assert_eq!(pred(&bytes, epilogue), anchor);
    assert_eq!(iter(&bytes, anchor).count(), 0);
  }

  #[test]
  fn test_iter_reports_sizes() {
    let (mut bytes, anchor, a, b, _) = fixture();

    insert(&mut bytes, anchor, a);
    insert(&mut bytes, anchor, b);

    let sizes: Vec<usize> = iter(&bytes, anchor).map(|(_, size)| size).collect();

    assert_eq!(sizes, vec![16, 24]);
  }
}
