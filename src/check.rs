//! Advisory consistency checking. Nothing here runs on the allocation
//! path; `check` exists for tests and postmortems, `dump` for watching
//! the block sequence evolve under a debug logger.

use std::fmt;

use log::debug;

use crate::block::{self, DSIZE};
use crate::fit::Fit;
use crate::heap::Heap;
use crate::list;
use crate::region::Region;

/// First invariant violation found by [`Heap::check`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Violation {
  /// Header and footer of the block at `bp` disagree.
  TagMismatch { bp: usize },
  /// A block size or payload offset is off the double-word boundary.
  Misaligned { bp: usize },
  /// Two physically adjacent blocks are both free.
  AdjacentFree { bp: usize },
  /// A free-list member is not marked free.
  AllocatedInList { bp: usize },
  /// A free block is not reachable from the list anchor.
  MissingFromList { bp: usize },
  /// Neighboring list nodes disagree about each other.
  BrokenLink { bp: usize },
  /// The list visits a different number of blocks than the physical walk
  /// finds free.
  CountMismatch { listed: usize, free: usize },
  /// The final tag is not the allocated zero-size sentinel.
  BadEpilogue,
}

impl fmt::Display for Violation {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Violation::TagMismatch { bp } => write!(f, "header/footer mismatch at {bp}"),
      Violation::Misaligned { bp } => write!(f, "misaligned block at {bp}"),
      Violation::AdjacentFree { bp } => write!(f, "uncoalesced free neighbors at {bp}"),
      Violation::AllocatedInList { bp } => write!(f, "allocated block at {bp} in free list"),
      Violation::MissingFromList { bp } => write!(f, "free block at {bp} not in free list"),
      Violation::BrokenLink { bp } => write!(f, "broken list link at {bp}"),
      Violation::CountMismatch { listed, free } => {
        write!(f, "{listed} listed blocks but {free} free blocks")
      }
      Violation::BadEpilogue => write!(f, "corrupt epilogue"),
    }
  }
}

impl<R: Region, F: Fit> Heap<R, F> {
  /// Walks the free list and then the physical block sequence, verifying
  /// the structural invariants. Reports the first violation found.
  ///
  /// This is diagnostic tooling; no public operation calls it.
  pub fn check(&self) -> Result<(), Violation> {
    let bytes = self.bytes();
    let anchor = self.anchor();

    // List walk: link symmetry, only free blocks behind the anchor, the
    // epilogue as the permanent tail.
    let mut listed = 0usize;
    let mut from = anchor;
    let mut at = list::succ(bytes, anchor);

    loop {
      if at == block::NIL {
        return Err(Violation::BrokenLink { bp: from });
      }

      if list::pred(bytes, at) != from {
        return Err(Violation::BrokenLink { bp: at });
      }

      if block::block_size(bytes, at) == 0 {
        break;
      }

      if block::block_alloc(bytes, at) {
        return Err(Violation::AllocatedInList { bp: at });
      }

      listed += 1;
      from = at;
      at = list::succ(bytes, at);
    }

    // Physical walk from the prologue to the epilogue.
    let mut free = 0usize;
    let mut prev_free = false;
    let mut bp = anchor;

    loop {
      let head = block::get(bytes, block::hdr(bp));
      let size = block::size_of(head);

      if size == 0 {
        if !block::is_alloc(head) {
          return Err(Violation::BadEpilogue);
        }
        break;
      }

      if bp % DSIZE != 0 || size % DSIZE != 0 {
        return Err(Violation::Misaligned { bp });
      }

      if head != block::get(bytes, bp + size - DSIZE) {
        return Err(Violation::TagMismatch { bp });
      }

      let is_free = !block::is_alloc(head);

      if is_free {
        if prev_free {
          return Err(Violation::AdjacentFree { bp });
        }

        if !list::iter(bytes, anchor).any(|(member, _)| member.0 == bp) {
          return Err(Violation::MissingFromList { bp });
        }

        free += 1;
      }

      prev_free = is_free;
      bp += size;
    }

    if listed != free {
      return Err(Violation::CountMismatch { listed, free });
    }

    Ok(())
  }

  /// Logs every physical block at debug level, sentinels included.
  pub fn dump(&self) {
    let bytes = self.bytes();
    let mut bp = self.anchor();

    debug!("heap dump, {} bytes", bytes.len());

    loop {
      let head = block::get(bytes, block::hdr(bp));
      let size = block::size_of(head);

      if size == 0 {
        debug!("  epilogue at {bp}");
        break;
      }

      debug!(
        "  block at {bp}: size {size} {}",
        if block::is_alloc(head) { "allocated" } else { "free" },
      );

      bp += size;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::region::BoundedRegion;

  fn heap() -> Heap<BoundedRegion> {
    Heap::new(BoundedRegion::new(1 << 20)).unwrap()
  }

  #[test]
  fn test_fresh_heap_is_consistent() {
    let heap = heap();

    assert_eq!(heap.check(), Ok(()));
  }

  #[test]
  fn test_detects_tag_mismatch() {
    let mut heap = heap();

    let bp = heap.allocate(24).unwrap();
    let size = heap.payload(bp).len() + DSIZE;

    // Flip the allocated bit in the header only.
    let at = block::hdr(bp.offset());
    block::put(heap.bytes_mut(), at, block::pack(size, false));

    assert_eq!(heap.check(), Err(Violation::TagMismatch { bp: bp.offset() }));
  }

  #[test]
  fn test_detects_free_block_missing_from_list() {
    let mut heap = heap();

    let bp = heap.allocate(24).unwrap();
    let size = heap.payload(bp).len() + DSIZE;

    // Mark the block free in both tags without linking it in.
    block::set_tags(heap.bytes_mut(), bp.offset(), size, false);

    assert_eq!(
      heap.check(),
      Err(Violation::MissingFromList { bp: bp.offset() }),
    );
  }

  #[test]
  fn test_detects_allocated_block_in_list() {
    let mut heap = heap();

    let bp = heap.allocate(24).unwrap();

    // Splice the allocated block into the list behind the anchor.
    let anchor = heap.anchor();
    list::insert(heap.bytes_mut(), anchor, bp.offset());

    assert_eq!(
      heap.check(),
      Err(Violation::AllocatedInList { bp: bp.offset() }),
    );
  }

  #[test]
  fn test_dump_does_not_disturb_the_heap() {
    let mut heap = heap();

    let bp = heap.allocate(100).unwrap();
    heap.payload_mut(bp).fill(0x42);

    heap.dump();

    assert!(heap.payload(bp).iter().all(|&b| b == 0x42));
    assert_eq!(heap.check(), Ok(()));
  }
}
