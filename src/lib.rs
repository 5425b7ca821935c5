//! # exalloc - An Explicit-Free-List Memory Allocator Library
//!
//! This crate provides a classic **boundary-tag allocator** with an explicit
//! doubly-linked free list, first-fit placement, block splitting, and
//! immediate coalescing, built over a single growable memory region such as
//! the one `sbrk` exposes.
//!
//! ## Overview
//!
//! ```text
//!   Heap Layout:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          HEAP REGION                                 │
//!   │                                                                      │
//!   │   ┌────┬──────────┬───────┬──────┬───────┬──────┬─────────────┬───┐  │
//!   │   │pad │ PROLOGUE │ alloc │ free │ alloc │ free │    alloc    │EPI│  │
//!   │   └────┴──────────┴───────┴──────┴───────┴──────┴─────────────┴───┘  │
//!   │          ▲                   │               │                  ▲    │
//!   │          │                   └───────────────┘                  │    │
//!   │      list anchor              free-list links               grows →  │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Every block carries its size in a header and footer tag, so physical
//!   neighbors are reachable in O(1) in both directions and freed blocks
//!   merge immediately.
//! ```
//!
//! Each block — free or allocated — is bounded by one-word tags packing the
//! block size with the allocated flag:
//!
//! ```text
//!   Allocated block:                    Free block:
//!   ┌──────────────────┬───┐            ┌──────────────────┬───┐
//!   │    block size    │ 1 │  header    │    block size    │ 0 │
//!   ├──────────────────┴───┤            ├──────────────────┴───┤
//!   │                      │            │     predecessor      │
//!   │       payload        │            ├──────────────────────┤
//!   │     and padding      │            │      successor       │
//!   │                      │            ├──────────────────────┤
//!   ├──────────────────┬───┤            │         ...          │
//!   │    block size    │ 1 │  footer    ├──────────────────┬───┤
//!   └──────────────────┴───┘            │    block size    │ 0 │
//!                                       └──────────────────┴───┘
//!
//!   Free blocks overlay their list links on the first two payload words;
//!   the minimum block size guarantees the room is always there.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   exalloc
//!   ├── align      - Alignment macro (align!)
//!   ├── block      - Boundary-tag codec and layout constants
//!   ├── list       - Intrusive free list (internal)
//!   ├── fit        - Placement policy trait and FirstFit
//!   ├── region     - Region trait, SbrkRegion, BoundedRegion
//!   ├── heap       - Heap: allocate / release / reallocate
//!   └── check      - Advisory consistency checker and dump
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use exalloc::{BoundedRegion, Heap};
//!
//! let mut heap = Heap::new(BoundedRegion::new(1 << 20)).unwrap();
//!
//! let block = heap.allocate(100).unwrap();
//! heap.payload_mut(block)[..5].copy_from_slice(b"hello");
//! assert_eq!(&heap.payload(block)[..5], b"hello");
//!
//! let block = heap.reallocate(Some(block), 1000).unwrap();
//! assert_eq!(&heap.payload(block)[..5], b"hello");
//!
//! heap.release(block);
//! ```
//!
//! On a Unix target the same heap runs over the real data segment:
//!
//! ```rust,ignore
//! use exalloc::{Heap, SbrkRegion};
//!
//! let mut heap = Heap::new(SbrkRegion::new()).unwrap();
//! let block = heap.allocate(4096).unwrap();
//! ```
//!
//! ## How It Works
//!
//! `allocate` rounds the request up to a double-word-aligned block size,
//! scans the free list first-fit, and splits the chosen block when the
//! remainder is large enough to stand alone. When nothing fits, the region
//! grows by at least [`CHUNK`] bytes and the new span becomes one free
//! block. `release` flips the tags to free, links the block in at the list
//! head, and merges it with any free physical neighbor right away, so two
//! adjacent free blocks never exist between operations. `reallocate` is
//! allocate-copy-release with no in-place resizing.
//!
//! Blocks are named by [`BlockRef`], an offset from the region base rather
//! than a raw address. Payload bytes are read and written through slices
//! returned by [`Heap::payload`] and [`Heap::payload_mut`], so all offset
//! arithmetic stays bounds-checked inside the crate.
//!
//! ## Features
//!
//! - **Explicit free list**: only free blocks are scanned during search
//! - **Immediate coalescing**: freeing merges with both neighbors in O(1)
//! - **Pluggable placement**: the [`Fit`] trait isolates the search policy
//! - **Swappable region**: `sbrk`-backed or in-memory, same allocator
//!
//! ## Limitations
//!
//! - **Single-threaded only**: one mutator per heap; share behind a lock
//!   or give each thread its own heap
//! - **The heap never shrinks**: released memory is recycled, not returned
//!   to the operating system
//! - **First-fit only out of the box**: no segregated size classes
//! - **No double-release detection**: releasing a block twice is a caller
//!   error with undefined results, as with any low-level allocator
//!
//! ## Safety
//!
//! The allocator itself is safe code over byte slices. The only unsafe
//! surface is [`SbrkRegion`], which wraps the `sbrk` system call and hands
//! the granted bytes out as a slice.

pub mod align;
mod block;
mod check;
mod fit;
mod heap;
mod list;
mod region;

pub use block::{BlockRef, CHUNK, DSIZE, MIN_BLOCK, WSIZE};
pub use check::Violation;
pub use fit::{FirstFit, Fit};
pub use heap::Heap;
pub use list::FreeBlocks;
pub use region::{BoundedRegion, Error, Region, SbrkRegion};
