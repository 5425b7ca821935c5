use std::io::Read;

use libc::sbrk;

use exalloc::{BlockRef, Heap, Region, SbrkRegion};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how allocations change the
/// program break.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break using `sbrk(0)`.
/// The program break is the upper boundary of the heap managed via
/// brk/sbrk; every extension of the region moves it.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break (sbrk(0)) = {:?}",
    label,
    std::process::id(),
    unsafe { sbrk(0) },
  );
}

fn print_alloc(
  heap: &Heap<SbrkRegion>,
  block: BlockRef,
) {
  println!(
    "Allocated {} usable bytes at offset {}, region length = {}",
    heap.payload(block).len(),
    block.offset(),
    heap.region().len(),
  );
}

fn main() {
  // Run with RUST_LOG=debug to watch the heap dumps and extension
  // decisions as they happen.
  env_logger::init();

  print_program_break("start");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Build the heap. Construction grabs the sentinels plus one 4 KiB
  //    chunk from the data segment, so the break moves immediately.
  // --------------------------------------------------------------------
  let mut heap = Heap::new(SbrkRegion::new()).expect("sbrk refused the initial chunk");
  println!("\n[1] Heap initialized");
  print_program_break("after init");
  heap.dump();

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Allocate 100 bytes and write a pattern into the payload to show
  //    the block is usable.
  // --------------------------------------------------------------------
  let first = heap.allocate(100).expect("allocate(100)");
  println!("\n[2] Allocate 100 bytes");
  print_alloc(&heap, first);

  heap.payload_mut(first)[..12].copy_from_slice(b"exalloc demo");
  println!(
    "[2] Payload prefix now reads {:?}",
    std::str::from_utf8(&heap.payload(first)[..12]).unwrap(),
  );

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Allocate two small neighbors. Watch the offsets: each block costs
  //    its payload plus two tag words, rounded to 8 bytes.
  // --------------------------------------------------------------------
  let second = heap.allocate(16).expect("allocate(16)");
  let third = heap.allocate(16).expect("allocate(16)");
  println!("\n[3] Allocate two 16-byte blocks");
  print_alloc(&heap, second);
  print_alloc(&heap, third);

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Release the first block and allocate the same size again. The
  //    free list hands the just-freed block straight back: same offset.
  // --------------------------------------------------------------------
  heap.release(first);
  println!("\n[4] Released the 100-byte block");

  let reused = heap.allocate(100).expect("allocate(100) again");
  print_alloc(&heap, reused);
  println!(
    "[4] reused == first? {}",
    if reused == first {
      "Yes, first-fit returned the freed block"
    } else {
      "No, it was placed somewhere else"
    },
  );

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Reallocate one of the small blocks up to 1000 bytes. The contents
  //    move; the prefix survives the move.
  // --------------------------------------------------------------------
  heap.payload_mut(second)[..4].copy_from_slice(b"keep");

  let grown = heap.reallocate(Some(second), 1000).expect("reallocate");
  println!("\n[5] Reallocate 16 -> 1000 bytes");
  print_alloc(&heap, grown);
  println!(
    "[5] Prefix after the move: {:?}",
    std::str::from_utf8(&heap.payload(grown)[..4]).unwrap(),
  );

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 6) Allocate a large block to force the region to grow. This moves
  //    the program break again.
  // --------------------------------------------------------------------
  print_program_break("before large alloc");

  let big = heap.allocate(64 * 1024).expect("allocate(64 KiB)");
  println!("\n[6] Allocate 64 KiB");
  print_alloc(&heap, big);

  print_program_break("after large alloc");

  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 7) Tear-down is the process exit. Release what we hold, verify the
  //    structure one last time, and let the OS reclaim the segment.
  // --------------------------------------------------------------------
  heap.release(reused);
  heap.release(third);
  heap.release(grown);
  heap.release(big);

  heap.dump();

  match heap.check() {
    Ok(()) => println!("\n[7] Final consistency check passed"),
    Err(violation) => println!("\n[7] Consistency check failed: {violation}"),
  }

  println!("[7] End of walkthrough. The OS reclaims the segment on exit.");
}
