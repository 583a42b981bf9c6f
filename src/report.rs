use std::fmt;

use libc::sbrk;

use crate::heap::BlockHeap;

/// Renders the block chain of a heap, one line per block.
///
/// ```text
///   Heap state:
///   Block at 0: size=100, free=0, next=124
///   Block at 124: size=876, free=1, next=none
///   -------------------------
/// ```
pub struct HeapDump<'a, const SIZE: usize>(pub &'a BlockHeap<SIZE>);

impl<const SIZE: usize> fmt::Display for HeapDump<'_, SIZE> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "Heap state:")?;

    for block in self.0.blocks() {
      write!(
        f,
        "Block at {}: size={}, free={}, next=",
        block.offset, block.size, block.is_free as u8
      )?;
      match block.next {
        Some(next) => writeln!(f, "{next}")?,
        None => writeln!(f, "none")?,
      }
    }

    writeln!(f, "-------------------------")
  }
}

/// Prints the heap state to stdout, together with the program break.
///
/// The break never moves because of the heap: the arena is allocated up
/// front and nothing here asks the system for more memory.
pub fn print_heap<const SIZE: usize>(heap: &BlockHeap<SIZE>) {
  println!(
    "heap #{} ({} bytes), program break = {:?}",
    heap.id(),
    SIZE,
    // SAFETY: sbrk(0) only queries the current break and never moves it.
    unsafe { sbrk(0) }
  );
  print!("{}", HeapDump(heap));
}
