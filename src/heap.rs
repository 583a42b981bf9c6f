use std::{
  fmt,
  sync::atomic::{AtomicU32, Ordering},
};

use log::{debug, trace, warn};

use crate::{
  block::{Block, GENERATION_MASK, HEADER_SIZE},
  error::{HeapError, HeapResult},
};

/// Default arena capacity in bytes.
pub const HEAP_SIZE: usize = 1024;

static NEXT_HEAP_ID: AtomicU32 = AtomicU32::new(1);

/// Reference to a payload handed out by [`BlockHeap::allocate`].
///
/// Besides the payload offset it remembers which heap issued it and the
/// generation stamped into the block header at allocation time, so releasing
/// it twice, after a reset, or on another heap is reported instead of
/// corrupting the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
  heap: u32,
  offset: usize,
  generation: u64,
}

impl Handle {
  /// Offset of the first payload byte inside the arena.
  pub fn offset(&self) -> usize {
    self.offset
  }
}

/// One step of a chain walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Offset of the block header inside the arena.
  pub offset: usize,
  /// Payload bytes, header excluded.
  pub size: usize,
  pub is_free: bool,
  pub next: Option<usize>,
}

/// Occupancy summary computed from a chain walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub blocks: usize,
  pub free_blocks: usize,
  pub used_bytes: usize,
  pub free_bytes: usize,
  /// Bytes spent on headers.
  pub overhead_bytes: usize,
  pub largest_free: usize,
}

/// First-fit allocator over a fixed arena of `SIZE` bytes.
///
/// Every chunk is prefixed by a [`HEADER_SIZE`]-byte header stored in the
/// arena itself, and the headers form a forward chain that covers the arena
/// with no gaps:
///
/// ```text
///   offset 0
///   ┌────────┬───────────┬────────┬────────────────┬────────┬──────────┐
///   │ header │  payload  │ header │    payload     │ header │ payload  │
///   │  used  │   100 B   │  free  │     200 B      │  used  │   ...    │
///   └────────┴───────────┴────────┴────────────────┴────────┴──────────┘
///        │                ▲   │                      ▲
///        └── next ────────┘   └── next ──────────────┘
/// ```
///
/// Not thread safe. Wrap it in a lock if several threads share one arena.
pub struct BlockHeap<const SIZE: usize = HEAP_SIZE> {
  arena: [u8; SIZE],
  id: u32,
  epoch: u64,
}

impl<const SIZE: usize> BlockHeap<SIZE> {
  /// Largest request the arena can ever satisfy: the whole arena minus
  /// the first header, handed out without a split.
  pub const CAPACITY: usize = SIZE - HEADER_SIZE;

  /// Requests strictly smaller than this, made on a fresh arena, leave a
  /// free remainder block behind.
  pub const SPLIT_LIMIT: usize = SIZE - 2 * HEADER_SIZE;

  /// Creates an arena holding a single free block spanning all of it.
  pub fn new() -> Self {
    const {
      assert!(
        SIZE >= 2 * HEADER_SIZE,
        "arena must be able to hold at least two block headers"
      );
    }

    let mut heap = Self {
      arena: [0; SIZE],
      id: NEXT_HEAP_ID.fetch_add(1, Ordering::Relaxed),
      epoch: 0,
    };
    heap.reset();

    heap
  }

  /// Puts the arena back into its initial single-free-block state.
  ///
  /// Every handle issued before the reset is rejected afterwards.
  pub fn reset(&mut self) {
    self.arena.fill(0);
    Block::new(Self::CAPACITY, true, None, 0).write(&mut self.arena, 0);

    debug!(
      "heap #{}: initialized {} bytes, capacity {}",
      self.id,
      SIZE,
      Self::CAPACITY
    );
  }

  fn block_at(
    &self,
    offset: usize,
  ) -> Option<Block> {
    Block::read(&self.arena, offset)
  }

  /// Generations are 56 bits wide and wrap past [`GENERATION_MASK`], so a
  /// handle kept across 2^56 allocations could validate again.
  fn next_generation(&mut self) -> u64 {
    // 0 is reserved for blocks that were never handed out.
    self.epoch = ((self.epoch + 1) & GENERATION_MASK).max(1);
    self.epoch
  }

  /// First block in chain order that is free and holds at least `size`.
  fn find_free_block(
    &self,
    size: usize,
  ) -> Option<(usize, Block)> {
    let mut current = Some(0);

    while let Some(offset) = current {
      let block = self.block_at(offset)?;
      if block.is_free && block.size >= size {
        return Some((offset, block));
      }
      current = block.next;
    }

    None
  }

  /// Hands out a payload of at least `size` bytes.
  ///
  /// The chosen block is split when what is left after `size` bytes can
  /// hold a header plus at least one payload byte; otherwise the whole
  /// block is handed out.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> HeapResult<Handle> {
    let Some((offset, mut block)) = self.find_free_block(size) else {
      let largest_free = self.stats().largest_free;
      debug!(
        "heap #{}: out of memory, requested {} bytes, largest free {}",
        self.id, size, largest_free
      );
      return Err(HeapError::OutOfMemory {
        requested: size,
        largest_free,
      });
    };

    if block.size > size.saturating_add(HEADER_SIZE) {
      let split_at = Block::payload_offset(offset) + size;
      let remainder = Block::new(block.size - size - HEADER_SIZE, true, block.next, 0);
      remainder.write(&mut self.arena, split_at);

      trace!(
        "heap #{}: split block at {} into {} + {} bytes",
        self.id, offset, size, remainder.size
      );

      block.size = size;
      block.next = Some(split_at);
    }

    block.is_free = false;
    block.generation = self.next_generation();
    block.write(&mut self.arena, offset);

    let handle = Handle {
      heap: self.id,
      offset: Block::payload_offset(offset),
      generation: block.generation,
    };

    trace!(
      "heap #{}: allocated {} bytes at {} (block size {})",
      self.id, size, handle.offset, block.size
    );
    debug_assert!(self.chain_is_sound());

    Ok(handle)
  }

  /// Like [`allocate`](Self::allocate), with the whole payload zeroed.
  pub fn allocate_zeroed(
    &mut self,
    size: usize,
  ) -> HeapResult<Handle> {
    let handle = self.allocate(size)?;
    self.payload_mut(handle)?.fill(0);

    Ok(handle)
  }

  /// Releases the block behind `handle`; `None` is a no-op.
  ///
  /// If the following block is free it is merged into the released one.
  /// Only that one successor is looked at, and a free predecessor is left
  /// alone.
  pub fn deallocate(
    &mut self,
    handle: impl Into<Option<Handle>>,
  ) -> HeapResult<()> {
    let Some(handle) = handle.into() else {
      return Ok(());
    };

    let id = self.id;
    let (offset, mut block) = self
      .live_block(handle)
      .inspect_err(|err| warn!("heap #{id}: rejected release: {err}"))?;

    block.is_free = true;

    if let Some(next_offset) = block.next {
      if let Some(next) = self.block_at(next_offset).filter(|next| next.is_free) {
        block.size += HEADER_SIZE + next.size;
        block.next = next.next;
        Block::scrub(&mut self.arena, next_offset);

        trace!(
          "heap #{}: merged block at {} into block at {}",
          self.id, next_offset, offset
        );
      }
    }

    block.write(&mut self.arena, offset);

    trace!(
      "heap #{}: released block at {} ({} bytes free)",
      self.id, offset, block.size
    );
    debug_assert!(self.chain_is_sound());

    Ok(())
  }

  /// Payload bytes of a live allocation.
  pub fn payload(
    &self,
    handle: Handle,
  ) -> HeapResult<&[u8]> {
    let (_, block) = self.live_block(handle).map_err(use_after_release)?;

    self
      .arena
      .get(handle.offset..handle.offset.saturating_add(block.size))
      .ok_or(HeapError::InvalidHandle(handle.offset))
  }

  /// Mutable payload bytes of a live allocation.
  pub fn payload_mut(
    &mut self,
    handle: Handle,
  ) -> HeapResult<&mut [u8]> {
    let (_, block) = self.live_block(handle).map_err(use_after_release)?;

    self
      .arena
      .get_mut(handle.offset..handle.offset.saturating_add(block.size))
      .ok_or(HeapError::InvalidHandle(handle.offset))
  }

  /// Recovers the header behind `handle` and checks it is still the block
  /// the handle was issued for.
  fn live_block(
    &self,
    handle: Handle,
  ) -> HeapResult<(usize, Block)> {
    if handle.heap != self.id {
      return Err(HeapError::ForeignHandle {
        heap: self.id,
        handle_heap: handle.heap,
      });
    }

    let offset = handle
      .offset
      .checked_sub(HEADER_SIZE)
      .ok_or(HeapError::InvalidHandle(handle.offset))?;

    let block = self
      .block_at(offset)
      .filter(|block| block.generation == handle.generation)
      .ok_or(HeapError::InvalidHandle(handle.offset))?;

    if block.is_free {
      return Err(HeapError::DoubleRelease(handle.offset));
    }

    Ok((offset, block))
  }

  /// Walks the chain from the first block to the last.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      arena: &self.arena,
      cursor: Some(0),
    }
  }

  pub fn stats(&self) -> HeapStats {
    self.blocks().fold(HeapStats::default(), |mut stats, block| {
      stats.blocks += 1;
      stats.overhead_bytes += HEADER_SIZE;
      if block.is_free {
        stats.free_blocks += 1;
        stats.free_bytes += block.size;
        stats.largest_free = stats.largest_free.max(block.size);
      } else {
        stats.used_bytes += block.size;
      }
      stats
    })
  }

  /// Identifier distinguishing this arena's handles from other arenas'.
  pub fn id(&self) -> u32 {
    self.id
  }

  /// Every block starts right where the previous one ends and the last one
  /// ends at the arena boundary.
  fn chain_is_sound(&self) -> bool {
    let mut expected = 0;

    for block in self.blocks() {
      if block.offset != expected {
        return false;
      }
      expected = block.offset + HEADER_SIZE + block.size;
      if block.next.is_some_and(|next| next != expected) {
        return false;
      }
    }

    expected == SIZE
  }
}

/// The copy gets its own heap id: handles issued by the original are
/// foreign to it and the other way round.
impl<const SIZE: usize> Clone for BlockHeap<SIZE> {
  fn clone(&self) -> Self {
    Self {
      arena: self.arena,
      id: NEXT_HEAP_ID.fetch_add(1, Ordering::Relaxed),
      epoch: self.epoch,
    }
  }
}

impl<const SIZE: usize> Default for BlockHeap<SIZE> {
  fn default() -> Self {
    Self::new()
  }
}

impl<const SIZE: usize> fmt::Debug for BlockHeap<SIZE> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("BlockHeap")
      .field("id", &self.id)
      .field("size", &SIZE)
      .field("blocks", &self.blocks().collect::<Vec<_>>())
      .finish()
  }
}

fn use_after_release(err: HeapError) -> HeapError {
  match err {
    HeapError::DoubleRelease(offset) => HeapError::UseAfterRelease(offset),
    err => err,
  }
}

/// Iterator returned by [`BlockHeap::blocks`].
#[derive(Debug, Clone)]
pub struct Blocks<'a> {
  arena: &'a [u8],
  cursor: Option<usize>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    let offset = self.cursor.take()?;
    let block = Block::read(self.arena, offset)?;

    // The chain only ever points forward.
    self.cursor = block.next.filter(|&next| next > offset);

    Some(BlockInfo {
      offset,
      size: block.size,
      is_free: block.is_free,
      next: block.next,
    })
  }
}
