use thiserror::Error;

/// Result of a heap operation.
pub type HeapResult<T> = Result<T, HeapError>;

/// Everything that can go wrong when talking to a [`BlockHeap`](crate::BlockHeap).
///
/// None of these leave the chain in a different state than before the call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
  #[error("out of memory: requested {requested} bytes, largest free block is {largest_free} bytes")]
  OutOfMemory {
    requested: usize,
    largest_free: usize,
  },

  #[error("handle was issued by heap #{handle_heap}, not by heap #{heap}")]
  ForeignHandle { heap: u32, handle_heap: u32 },

  #[error("invalid handle: no live block with payload at offset {0}")]
  InvalidHandle(usize),

  #[error("double release of block with payload at offset {0}")]
  DoubleRelease(usize),

  #[error("block with payload at offset {0} has already been released")]
  UseAfterRelease(usize),
}
