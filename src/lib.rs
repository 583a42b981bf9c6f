//! # blockheap - A Fixed-Arena First-Fit Allocator
//!
//! This crate provides a **block-list allocator** that manages one
//! pre-sized byte arena entirely in user space. It never asks the system
//! for memory after the arena exists.
//!
//! ## Overview
//!
//! The arena is carved into variable-length chunks. Each chunk is preceded
//! by a small header, and the headers form a singly-linked chain that covers
//! the whole arena with no gaps and no overlaps:
//!
//! ```text
//!   Block Chain:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                            ARENA (SIZE bytes)                        │
//!   │                                                                      │
//!   │   ┌────┬──────┬────┬──────────┬────┬──────┬────┬─────────────────┐   │
//!   │   │ H  │  A1  │ H  │   free   │ H  │  A2  │ H  │      free       │   │
//!   │   └────┴──────┴────┴──────────┴────┴──────┴────┴─────────────────┘   │
//!   │   ▲           ▲               ▲           ▲                          │
//!   │   │           │               │           │                          │
//!   │   offset 0    └─ next ────────┴─ next ────┴─ next ...                │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Allocation: first free block that fits, split if the rest is useful.
//!   Release: mark free, merge with the next block if that one is free.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   blockheap
//!   ├── block      - Header layout inside the arena (internal)
//!   ├── error      - HeapError and HeapResult
//!   ├── heap       - BlockHeap implementation
//!   └── report     - Heap dumps for inspection
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use blockheap::BlockHeap;
//!
//! let mut heap: BlockHeap = BlockHeap::new();
//!
//! let handle = heap.allocate(100).unwrap();
//! heap.payload_mut(handle).unwrap()[..5].copy_from_slice(b"hello");
//! assert_eq!(&heap.payload(handle).unwrap()[..5], b"hello");
//!
//! heap.deallocate(handle).unwrap();
//! assert_eq!(heap.stats().blocks, 1);
//! ```
//!
//! ## How It Works
//!
//! A fresh arena holds a single free block. Allocating `n` bytes walks the
//! chain from the start and takes the first free block with at least `n`
//! payload bytes. If more than one header's worth of bytes would be left
//! over, the block is split:
//!
//! ```text
//!   Split on allocate(n):
//!   ┌────────┬─────────────────────────────────────┐
//!   │ H free │               size                  │
//!   └────────┴─────────────────────────────────────┘
//!                         │
//!                         ▼
//!   ┌────────┬───────────┬────────┬────────────────┐
//!   │ H used │     n     │ H free │ size - n - H   │
//!   └────────┴───────────┴────────┴────────────────┘
//!            ▲
//!            └── Handle returned to the caller
//! ```
//!
//! Releasing a handle marks its block free and, when the block right after
//! it is free too, absorbs that block. Merging only looks forward: a block
//! released after its free predecessor stays a separate block.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: No synchronization primitives
//! - **No alignment**: Payloads are aligned to nothing beyond header size
//! - **Fixed capacity**: The arena never grows or shrinks
//! - **Forward-only coalescing**: Free predecessors are never merged
//!
//! ## Safety
//!
//! Headers live in the arena as plain bytes and handles are offsets, so the
//! allocator itself needs no `unsafe`. Releasing a handle twice, after a
//! reset, or on another heap is reported as a [`HeapError`].

mod block;
mod error;
mod heap;
pub mod report;

pub use block::HEADER_SIZE;
pub use error::{HeapError, HeapResult};
pub use heap::{BlockHeap, BlockInfo, Blocks, HEAP_SIZE, Handle, HeapStats};
pub use report::{HeapDump, print_heap};
