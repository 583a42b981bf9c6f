use blockheap::{BlockHeap, BlockInfo, HEADER_SIZE, HEAP_SIZE, Handle};
use proptest::{prelude::*, sample::Index};

#[derive(Debug, Clone)]
enum Op {
  Allocate(usize),
  Release(Index),
  ReleaseNone,
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    4 => (0usize..320).prop_map(Op::Allocate),
    3 => any::<Index>().prop_map(Op::Release),
    1 => Just(Op::ReleaseNone),
  ]
}

fn snapshot(heap: &BlockHeap) -> Vec<BlockInfo> {
  heap.blocks().collect()
}

/// Blocks tile the arena from offset 0 to the end, in order.
fn assert_tiled(blocks: &[BlockInfo]) {
  let mut expected = 0;

  for (i, block) in blocks.iter().enumerate() {
    assert_eq!(block.offset, expected, "gap or overlap at block {i}");
    expected = block.offset + HEADER_SIZE + block.size;

    let next = if i + 1 < blocks.len() {
      Some(expected)
    } else {
      None
    };
    assert_eq!(block.next, next, "bad next link at block {i}");
  }

  let total: usize = blocks.iter().map(|block| HEADER_SIZE + block.size).sum();
  assert_eq!(total, HEAP_SIZE);
}

fn block_of(
  blocks: &[BlockInfo],
  handle: Handle,
) -> Option<(usize, BlockInfo)> {
  blocks
    .iter()
    .copied()
    .enumerate()
    .find(|(_, block)| block.offset + HEADER_SIZE == handle.offset())
}

proptest! {
  #[test]
  fn random_sequences_keep_the_chain_intact(ops in prop::collection::vec(op(), 1..120)) {
    let mut heap: BlockHeap = BlockHeap::new();
    let mut live: Vec<(Handle, usize)> = Vec::new();

    for op in ops {
      let before = snapshot(&heap);

      match op {
        Op::Allocate(size) => {
          let expected = before.iter().find(|block| block.is_free && block.size >= size).copied();

          match heap.allocate(size) {
            Ok(handle) => {
              let chosen = expected.expect("allocation succeeded without a fitting block");
              prop_assert_eq!(handle.offset(), chosen.offset + HEADER_SIZE);

              let after = snapshot(&heap);
              let (_, block) = block_of(&after, handle).expect("handle has no block");
              prop_assert!(!block.is_free);
              prop_assert!(block.size >= size);
              prop_assert_eq!(heap.payload(handle).unwrap().len(), block.size);

              live.push((handle, size));
            }
            Err(_) => {
              prop_assert!(expected.is_none());
              prop_assert_eq!(snapshot(&heap), before);
            }
          }
        }
        Op::Release(index) => {
          if live.is_empty() {
            continue;
          }
          let (handle, _) = live.swap_remove(index.index(live.len()));
          let (position, released) = block_of(&before, handle).expect("live handle has no block");
          let successor = before.get(position + 1).copied();

          heap.deallocate(handle).unwrap();

          let after = snapshot(&heap);
          let (_, block) = block_of(&after, handle).expect("released block vanished");
          prop_assert!(block.is_free);

          match successor {
            Some(next) if next.is_free => {
              prop_assert_eq!(after.len(), before.len() - 1);
              prop_assert_eq!(block.size, released.size + HEADER_SIZE + next.size);
            }
            _ => {
              prop_assert_eq!(after.len(), before.len());
              prop_assert_eq!(block.size, released.size);
            }
          }

          prop_assert!(heap.deallocate(handle).is_err());
        }
        Op::ReleaseNone => {
          heap.deallocate(None).unwrap();
          prop_assert_eq!(snapshot(&heap), before);
        }
      }

      assert_tiled(&snapshot(&heap));
    }

    for (handle, size) in &live {
      prop_assert!(heap.payload(*handle).unwrap().len() >= *size);
    }
  }

  #[test]
  fn first_fit_is_deterministic(
    sizes in prop::collection::vec(1usize..120, 1..10),
    released in prop::collection::vec(any::<bool>(), 10),
    request in 0usize..200,
  ) {
    let mut heap: BlockHeap = BlockHeap::new();
    let handles: Vec<_> = sizes.iter().filter_map(|&size| heap.allocate(size).ok()).collect();
    for (handle, release) in handles.iter().zip(released) {
      if release {
        heap.deallocate(*handle).unwrap();
      }
    }

    let mut copy = heap.clone();
    let original = heap.allocate(request).map(|handle| handle.offset());
    let cloned = copy.allocate(request).map(|handle| handle.offset());
    prop_assert_eq!(original, cloned);
    prop_assert_eq!(snapshot(&heap), snapshot(&copy));
  }

  #[test]
  fn allocate_then_release_round_trips(
    prefix in prop::collection::vec(1usize..200, 0..6),
    size in 0usize..400,
  ) {
    let mut heap: BlockHeap = BlockHeap::new();
    for size in prefix {
      let _ = heap.allocate(size);
    }

    if let Ok(handle) = heap.allocate(size) {
      heap.deallocate(handle).unwrap();

      let after = snapshot(&heap);
      let (_, block) = block_of(&after, handle).expect("released block vanished");
      prop_assert!(block.is_free);
      prop_assert!(block.size >= size);
      assert_tiled(&after);
    }
  }
}
