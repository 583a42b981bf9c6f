use blockheap::{BlockHeap, HEADER_SIZE, print_heap};

fn main() {
  // Set RUST_LOG=trace to see every split and merge.
  env_logger::init();

  // A 1024-byte arena. It holds a single free block until the first
  // allocation carves something out of it.
  let mut heap: BlockHeap = BlockHeap::new();

  println!("Header size: {} bytes", HEADER_SIZE);
  println!("Initial heap:");
  print_heap(&heap);

  // --------------------------------------------------------------------
  // 1) Allocate 100 bytes. The only block is split in two.
  // --------------------------------------------------------------------
  let p1 = heap.allocate(100).expect("fresh heap has room for 100 bytes");
  println!("\n[1] After allocating 100 bytes (p1 at {}):", p1.offset());
  print_heap(&heap);

  // --------------------------------------------------------------------
  // 2) Allocate 200 bytes. The free tail is split again.
  // --------------------------------------------------------------------
  let p2 = heap.allocate(200).expect("heap has room for 200 more bytes");
  println!("\n[2] After allocating 200 bytes (p2 at {}):", p2.offset());
  print_heap(&heap);

  // --------------------------------------------------------------------
  // 3) Free p1. Its successor (p2) is in use, so nothing merges.
  // --------------------------------------------------------------------
  heap.deallocate(p1).expect("p1 is live");
  println!("\n[3] After freeing p1:");
  print_heap(&heap);

  // --------------------------------------------------------------------
  // 4) Allocate 50 bytes. First fit picks p1's old block and splits it.
  // --------------------------------------------------------------------
  let p3 = heap.allocate(50).expect("p1's block fits 50 bytes");
  println!("\n[4] After allocating 50 bytes (p3 at {}):", p3.offset());
  print_heap(&heap);

  println!(
    "[4] p3 == p1? {}",
    if p3.offset() == p1.offset() {
      "Yes, it reused the freed block"
    } else {
      "No, it allocated somewhere else"
    }
  );

  // --------------------------------------------------------------------
  // 5) Releasing p1 again is caught instead of corrupting the chain.
  // --------------------------------------------------------------------
  if let Err(err) = heap.deallocate(p1) {
    println!("\n[5] Releasing p1 again: {err}");
  }

  let stats = heap.stats();
  println!(
    "\n[6] {} blocks, {} bytes used, {} bytes free, largest free block {} bytes",
    stats.blocks, stats.used_bytes, stats.free_bytes, stats.largest_free
  );
}
