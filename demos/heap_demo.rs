use std::io::Read;

use implicit_heap::{BufferProvider, Heap};

/// Waits until the user presses ENTER. Useful when you want to pause and
/// inspect the printed heap state before the next step runs.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_alloc(label: &str, n: u32, addr: Option<std::ptr::NonNull<u8>>) {
  match addr {
    Some(p) => println!("[{label}] allocated {n} bytes at {:?}", p.as_ptr()),
    None => println!("[{label}] allocate({n}) failed"),
  }
}

fn main() {
  env_logger::init();

  // A heap backed by an in-process buffer rather than the real program
  // break, so this demo's output doesn't depend on what else the process
  // has already allocated.
  let mut heap = Heap::new(BufferProvider::with_capacity(1 << 20));
  heap.init().expect("heap init should not fail");

  println!("[start] heap initialized over a 1 MiB buffer");
  block_until_enter_pressed();

  // 1) A small allocation.
  let a = heap.allocate(24);
  print_alloc("1", 24, a);
  block_until_enter_pressed();

  // 2) A second allocation right after the first.
  let b = heap.allocate(64);
  print_alloc("2", 64, b);
  block_until_enter_pressed();

  // 3) Free the first block and watch it become reusable.
  heap.free(a);
  println!("\n[3] freed block 1");
  block_until_enter_pressed();

  // 4) A small allocation that should reuse the freed space.
  let c = heap.allocate(16);
  print_alloc("4", 16, c);
  println!(
    "[4] block 4 reused block 1's space? {}",
    if c == a { "yes" } else { "no" }
  );
  block_until_enter_pressed();

  // 5) A large allocation that forces the heap to extend.
  let d = heap.allocate(256 * 1024);
  print_alloc("5", 256 * 1024, d);
  block_until_enter_pressed();

  // 6) Grow block 2 in place.
  let b_grown = heap.reallocate(b, 512);
  print_alloc("6", 512, b_grown);

  // 7) Run the consistency checker before exiting.
  match heap.check() {
    Ok(()) => println!("\n[7] heap consistency check passed"),
    Err(violation) => println!("\n[7] heap consistency check failed: {violation}"),
  }
}
