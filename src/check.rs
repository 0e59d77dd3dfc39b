//! The consistency checker: walks the heap end-to-end and verifies
//! prologue correctness, 16-byte base alignment, header/footer equality,
//! absence of two adjacent free blocks, and epilogue correctness.
//!
//! Cheap enough to call from a `debug_assert!` after every operation;
//! never invoked on the hot path in release builds.

use core::fmt;
use core::ptr::NonNull;

use crate::align;
use crate::tag;

/// The first invariant violation found while walking the heap.
///
/// `Display` produces one stable, greppable line per violation, so tests
/// can assert on its text without depending on field layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
  /// The prologue tag isn't `size = 0, alloc = 1`.
  PrologueCorrupt { address: usize, tag: u32 },
  /// A block's base address isn't 16-byte aligned.
  Misaligned { address: usize },
  /// A block's size is odd or smaller than the 2-word minimum.
  BadSize { address: usize, words: usize },
  /// A block's header and footer tags disagree.
  HeaderFooterMismatch {
    address: usize,
    header: u32,
    footer: u32,
  },
  /// Two adjacent blocks are both free; they should have been
  /// coalesced into one.
  AdjacentFreeBlocks { first: usize, second: usize },
  /// The epilogue tag isn't `size = 0, alloc = 1`.
  EpilogueCorrupt { address: usize, tag: u32 },
  /// Traversal did not reach the epilogue within a bound derived from
  /// the heap's byte extent; the heap is corrupt in a way that would
  /// otherwise loop forever.
  DidNotTerminate { steps: usize },
}

impl fmt::Display for Violation {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::PrologueCorrupt { address, tag } => write!(
        f,
        "prologue at {address:#x} has tag {tag:#010x}, expected size=0 alloc=1"
      ),
      Self::Misaligned { address } => {
        write!(f, "block at {address:#x} is not 16-byte aligned")
      }
      Self::BadSize { address, words } => write!(
        f,
        "block at {address:#x} has size {words} words (must be even and >= 2)"
      ),
      Self::HeaderFooterMismatch {
        address,
        header,
        footer,
      } => write!(
        f,
        "block at {address:#x} header={header:#010x} footer={footer:#010x} disagree"
      ),
      Self::AdjacentFreeBlocks { first, second } => write!(
        f,
        "adjacent free blocks at {first:#x} and {second:#x} were not coalesced"
      ),
      Self::EpilogueCorrupt { address, tag } => write!(
        f,
        "epilogue at {address:#x} has tag {tag:#010x}, expected size=0 alloc=1"
      ),
      Self::DidNotTerminate { steps } => write!(
        f,
        "traversal did not reach the epilogue within {steps} steps"
      ),
    }
  }
}

impl core::error::Error for Violation {}

unsafe fn read_raw(
  addr: usize,
) -> u32 {
  unsafe { (addr as *const u32).read() }
}

/// Walks the heap starting at `first` (the base of the first real block)
/// bounded by `high_address` (the current epilogue position), reporting
/// the first violated invariant found, if any.
///
/// # Safety
/// `first` must be the base of a real block written by [`crate::heap`],
/// and every block reachable by repeated `next_base` from it up to
/// `high_address` must be backed by readable memory.
pub unsafe fn walk(
  first: NonNull<u8>,
  high_address: usize,
) -> Result<(), Violation> {
  let prologue_addr = tag::prev_footer(first);
  let prologue_tag = unsafe { read_raw(prologue_addr) };
  if tag::decode(prologue_tag) != (0, true) {
    return Err(Violation::PrologueCorrupt {
      address: prologue_addr,
      tag: prologue_tag,
    });
  }

  // One hop can never be smaller than the 2-word minimum block, so this
  // bounds the number of blocks between `first` and the epilogue.
  let max_steps = (high_address - first.as_ptr() as usize) / (2 * align::WORD_SIZE) + 2;

  let mut cur = first;
  let mut prev: Option<(usize, bool)> = None;
  for _ in 0..max_steps {
    let addr = cur.as_ptr() as usize;
    let words = unsafe { tag::size(cur) };

    if words == 0 {
      let epilogue_tag = unsafe { read_raw(tag::header(cur)) };
      return if tag::decode(epilogue_tag) == (0, true) {
        Ok(())
      } else {
        Err(Violation::EpilogueCorrupt {
          address: tag::header(cur),
          tag: epilogue_tag,
        })
      };
    }

    if !align::is_dword_aligned(addr) {
      return Err(Violation::Misaligned { address: addr });
    }
    if words % 2 != 0 || words < 2 {
      return Err(Violation::BadSize { address: addr, words });
    }

    let header_tag = unsafe { read_raw(tag::header(cur)) };
    let footer_tag = unsafe { read_raw(tag::footer(cur)) };
    if header_tag != footer_tag {
      return Err(Violation::HeaderFooterMismatch {
        address: addr,
        header: header_tag,
        footer: footer_tag,
      });
    }

    let free = !unsafe { tag::is_allocated(cur) };
    if let Some((prev_addr, true)) = prev {
      if free {
        return Err(Violation::AdjacentFreeBlocks {
          first: prev_addr,
          second: addr,
        });
      }
    }
    prev = Some((addr, free));

    cur = unsafe { tag::next_base(cur) };
  }

  Err(Violation::DidNotTerminate { steps: max_steps })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block;
  use crate::provider::{BufferProvider, MemoryProvider};

  fn make_simple_heap() -> (BufferProvider, NonNull<u8>, usize) {
    let mut provider = BufferProvider::with_capacity(256);
    provider.init().unwrap();
    let region = provider.extend(64).unwrap();
    let first = unsafe {
      let prologue_addr = region + 8;
      (prologue_addr as *mut u32).write(tag::encode(0, true));
      let first = NonNull::new_unchecked((region + 16) as *mut u8);
      block::make_block(first, 6, false);
      let epilogue_addr = tag::header(tag::next_base(first));
      (epilogue_addr as *mut u32).write(tag::encode(0, true));
      first
    };
    let high = provider.high_address();
    (provider, first, high)
  }

  #[test]
  fn passes_on_freshly_initialized_heap() {
    let (provider, first, high) = make_simple_heap();
    let result = unsafe { walk(first, high) };
    assert_eq!(result, Ok(()));
    drop(provider);
  }

  #[test]
  fn detects_header_footer_mismatch() {
    let (provider, first, high) = make_simple_heap();
    unsafe {
      // Corrupt just the footer.
      (tag::footer(first) as *mut u32).write(tag::encode(4, true));
    }
    let result = unsafe { walk(first, high) };
    assert!(matches!(result, Err(Violation::HeaderFooterMismatch { .. })));
    drop(provider);
  }

  #[test]
  fn detects_epilogue_corruption() {
    let (provider, first, high) = make_simple_heap();
    unsafe {
      (tag::header(NonNull::new_unchecked(high as *mut u8)) as *mut u32)
        .write(tag::encode(0, false));
    }
    let result = unsafe { walk(first, high) };
    assert!(matches!(result, Err(Violation::EpilogueCorrupt { .. })));
    drop(provider);
  }
}
