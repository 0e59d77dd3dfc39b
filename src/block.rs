//! Block constructor: imprints a header/footer pair describing a block
//! at a given base, with a given word-size and allocation state.

use core::ptr::NonNull;

use crate::tag;

/// Writes a header/footer pair of `words` words at `p`, marked
/// `allocated`.
///
/// Precondition: `words` is even and `>= 2`, and the byte range
/// `[header(p), p + words * 8 - 4)` lies within the heap region. Neither
/// is checked here; callers (placement, coalescing, extension) are
/// responsible for a consistent layout.
///
/// # Safety
/// The precondition above must hold.
pub unsafe fn make_block(
  p: NonNull<u8>,
  words: usize,
  allocated: bool,
) {
  debug_assert_eq!(words % 2, 0, "block size must be even");
  debug_assert!(words >= 2, "block size must be at least 2 words");

  let tag = tag::encode(words, allocated);
  unsafe {
    tag::write_header(p, tag);
    tag::write_footer_for_size(p, words, tag);
  }
}

/// Flips the allocation bit of the block based at `p` in both header and
/// footer, preserving size. Used only by `free`.
///
/// # Safety
/// `p` must be a real block's base with consistent header/footer tags.
pub unsafe fn toggle_block(
  p: NonNull<u8>,
) {
  let words = unsafe { tag::size(p) };
  let allocated = unsafe { tag::is_allocated(p) };
  let flipped = tag::encode(words, !allocated);
  unsafe {
    tag::write_header(p, flipped);
    tag::write_footer_for_size(p, words, flipped);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::provider::{BufferProvider, MemoryProvider};

  fn base_in(
    provider: &mut BufferProvider,
    offset: usize,
  ) -> NonNull<u8> {
    // Leave 4 bytes at the front of the buffer for the header, as a
    // real heap region's prologue word would.
    let start = provider.extend(0).unwrap_or(0);
    unsafe { NonNull::new_unchecked((start + 4 + offset) as *mut u8) }
  }

  #[test]
  fn make_block_writes_matching_header_and_footer() {
    let mut provider = BufferProvider::with_capacity(64);
    provider.init().unwrap();
    let p = base_in(&mut provider, 0);

    unsafe {
      make_block(p, 4, true);
      assert_eq!(tag::size(p), 4);
      assert!(tag::is_allocated(p));
      let footer_tag = (tag::footer(p) as *const u32).read();
      assert_eq!(tag::decode(footer_tag), (4, true));
    }
  }

  #[test]
  fn toggle_block_flips_both_tags_and_keeps_size() {
    let mut provider = BufferProvider::with_capacity(64);
    provider.init().unwrap();
    let p = base_in(&mut provider, 0);

    unsafe {
      make_block(p, 6, false);
      toggle_block(p);
      assert!(tag::is_allocated(p));
      assert_eq!(tag::size(p), 6);

      let footer_tag = (tag::footer(p) as *const u32).read();
      assert_eq!(tag::decode(footer_tag), (6, true));

      toggle_block(p);
      assert!(!tag::is_allocated(p));
      let footer_tag = (tag::footer(p) as *const u32).read();
      assert_eq!(tag::decode(footer_tag), (6, false));
    }
  }
}
