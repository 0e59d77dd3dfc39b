//! Public operations: `init`, `allocate`, `free`, `reallocate`, wired on
//! top of the topology, placement, and coalescing logic they share.
//!
//! # Overview
//!
//! [`Heap<P>`] owns one contiguous, monotonically growing region obtained
//! from a [`MemoryProvider`] and lays an **implicit free list** over it:
//! every block, free or allocated, carries a boundary tag at both ends
//! recording its size and allocation bit. There is no separate free-block
//! index; a free block is found by walking the blocks in address order.
//!
//! ```text
//!   Heap region after init():
//!
//!   ┌──────┬────────────────────────────────────────┬──────┐
//!   │ Prlg │         one free block (6 words)        │ Epil │
//!   │ sz=0 │ Hdr │          payload           │ Ftr   │ sz=0 │
//!   │ al=1 │                                          │ al=1 │
//!   └──────┴────────────────────────────────────────┴──────┘
//!          ▲
//!          └── `first`, the address this module hands to callers
//! ```
//!
//! [`Heap<P>`] is an explicit-state instance: nothing here is global.
//! The single-instance convenience wrapper lives in [`crate::global`],
//! built entirely out of this type.
//!
//! # Fields
//!
//! * `provider` - the [`MemoryProvider`] this heap draws its bytes from.
//! * `first` - base address of the first real block, or `None` before
//!   [`Heap::init`] has run.
//!
//! # Thread safety
//!
//! No method here takes a lock or synchronizes with anything. Every
//! caller must serialize its own access; see [`crate::global`] for the
//! single-threaded-use contract this is packaged under.

use core::ptr::NonNull;

use crate::align::{self, WORD_SIZE};
use crate::block;
use crate::check::{self, Violation};
use crate::error::{InitError, InvalidFreeError, OutOfMemoryError};
use crate::provider::MemoryProvider;
use crate::tag;

/// Words requested from the provider for the initial heap region: two
/// words of padding/prologue, six for the first real free block.
const INIT_REGION_WORDS: usize = 8;
/// Word size of the single free block an empty heap starts with.
const INIT_BLOCK_WORDS: usize = 6;

/// An implicit-free-list heap over a region supplied by `P`.
///
/// Every operation here is total and synchronous; none may be called
/// re-entrantly, and the type carries no internal synchronization.
/// Callers are responsible for single-threaded use.
pub struct Heap<P: MemoryProvider> {
  provider: P,
  /// Base address of the first real block. `None` before `init`.
  first: Option<NonNull<u8>>,
}

impl<P: MemoryProvider> Heap<P> {
  /// Creates a heap over `provider`. The heap is unusable until
  /// [`Heap::init`] succeeds.
  ///
  /// # Arguments
  ///
  /// * `provider` - the memory source this heap will request bytes from.
  ///
  /// # Returns
  ///
  /// An uninitialized `Heap`; every method other than `init` and
  /// `is_initialized` is a no-op or returns a failure value until `init`
  /// has been called successfully.
  pub const fn new(
    provider: P,
  ) -> Self {
    Self {
      provider,
      first: None,
    }
  }

  /// Whether [`Heap::init`] has succeeded on this instance.
  ///
  /// # Returns
  ///
  /// `true` once a prologue, first block, and epilogue have been laid
  /// down; `false` beforehand.
  pub fn is_initialized(
    &self,
  ) -> bool {
    self.first.is_some()
  }

  /// Lays out the prologue, the heap's first free block, and the
  /// epilogue in a freshly acquired 8-word region.
  ///
  /// # Returns
  ///
  /// `Ok(())` once the sentinels and initial free block are written.
  ///
  /// # Errors
  ///
  /// Returns [`InitError::AlreadyInitialized`] if called more than once
  /// on the same instance, and [`InitError::ProviderRefused`] if the
  /// provider refuses the initial 8-word request.
  ///
  /// # Layout written
  ///
  /// ```text
  ///   region:  ┌──────┬──────┬──────────────────────────┬──────┐
  ///            │ pad  │ Prlg │   first block (6 words)   │ Epil │
  ///            │1 word│sz=0  │ Hdr│  payload  │Ftr         │sz=0 │
  ///            │      │al=1  │                            │al=1 │
  ///            └──────┴──────┴──────────────────────────┴──────┘
  ///   8 words total: 1 pad, 1 prologue tag (shares the word with the
  ///   first block's header), 6 words of free block, 1 epilogue tag.
  /// ```
  pub fn init(
    &mut self,
  ) -> Result<(), InitError> {
    if self.first.is_some() {
      return Err(InitError::AlreadyInitialized);
    }
    self.provider.init()?;
    let region = self
      .provider
      .extend(INIT_REGION_WORDS * WORD_SIZE)
      .ok_or(InitError::ProviderRefused)?;
    debug_assert!(
      align::is_dword_aligned(region),
      "memory provider must hand out 16-byte aligned regions"
    );

    // SAFETY: `region` is a fresh 8-word region from the provider;
    // `first` sits a word and a half into it (prologue tag, then the
    // first block's own header), and the whole 8 words are reserved
    // for exactly prologue + one 6-word block + epilogue.
    let first = unsafe {
      let prologue_addr = region + WORD_SIZE;
      tag::write_raw(prologue_addr, tag::encode(0, true));

      let first = NonNull::new_unchecked((region + 2 * WORD_SIZE) as *mut u8);
      block::make_block(first, INIT_BLOCK_WORDS, false);

      let epilogue_addr = tag::header(tag::next_base(first));
      tag::write_raw(epilogue_addr, tag::encode(0, true));
      first
    };

    self.first = Some(first);
    log::debug!("heap initialized with a {INIT_BLOCK_WORDS}-word free block at {region:#x}");
    Ok(())
  }

  /// Current epilogue, treated as a zero-size allocated block whose
  /// base always coincides with the provider's current high-water
  /// mark: the epilogue sits exactly at the end of the heap region,
  /// so no separate bookkeeping is needed.
  ///
  /// # Returns
  ///
  /// The epilogue's base address, read fresh from the provider on
  /// every call rather than cached.
  fn epilogue(
    &self,
  ) -> NonNull<u8> {
    let addr = self.provider.high_address();
    // SAFETY: `addr` is the provider's high-water mark, which is
    // always a real, non-null address once `init` has run.
    unsafe { NonNull::new_unchecked(addr as *mut u8) }
  }

  /// First-fit search for a free block of at least `words` words,
  /// starting at the first real block.
  ///
  /// # Arguments
  ///
  /// * `words` - minimum acceptable block size, in words.
  ///
  /// # Returns
  ///
  /// `Some(base)` of the first free block encountered whose size is
  /// `>= words`; `None` if the walk reaches the epilogue without
  /// finding one.
  ///
  /// # Search process
  ///
  /// ```text
  ///   first ──► [alloc 4] ──► [free 2] ──► [free 6] ──► epilogue
  ///                               │            │
  ///                         too small     size >= words
  ///                         (if words=4)  → return this base
  /// ```
  fn find_fit(
    &self,
    words: usize,
  ) -> Option<NonNull<u8>> {
    let mut cur = self.first?;
    loop {
      // SAFETY: `cur` is either the first block or reached from it
      // by `next_base`, which stays within the heap until size 0.
      let size = unsafe { tag::size(cur) };
      if size == 0 {
        return None; // reached the epilogue
      }
      if size >= words && !unsafe { tag::is_allocated(cur) } {
        return Some(cur);
      }
      cur = unsafe { tag::next_base(cur) };
    }
  }

  /// Places an allocation of `words` words at a free block known to be
  /// at least that large, splitting off a free residual if the block
  /// is strictly larger.
  ///
  /// # Arguments
  ///
  /// * `base` - base of a free block with `size(base) >= words`.
  /// * `words` - the word count to carve out as the allocated block.
  ///
  /// # Split behavior
  ///
  /// ```text
  ///   Exact fit (size == words):
  ///   [free, size] ──toggle──► [allocated, size]
  ///
  ///   Strictly larger (size > words):
  ///   [free, size] ──split──► [allocated, words][free, size-words]
  ///                             ▲                 ▲
  ///                          `base`         `base + words*8`
  /// ```
  fn place(
    &mut self,
    base: NonNull<u8>,
    words: usize,
  ) {
    // SAFETY: `base` names a free block of size >= `words`, as
    // established by the caller (`find_fit` or `extend`).
    let size = unsafe { tag::size(base) };
    if size == words {
      unsafe { block::toggle_block(base) };
    } else {
      unsafe {
        block::make_block(base, words, true);
        let residual = tag::next_base(base);
        block::make_block(residual, size - words, false);
      }
    }
  }

  /// Grows the heap by at least `words` words to satisfy a failed
  /// first-fit search, left-coalescing with a trailing free block
  /// when one exists.
  ///
  /// # Arguments
  ///
  /// * `words` - word count the caller still needs a free block of.
  ///
  /// # Returns
  ///
  /// The base of the resulting free block: either the grown tail free
  /// block, or a freshly appended one.
  ///
  /// # Errors
  ///
  /// Returns [`OutOfMemoryError`] if the provider refuses the extension.
  /// The heap is left unchanged in that case.
  ///
  /// # Left-coalesce case
  ///
  /// ```text
  ///   Before:  ... [free, f words] | epilogue
  ///   extend requests only (words - f) more words from the provider,
  ///   then rewrites the tail block and epilogue in place:
  ///   After:   ... [free, f + (words - f) = words words] | epilogue
  /// ```
  ///
  /// # Fresh-block case
  ///
  /// ```text
  ///   Before:  ... [allocated] | epilogue
  ///   extend requests `words` new words from the provider, which land
  ///   starting exactly at the old epilogue's address:
  ///   After:   ... [allocated] [free, words words] | epilogue
  /// ```
  fn extend(
    &mut self,
    words: usize,
  ) -> Result<NonNull<u8>, OutOfMemoryError> {
    let epilogue = self.epilogue();
    // SAFETY: the heap always has at least one real block after
    // `init`, so the epilogue always has a real predecessor.
    let tail_is_free = !unsafe { tag::prev_is_allocated(epilogue) };

    if tail_is_free {
      // SAFETY: as above.
      let tail_words = unsafe { tag::prev_size(epilogue) };
      let tail_base = unsafe { tag::prev_base(epilogue) };
      let extra_words = words.saturating_sub(tail_words);
      if extra_words == 0 {
        return Ok(tail_base);
      }
      self
        .provider
        .extend(extra_words * WORD_SIZE)
        .ok_or(OutOfMemoryError {
          requested_words: extra_words,
        })?;
      let total_words = tail_words + extra_words;
      unsafe {
        block::make_block(tail_base, total_words, false);
        let new_epilogue = self.epilogue();
        tag::write_raw(tag::header(new_epilogue), tag::encode(0, true));
      }
      log::trace!(
        "extended heap, left-coalescing tail free block: {tail_words} -> {total_words} words"
      );
      Ok(tail_base)
    } else {
      let region = self
        .provider
        .extend(words * WORD_SIZE)
        .ok_or(OutOfMemoryError {
          requested_words: words,
        })?;
      // SAFETY: `region` is fresh, provider-guaranteed-aligned
      // memory; its header overwrites the old epilogue tag, which
      // lived in already-granted memory one word before it.
      let new_base = unsafe {
        let base = NonNull::new_unchecked(region as *mut u8);
        block::make_block(base, words, false);
        let new_epilogue = self.epilogue();
        tag::write_raw(tag::header(new_epilogue), tag::encode(0, true));
        base
      };
      log::debug!("extended heap by {words} words at {region:#x}");
      Ok(new_base)
    }
  }

  /// Allocates `n` bytes.
  ///
  /// # Arguments
  ///
  /// * `n` - requested payload size in bytes. `0` short-circuits to
  ///   `None` without consulting the heap.
  ///
  /// # Returns
  ///
  /// `Some(base)` pointing at a payload of at least `n` bytes, or
  /// `None` on `n == 0`, an uninitialized heap, or out-of-memory.
  ///
  /// # Allocation process
  ///
  /// ```text
  ///   1. words = block_words_for_payload(n)
  ///   2. find_fit(words): walk the heap for a free block >= words
  ///        found   ──► place(base, words)            ──► return base
  ///        not found ──► extend(words)
  ///                        Ok(base)  ──► place(base, words) ──► return base
  ///                        Err(_)    ──► return None
  /// ```
  pub fn allocate(
    &mut self,
    n: u32,
  ) -> Option<NonNull<u8>> {
    if n == 0 || self.first.is_none() {
      return None;
    }
    let words = align::block_words_for_payload(n as usize);

    let base = match self.find_fit(words) {
      Some(base) => base,
      None => match self.extend(words) {
        Ok(base) => base,
        Err(err) => {
          log::warn!("allocate({n}): {err}");
          return None;
        }
      },
    };
    self.place(base, words);
    self.debug_check("allocate");
    Some(base)
  }

  /// Whether `p` falls within the heap's current payload-addressable
  /// range and is suitably aligned, backing the
  /// `InvalidFreeError::OutOfRange` case in the error taxonomy.
  ///
  /// # Arguments
  ///
  /// * `p` - candidate payload base address.
  ///
  /// # Returns
  ///
  /// `true` if `p` is 16-byte aligned and lies between the first real
  /// block and the current high-water mark.
  fn in_range(
    &self,
    p: NonNull<u8>,
  ) -> bool {
    let Some(first) = self.first else { return false };
    let addr = p.as_ptr() as usize;
    align::is_dword_aligned(addr)
      && addr >= first.as_ptr() as usize
      && addr < self.provider.high_address()
  }

  /// Frees the block at `p`.
  ///
  /// # Arguments
  ///
  /// * `p` - the address to free, or `None`.
  ///
  /// # Returns
  ///
  /// Nothing. A silent no-op on null, double-free, out-of-range, or
  /// uninitialized-heap, matching `free`'s total contract.
  ///
  /// # Errors
  ///
  /// None are returned; rejected calls are logged at `warn!` via
  /// [`InvalidFreeError`]'s `Display` impl instead.
  pub fn free(
    &mut self,
    p: Option<NonNull<u8>>,
  ) {
    let Some(p) = p else {
      log::warn!("{}", InvalidFreeError::NullPointer);
      return;
    };
    if self.first.is_none() {
      log::warn!("{}", InvalidFreeError::Uninitialized);
      return;
    }
    if !self.in_range(p) {
      log::warn!("{}", InvalidFreeError::OutOfRange);
      return;
    }
    // SAFETY: `p` passed the range check above, so it names a real
    // block's header within the heap.
    if !unsafe { tag::is_allocated(p) } {
      log::warn!("{}", InvalidFreeError::AlreadyFree);
      return;
    }
    unsafe {
      block::toggle_block(p);
      self.coalesce(p);
    }
    self.debug_check("free");
  }

  /// Merges a just-freed block at `p` with any free neighbors, covering
  /// all four combinations of whether the previous and next blocks are
  /// themselves free.
  ///
  /// # Arguments
  ///
  /// * `p` - base of the block that was just toggled free.
  ///
  /// # Safety
  /// `p` must be the base of a real, currently-free block.
  ///
  /// # Cases
  ///
  /// ```text
  ///   prev alloc, next alloc:  [p] stays as-is
  ///   prev alloc, next free:   [p][next]       -> [p + next]
  ///   prev free,  next alloc:  [prev][p]        -> [prev + p]
  ///   prev free,  next free:   [prev][p][next] -> [prev + p + next]
  /// ```
  unsafe fn coalesce(
    &mut self,
    p: NonNull<u8>,
  ) {
    let size = unsafe { tag::size(p) };
    let prev_allocated = p == self.first.unwrap() || unsafe { tag::prev_is_allocated(p) };
    let next = unsafe { tag::next_base(p) };
    let next_allocated = unsafe { tag::is_allocated(next) };

    match (prev_allocated, next_allocated) {
      (true, true) => {}
      (true, false) => {
        let next_size = unsafe { tag::size(next) };
        unsafe { block::make_block(p, size + next_size, false) };
      }
      (false, true) => {
        let prev_base = unsafe { tag::prev_base(p) };
        let prev_size = unsafe { tag::size(prev_base) };
        unsafe { block::make_block(prev_base, prev_size + size, false) };
      }
      (false, false) => {
        let prev_base = unsafe { tag::prev_base(p) };
        let prev_size = unsafe { tag::size(prev_base) };
        let next_size = unsafe { tag::size(next) };
        unsafe { block::make_block(prev_base, prev_size + size + next_size, false) };
      }
    }
  }

  /// Resizes the allocation at `p` to `n` bytes.
  ///
  /// # Arguments
  ///
  /// * `p` - the existing allocation, or `None`.
  /// * `n` - the new requested payload size in bytes.
  ///
  /// # Returns
  ///
  /// `Some(address)` of a payload of at least `n` bytes (possibly `p`
  /// itself), or `None` if `n == 0` or the fallback allocation fails.
  ///
  /// # Errors
  ///
  /// None are returned directly; an out-of-memory fallback allocation
  /// leaves the original block at `p` intact and returns `None`.
  ///
  /// # Decision table
  ///
  /// ```text
  ///   p == None            -> allocate(n)
  ///   n == 0                -> free(p); return None
  ///   words == old_words    -> return p unchanged
  ///   words <  old_words    -> shrink in place, free the tail
  ///   words >  old_words
  ///     next block free and
  ///     big enough together -> grow in place, absorb/split next
  ///     otherwise            -> allocate(n), copy, free(p)
  /// ```
  pub fn reallocate(
    &mut self,
    p: Option<NonNull<u8>>,
    n: u32,
  ) -> Option<NonNull<u8>> {
    let Some(p) = p else {
      return self.allocate(n);
    };
    if n == 0 {
      self.free(Some(p));
      return None;
    }

    let words = align::block_words_for_payload(n as usize);
    // SAFETY: `p` is assumed to be a live allocation returned by this
    // same heap.
    let old_words = unsafe { tag::size(p) };

    if words == old_words {
      return Some(p);
    }

    if words < old_words {
      unsafe {
        block::make_block(p, words, true);
        let tail = tag::next_base(p);
        block::make_block(tail, old_words - words, false);
      }
      self.debug_check("reallocate(shrink)");
      return Some(p);
    }

    // Growing: try to absorb a free next neighbor in place first.
    let next = unsafe { tag::next_base(p) };
    if !unsafe { tag::is_allocated(next) } {
      let next_words = unsafe { tag::size(next) };
      if old_words + next_words >= words {
        let total = old_words + next_words;
        let residue = total - words;
        unsafe {
          block::make_block(p, words, true);
          if residue > 0 {
            let tail = tag::next_base(p);
            block::make_block(tail, residue, false);
          }
        }
        self.debug_check("reallocate(grow in place)");
        return Some(p);
      }
    }

    // Fall back to allocate + copy + free. The old block is left
    // intact if the new allocation fails.
    let new_p = self.allocate(n)?;
    let copy_bytes = core::cmp::min(n as usize, old_words * 8 - 8);
    // SAFETY: `p` and `new_p` are distinct, non-overlapping, live
    // allocations each with at least `copy_bytes` bytes of payload.
    unsafe {
      core::ptr::copy_nonoverlapping(p.as_ptr(), new_p.as_ptr(), copy_bytes);
    }
    self.free(Some(p));
    Some(new_p)
  }

  /// Runs the consistency checker over the current heap.
  ///
  /// # Returns
  ///
  /// `Ok(())` if every invariant holds (or the heap is uninitialized,
  /// which trivially has none to violate); otherwise the first
  /// [`Violation`] found while walking the heap.
  pub fn check(
    &self,
  ) -> Result<(), Violation> {
    let Some(first) = self.first else {
      return Ok(()); // an uninitialized heap trivially has no violations
    };
    // SAFETY: every block from `first` to the epilogue was written
    // by this module's own operations.
    unsafe { check::walk(first, self.provider.high_address()) }
  }

  #[cfg(debug_assertions)]
  fn debug_check(
    &self,
    op: &str,
  ) {
    if let Err(violation) = self.check() {
      log::error!("heap corruption detected after {op}: {violation}");
      debug_assert!(false, "heap corruption detected after {op}: {violation}");
    }
  }

  #[cfg(not(debug_assertions))]
  fn debug_check(
    &self,
    _op: &str,
  ) {
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::provider::BufferProvider;

  fn heap() -> Heap<BufferProvider> {
    let mut h = Heap::new(BufferProvider::with_capacity(1 << 20));
    h.init().unwrap();
    h
  }

  #[test]
  fn init_produces_a_single_free_block() {
    let h = heap();
    assert!(h.check().is_ok());
  }

  #[test]
  fn single_alloc_and_free_restores_initial_state() {
    let mut h = heap();
    let p = h.allocate(8).unwrap();
    unsafe { assert_eq!(tag::size(p), 2) };
    h.free(Some(p));
    assert!(h.check().is_ok());

    // Heap returns to one big free block covering the initial region.
    unsafe {
      assert!(!tag::is_allocated(h.first.unwrap()));
      assert_eq!(tag::size(h.first.unwrap()), INIT_BLOCK_WORDS);
    }
  }

  #[test]
  fn allocate_zero_returns_null() {
    let mut h = heap();
    assert!(h.allocate(0).is_none());
  }

  #[test]
  fn free_null_is_noop() {
    let mut h = heap();
    h.free(None);
    assert!(h.check().is_ok());
  }

  #[test]
  fn free_before_init_is_noop() {
    let mut h = Heap::new(BufferProvider::with_capacity(1024));
    let fake = NonNull::new(0x1000 as *mut u8).unwrap();
    h.free(Some(fake)); // must not panic
  }

  #[test]
  fn double_free_is_silently_ignored() {
    let mut h = heap();
    let p = h.allocate(8).unwrap();
    h.free(Some(p));
    h.free(Some(p)); // second free: silent no-op
    assert!(h.check().is_ok());
  }

  #[test]
  fn first_fit_reuses_a_freed_block_with_residual() {
    let mut h = heap();
    let a = h.allocate(2040).unwrap();
    let b = h.allocate(2040).unwrap();
    h.free(Some(b));
    let c = h.allocate(48).unwrap();

    // c must land inside the region vacated by b (first-fit).
    let b_addr = b.as_ptr() as usize;
    let c_addr = c.as_ptr() as usize;
    assert!(c_addr >= b_addr);
    assert!(h.check().is_ok());

    h.free(Some(a));
    h.free(Some(c));
  }

  #[test]
  fn allocation_triggers_heap_extension() {
    let mut h = heap();
    let a = h.allocate(4072).unwrap();
    let b = h.allocate(4072).unwrap();
    assert_ne!(a, b);
    unsafe {
      assert_eq!(tag::size(a) * 8, b.as_ptr() as usize - a.as_ptr() as usize);
      assert!(tag::is_allocated(a));
      assert!(tag::is_allocated(b));
    }
    assert!(h.check().is_ok());
  }

  #[test]
  fn extension_left_coalesces_with_trailing_free_block() {
    let mut h = heap();
    let first_base = h.first.unwrap();
    assert!(unsafe { !tag::is_allocated(first_base) });

    let p = h.allocate(100_000).unwrap();
    // The extension must have grown the initial free block in place
    // rather than leaving it as dead space before a fresh block.
    assert_eq!(p, first_base);
    assert!(h.check().is_ok());
  }

  #[test]
  fn three_way_coalesce_merges_a_b_c_into_one_block() {
    let mut h = heap();
    let a = h.allocate(64).unwrap();
    let b = h.allocate(64).unwrap();
    let c = h.allocate(64).unwrap();

    h.free(Some(a));
    h.free(Some(c));
    h.free(Some(b));

    assert!(h.check().is_ok());
    unsafe {
      assert!(!tag::is_allocated(a));
      let a_words = tag::size(a);
      let b_words = tag::size(b);
      let c_words = tag::size(c);
      // After the three-way merge, walking from `a` by its own
      // size must land exactly on the block after `c`.
      let merged_next = tag::next_base(a);
      assert_eq!(
        merged_next.as_ptr() as usize,
        c.as_ptr() as usize + c_words * 8
      );
      let _ = b_words;
    }
  }

  #[test]
  fn reallocate_shrink_in_place_keeps_the_same_address() {
    let mut h = heap();
    let p = h.allocate(2040).unwrap();
    let q = h.reallocate(Some(p), 16).unwrap();
    assert_eq!(p, q);
    unsafe {
      let next = tag::next_base(q);
      assert!(!tag::is_allocated(next));
      assert!(tag::size(next) >= 2);
    }
    assert!(h.check().is_ok());
  }

  #[test]
  fn reallocate_grows_in_place_into_free_neighbor() {
    let mut h = heap();
    let p = h.allocate(16).unwrap();
    let tail = h.allocate(16).unwrap();
    h.free(Some(tail));

    let q = h.reallocate(Some(p), 40).unwrap();
    assert_eq!(p, q);
    assert!(h.check().is_ok());
  }

  #[test]
  fn reallocate_falls_back_to_move_when_no_room() {
    let mut h = heap();
    let p = h.allocate(16).unwrap();
    unsafe {
      p.as_ptr().write_bytes(0xAB, 16);
    }
    let _blocker = h.allocate(16).unwrap(); // keeps the next block allocated

    let q = h.reallocate(Some(p), 4096).unwrap();
    assert_ne!(p, q);
    unsafe {
      let bytes = core::slice::from_raw_parts(q.as_ptr(), 16);
      assert_eq!(bytes, &[0xAB; 16]);
    }
    assert!(h.check().is_ok());
  }

  #[test]
  fn reallocate_null_behaves_as_allocate() {
    let mut h = heap();
    let p = h.reallocate(None, 32).unwrap();
    unsafe { assert!(tag::is_allocated(p)) };
  }

  #[test]
  fn reallocate_zero_behaves_as_free() {
    let mut h = heap();
    let p = h.allocate(32).unwrap();
    let result = h.reallocate(Some(p), 0);
    assert!(result.is_none());
    assert!(h.check().is_ok());
  }

  #[test]
  fn exact_fit_allocation_leaves_no_residual() {
    let mut h = heap();
    // The initial free block is exactly INIT_BLOCK_WORDS words; ask
    // for a payload that maps to precisely that many words.
    let payload = INIT_BLOCK_WORDS * 8 - 8;
    let p = h.allocate(payload as u32).unwrap();
    unsafe {
      assert_eq!(tag::size(p), INIT_BLOCK_WORDS);
      // No split happened, so walking forward must reach the
      // epilogue directly.
      assert_eq!(tag::size(tag::next_base(p)), 0);
    }
  }

  #[test]
  fn out_of_memory_returns_null_and_leaves_heap_intact() {
    let mut h = Heap::new(BufferProvider::with_capacity(64));
    h.init().unwrap();
    // The backing buffer is already fully consumed by `init`.
    assert!(h.allocate(1_000_000).is_none());
    assert!(h.check().is_ok());
  }

  #[test]
  fn double_init_is_rejected() {
    let mut h = heap();
    assert_eq!(h.init(), Err(InitError::AlreadyInitialized));
  }
}
