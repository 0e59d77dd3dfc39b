//! The memory provider contract: "extend the heap by N bytes" and
//! "report current high-water address", plus one production and one
//! test implementation.
//!
//! The allocator core (`Heap<P>`) never knows which provider it's talking
//! to; it only ever calls through this trait. That keeps the raw-address
//! arithmetic in [`crate::tag`] and [`crate::heap`] honest about where its
//! bytes actually come from, and lets the test suite run against an owned
//! in-memory buffer instead of the real process break.

use crate::error::InitError;

/// A source of monotonically-growing heap memory.
///
/// # Safety
///
/// Implementations must guarantee that every byte in
/// `[base, base + bytes)` returned by a successful [`extend`](Self::extend)
/// call is valid for reads and writes for the remaining lifetime of the
/// provider, and that the region returned by one call never overlaps the
/// region returned by any other call (extension is append-only).
pub unsafe trait MemoryProvider {
  /// Resets provider state prior to first use. Called exactly once, by
  /// [`crate::heap::Heap::init`].
  fn init(
    &mut self,
  ) -> Result<(), InitError>;

  /// Grows the heap region by `bytes` and returns the base address of
  /// the newly appended region.
  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<usize>;

  /// The address one past the last valid byte of the heap region.
  fn high_address(
    &self,
  ) -> usize;
}

/// Production provider: grows the process heap via `sbrk(2)`.
///
/// Extends the data segment the same way a bump allocator would,
/// generalized here behind [`MemoryProvider`] instead of being called
/// directly from allocation logic.
#[derive(Debug, Default)]
pub struct SbrkProvider {
  base: usize,
  high: usize,
}

impl SbrkProvider {
  /// Creates a provider that has not yet requested any memory.
  pub const fn new() -> Self {
    Self { base: 0, high: 0 }
  }
}

// SAFETY: `sbrk` only ever grows the process break, and every byte between
// two successive breaks is mapped and exclusively owned by this process,
// so the regions handed out are valid and non-overlapping as required.
unsafe impl MemoryProvider for SbrkProvider {
  fn init(
    &mut self,
  ) -> Result<(), InitError> {
    // SAFETY: `sbrk(0)` only reads the current break, never mutates.
    let current = unsafe { libc::sbrk(0) };
    if current == usize::MAX as *mut libc::c_void {
      return Err(InitError::ProviderRefused);
    }
    self.base = current as usize;
    self.high = current as usize;
    Ok(())
  }

  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<usize> {
    // SAFETY: `bytes` is attacker-controlled only in the sense that a
    // caller chose it; `sbrk` validates the request itself and reports
    // failure via the `(void*)-1` sentinel, which we check below.
    let old_break = unsafe { libc::sbrk(bytes as libc::intptr_t) };
    if old_break == usize::MAX as *mut libc::c_void {
      return None;
    }
    let base = old_break as usize;
    self.high = base + bytes;
    Some(base)
  }

  fn high_address(
    &self,
  ) -> usize {
    self.high
  }
}

/// Deterministic test provider backed by a single 16-byte-aligned heap
/// allocation.
///
/// Real `sbrk` shares process-wide state with the allocator under test
/// (and with the test harness's own allocations), which makes failure
/// injection and parallel tests unreliable. `BufferProvider` hands out
/// offsets into an owned buffer instead, so extension, exhaustion, and
/// repeated `init` can all be exercised deterministically. The buffer is
/// allocated with explicit 16-byte alignment rather than relying on
/// `Vec<u8>`'s incidental alignment, since the allocator core's `init`
/// debug-asserts that every provider hands out dword-aligned regions.
pub struct BufferProvider {
  storage: std::ptr::NonNull<u8>,
  layout: std::alloc::Layout,
  capacity: usize,
  high_offset: usize,
}

impl BufferProvider {
  /// Creates a provider backed by a buffer that can grow up to
  /// `capacity` bytes before `extend` starts failing.
  pub fn with_capacity(
    capacity: usize,
  ) -> Self {
    let layout = std::alloc::Layout::from_size_align(capacity.max(1), 16)
      .expect("capacity too large to allocate");
    // SAFETY: `layout` has non-zero size.
    let raw = unsafe { std::alloc::alloc_zeroed(layout) };
    let storage = std::ptr::NonNull::new(raw).expect("global allocator returned null");
    Self {
      storage,
      layout,
      capacity,
      high_offset: 0,
    }
  }
}

impl Drop for BufferProvider {
  fn drop(
    &mut self,
  ) {
    // SAFETY: `storage` was allocated with `layout` in `with_capacity`
    // and is never freed anywhere else.
    unsafe { std::alloc::dealloc(self.storage.as_ptr(), self.layout) };
  }
}

// SAFETY: `storage` is a single heap allocation that outlives every
// pointer handed out (the provider owns it and never reallocates it,
// since it's pre-sized to `capacity` in `with_capacity`), and each
// `extend` call only ever returns the next disjoint prefix of unused
// bytes.
unsafe impl MemoryProvider for BufferProvider {
  fn init(
    &mut self,
  ) -> Result<(), InitError> {
    self.high_offset = 0;
    Ok(())
  }

  fn extend(
    &mut self,
    bytes: usize,
  ) -> Option<usize> {
    let new_offset = self.high_offset.checked_add(bytes)?;
    if new_offset > self.capacity {
      return None;
    }
    let base = self.storage.as_ptr() as usize + self.high_offset;
    self.high_offset = new_offset;
    Some(base)
  }

  fn high_address(
    &self,
  ) -> usize {
    self.storage.as_ptr() as usize + self.high_offset
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn buffer_provider_extends_append_only() {
    let mut provider = BufferProvider::with_capacity(64);
    provider.init().unwrap();
    let a = provider.extend(16).unwrap();
    let b = provider.extend(16).unwrap();
    assert_eq!(b, a + 16);
    assert_eq!(provider.high_address(), a + 32);
  }

  #[test]
  fn buffer_provider_reports_out_of_memory() {
    let mut provider = BufferProvider::with_capacity(16);
    provider.init().unwrap();
    assert!(provider.extend(8).is_some());
    let high_before = provider.high_address();
    assert!(provider.extend(16).is_none());
    // The failed request must not have moved the high-water mark.
    assert_eq!(provider.high_address(), high_before);
    // The remaining 8 bytes are still available.
    assert!(provider.extend(8).is_some());
  }
}
