//! A single process-wide heap, layered on top of [`crate::heap::Heap`].
//!
//! Everything in [`crate::heap`] is an explicit-state instance with no
//! global anywhere in it. This module is a thin convenience wrapper on
//! top of that: one [`Heap<SbrkProvider>`] behind a lazily-initialized
//! static, exposed through the four free functions a malloc-family
//! interface expects.
//!
//! # Thread safety
//!
//! [`Heap`] carries no internal synchronization, and neither does this
//! module. Every function here must be called from a single thread, with
//! no call overlapping another in time. Wrapping these functions in a
//! `Mutex` is the caller's responsibility if multi-threaded use is ever
//! needed.

use core::cell::UnsafeCell;
use core::ptr::NonNull;
use std::sync::OnceLock;

use crate::heap::Heap;
use crate::provider::SbrkProvider;

struct GlobalHeap(UnsafeCell<Heap<SbrkProvider>>);

// SAFETY: access is serialized by the single-threaded-use contract
// documented on every function below; the cell itself adds no
// synchronization of its own.
unsafe impl Sync for GlobalHeap {}

static HEAP: OnceLock<GlobalHeap> = OnceLock::new();

fn cell() -> &'static UnsafeCell<Heap<SbrkProvider>> {
  &HEAP
    .get_or_init(|| GlobalHeap(UnsafeCell::new(Heap::new(SbrkProvider::new()))))
    .0
}

/// Initializes the process-wide heap. Returns `0` on success, `-1` if the
/// heap was already initialized or the kernel refused the initial `sbrk`
/// request.
///
/// # Safety
/// Must be called exactly once, before any other function in this
/// module, and not concurrently with any of them.
pub unsafe fn init() -> i32 {
  let heap = unsafe { &mut *cell().get() };
  match heap.init() {
    Ok(()) => 0,
    Err(err) => {
      log::error!("global::init failed: {err}");
      -1
    }
  }
}

/// Allocates `n` bytes from the process-wide heap. Returns a null pointer
/// on failure, matching `malloc`'s contract.
///
/// # Safety
/// [`init`] must have returned `0` first. Not safe to call concurrently
/// with any other function in this module.
pub unsafe fn allocate(
  n: u32,
) -> *mut u8 {
  let heap = unsafe { &mut *cell().get() };
  heap
    .allocate(n)
    .map_or(core::ptr::null_mut(), NonNull::as_ptr)
}

/// Frees a pointer previously returned by [`allocate`] or [`reallocate`].
/// A silent no-op on null, double-free, or an address outside the heap.
///
/// # Safety
/// [`init`] must have returned `0` first. Not safe to call concurrently
/// with any other function in this module.
pub unsafe fn free(
  p: *mut u8,
) {
  let heap = unsafe { &mut *cell().get() };
  heap.free(NonNull::new(p));
}

/// Resizes the allocation at `p` to `n` bytes, matching `realloc`'s
/// contract: `p = null` behaves as [`allocate`], `n = 0` behaves as
/// [`free`]. Returns a null pointer on failure, leaving `p` untouched.
///
/// # Safety
/// [`init`] must have returned `0` first. Not safe to call concurrently
/// with any other function in this module.
pub unsafe fn reallocate(
  p: *mut u8,
  n: u32,
) -> *mut u8 {
  let heap = unsafe { &mut *cell().get() };
  heap
    .reallocate(NonNull::new(p), n)
    .map_or(core::ptr::null_mut(), NonNull::as_ptr)
}

/// Runs the consistency checker over the process-wide heap.
///
/// # Safety
/// [`init`] must have returned `0` first. Not safe to call concurrently
/// with any other function in this module.
pub unsafe fn check() -> Result<(), crate::check::Violation> {
  let heap = unsafe { &*cell().get() };
  heap.check()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;

  // `sbrk` is process-wide state; serialize the tests that touch the
  // global heap so they don't race each other's program break.
  static LOCK: Mutex<()> = Mutex::new(());

  #[test]
  fn init_allocate_free_roundtrip_on_the_real_heap() {
    let _guard = LOCK.lock().unwrap();
    unsafe {
      // Tolerate a previous test in the same process having already
      // initialized the global heap.
      let _ = init();
      let p = allocate(64);
      assert!(!p.is_null());
      free(p);
      assert!(check().is_ok());
    }
  }
}
