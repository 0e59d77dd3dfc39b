//! The error taxonomy the allocator core recognizes.
//!
//! None of these are thrown or unwound. They're plain return values that
//! the public API (see [`crate::global`]) reduces further to the sentinel
//! values a malloc-family interface expects: a null pointer, `-1`, or a
//! silent no-op.

use core::fmt;

/// The memory provider refused to supply the initial heap region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
  /// The provider's `extend` call failed.
  ProviderRefused,
  /// `init` was called a second time on an already-initialized heap.
  AlreadyInitialized,
}

impl fmt::Display for InitError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::ProviderRefused => write!(f, "memory provider refused the initial heap request"),
      Self::AlreadyInitialized => write!(f, "heap is already initialized"),
    }
  }
}

impl core::error::Error for InitError {}

/// The memory provider refused to grow the heap to satisfy an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfMemoryError {
  /// Word count that was requested from the provider.
  pub requested_words: usize,
}

impl fmt::Display for OutOfMemoryError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "memory provider could not extend the heap by {} words",
      self.requested_words
    )
  }
}

impl core::error::Error for OutOfMemoryError {}

/// Why a call to `free` was rejected as invalid.
///
/// Never surfaced to a caller directly (`free` is total and silently
/// no-ops on any of these), but logged, and usable by callers that want
/// a debug assertion in addition to the silent-no-op contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidFreeError {
  /// `free(null)` was called.
  NullPointer,
  /// The address does not fall within the current heap region.
  OutOfRange,
  /// The block at the address is already free (double free).
  AlreadyFree,
  /// `free` was called before `init`.
  Uninitialized,
}

impl fmt::Display for InvalidFreeError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      Self::NullPointer => write!(f, "free called with a null pointer"),
      Self::OutOfRange => write!(f, "free called with an address outside the heap"),
      Self::AlreadyFree => write!(f, "double free"),
      Self::Uninitialized => write!(f, "free called before init"),
    }
  }
}

impl core::error::Error for InvalidFreeError {}
