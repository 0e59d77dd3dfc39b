//! # implicit-heap - An implicit free-list allocator
//!
//! This crate implements a **dynamic memory allocator** built on an
//! implicit free list: every block of heap memory carries a small
//! boundary-tag header and footer recording its size and allocation
//! state, and free blocks are found by walking the list from the start
//! of the heap rather than through a separate free-block index.
//!
//! ## Overview
//!
//! ```text
//!   Implicit Free List:
//!
//!   ┌────────────────────────────────────────────────────────────────┐
//!   │                          HEAP MEMORY                            │
//!   │                                                                  │
//!   │  ┌────┬──────────┬────┬────┬──────────┬────┬────┬─────────┬────┐│
//!   │  │Prlg│  Block A  │Hdr │Ftr│  Block B  │Hdr │Ftr│ Block C │Epil││
//!   │  │    │ allocated │    │   │   free    │    │   │allocated│    ││
//!   │  └────┴──────────┴────┴────┴──────────┴────┴────┴─────────┴────┘│
//!   └────────────────────────────────────────────────────────────────┘
//!
//!   Each block's header and footer store the same (size, allocated) tag,
//!   so a free just-toggled block can look both ways and coalesce with
//!   any free neighbor in O(1).
//! ```
//!
//! ## Crate structure
//!
//! ```text
//!   implicit-heap
//!   ├── align    - word/dword size constants and alignment arithmetic
//!   ├── tag      - boundary-tag encoding and the only unchecked pointer math
//!   ├── block    - block construction and the free/alloc toggle
//!   ├── check    - the heap-consistency walker
//!   ├── provider - the MemoryProvider contract, sbrk-backed and in-memory
//!   ├── error    - the error taxonomy returned by init/allocate/free
//!   ├── heap     - Heap<P>, the explicit-state allocator instance
//!   └── global   - a single process-wide Heap<SbrkProvider>, for convenience
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use implicit_heap::{Heap, BufferProvider};
//!
//! let mut heap = Heap::new(BufferProvider::with_capacity(1 << 20));
//! heap.init().unwrap();
//!
//! let p = heap.allocate(64).unwrap();
//! let q = heap.reallocate(Some(p), 128).unwrap();
//! heap.free(Some(q));
//! ```
//!
//! Or, for a single process-wide heap backed by `sbrk`, use the
//! [`global`] module directly.
//!
//! ## Safety
//!
//! This crate manages raw memory: every allocation, free, and resize call
//! trusts its caller to pass back only pointers this same heap produced.
//! Pointer arithmetic itself is confined to [`tag`], which every other
//! module treats as the sole authority on block layout.

pub mod align;
mod block;
mod check;
pub mod error;
pub mod global;
pub mod heap;
pub mod provider;
mod tag;

pub use check::Violation;
pub use error::{InitError, InvalidFreeError, OutOfMemoryError};
pub use heap::Heap;
pub use provider::{BufferProvider, MemoryProvider, SbrkProvider};
