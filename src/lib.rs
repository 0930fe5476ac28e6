//! Fixed-capacity data structures and graph traversals over caller-provided
//! buffers.
//!
//! Every container here is bring-your-own-buffer: a pure
//! `compute_buffer_size` reports the exact byte count a shape requires, the
//! caller acquires that buffer anywhere it likes (stack frame, arena,
//! mapped region) and passes it to `create`, and every later operation
//! works inside that buffer alone. The library never allocates.
//!
//! Because all state, links included, lives in one contiguous range of
//! bytes as little-endian indices, an object is serialized by writing
//! `as_bytes()` and revived by `attach`; `relocate` is a byte copy plus
//! `attach`, with no pointer fix-up pass.
//!
//! The pieces:
//!
//! - [`pool::Pool`] — fixed-size-block allocator with an embedded
//!   free-list; O(1) alloc and free.
//! - [`heap::MinHeap`] — 1-based binary min-heap ordered by a caller
//!   [`heap::KeyOrder`] capability.
//! - [`queue::Queue`] / [`stack::Stack`] — ring FIFO and array LIFO of
//!   [`types::Datum`].
//! - [`graph::Graph`] — adjacency-list vertex/edge store, directed or
//!   undirected, with its edge records in an embedded pool.
//! - [`graph::BfsState`] / [`graph::DfsState`] — traversal scratch objects
//!   with callback hooks, parent trees and entry/exit clocks.
//! - [`graph::topo_sort`] — reverse-postorder topological sort with cycle
//!   rejection.

#![forbid(unsafe_code)]

pub mod error;
pub mod graph;
pub mod heap;
pub mod pool;
pub mod queue;
mod slab;
pub mod stack;
pub mod types;

pub use error::{GravaError, Result};
pub use graph::{
    topo_sort, topo_sort_buffer_size, BfsHooks, BfsState, DfsHooks, DfsState, EdgeKind, Graph,
    GraphConfig,
};
pub use heap::{FloatAscending, IntAscending, KeyOrder, MinHeap};
pub use pool::{Pool, PoolView};
pub use queue::Queue;
pub use stack::Stack;
pub use types::{Datum, EdgeMode, VertexId};
