//! Breadth-first traversal scratch state.
//!
//! A [`BfsState`] is a one-shot object sized for one specific graph: two
//! word-rounded bitsets (discovered, processed), a parent table, and an
//! embedded [`Queue`](crate::queue::Queue) of vertex ids, all inside the
//! caller's buffer. Re-running a search requires re-creating the state in
//! the same buffer; calling [`BfsState::bfs`] again with an undiscovered
//! root resumes into an unvisited component instead.

use tracing::debug;

use crate::error::{GravaError, Result};
use crate::queue::{self, Queue};
use crate::slab::{self, SlabKind};
use crate::types::{Datum, EdgeMode, VertexId};

use super::{Graph, NIL};

/// Traversal callbacks. Every method defaults to a no-op; implement the
/// ones you need. Hooks receive the graph and the traversal state as shared
/// references, so they can query both but can mutate neither; accumulate
/// results in the implementor itself.
pub trait BfsHooks {
    fn on_vertex_early(&mut self, _graph: &Graph<'_>, _state: &BfsState<'_>, _v: VertexId) {}
    fn on_edge(&mut self, _graph: &Graph<'_>, _state: &BfsState<'_>, _from: VertexId, _to: VertexId) {
    }
    fn on_vertex_late(&mut self, _graph: &Graph<'_>, _state: &BfsState<'_>, _v: VertexId) {}
}

/// Hook-free traversal.
impl BfsHooks for () {}

mod fields {
    use core::ops::Range;

    pub const VERTEX_CAPACITY: Range<usize> = 12..16;
    pub const GENERATION: Range<usize> = 16..20;
    pub const ROOT: Range<usize> = 20..24;
}

const SCRATCH: usize = 24;

pub struct BfsState<'b> {
    buf: &'b mut [u8],
}

impl<'b> BfsState<'b> {
    /// Byte count for a state able to traverse `graph`, embedded queue
    /// included.
    pub fn compute_buffer_size(graph: &Graph<'_>) -> Result<usize> {
        let vertex_capacity = graph.vertex_capacity();
        let queue = queue::compute_buffer_size(vertex_capacity)?;
        scratch_end(vertex_capacity)
            .checked_add(queue)
            .filter(|&total| total <= u32::MAX as usize)
            .ok_or(GravaError::Invalid("traversal state size overflows"))
    }

    /// Lays out a fresh state bound to `graph`'s current generation.
    pub fn create(graph: &Graph<'_>, buf: &'b mut [u8]) -> Result<Self> {
        let total = Self::compute_buffer_size(graph)?;
        slab::check_create_buffer(buf, total)?;
        let vertex_capacity = graph.vertex_capacity();
        slab::write_header(buf, SlabKind::Bfs, total as u32);
        slab::write_u32(buf, fields::VERTEX_CAPACITY.start, vertex_capacity as u32);
        slab::write_u32(buf, fields::GENERATION.start, graph.generation());
        slab::write_i32(buf, fields::ROOT.start, NIL);
        let words = slab::bitset_len(vertex_capacity);
        buf[SCRATCH..SCRATCH + 2 * words].fill(0);
        let parent = SCRATCH + 2 * words;
        for v in 0..vertex_capacity {
            slab::write_i32(buf, parent + v * 4, NIL);
        }
        let queue_start = scratch_end(vertex_capacity);
        Queue::create(vertex_capacity, &mut buf[queue_start..total])?;
        debug!(vertex_capacity, "created bfs state");
        Ok(Self { buf })
    }

    pub fn attach(buf: &'b mut [u8]) -> Result<Self> {
        let recorded = slab::check_header(buf, SlabKind::Bfs)?;
        if recorded < SCRATCH {
            return Err(GravaError::Corruption("bfs state header truncated"));
        }
        let vertex_capacity = slab::read_u32(buf, fields::VERTEX_CAPACITY.start) as usize;
        let queue = queue::compute_buffer_size(vertex_capacity)
            .map_err(|_| GravaError::Corruption("bfs state header fields out of range"))?;
        if scratch_end(vertex_capacity) + queue != recorded {
            return Err(GravaError::Corruption("bfs state recorded size mismatch"));
        }
        let root = slab::read_i32(buf, fields::ROOT.start);
        if root < NIL || root >= vertex_capacity as i32 {
            return Err(GravaError::Corruption("bfs state root out of range"));
        }
        let queue_start = scratch_end(vertex_capacity);
        Queue::attach(&mut buf[queue_start..recorded])?;
        Ok(Self { buf })
    }

    pub fn relocate(src: &[u8], dst: &'b mut [u8]) -> Result<Self> {
        slab::copy_object(src, dst, SlabKind::Bfs)?;
        Self::attach(dst)
    }

    /// Runs breadth-first search from `root`, firing the hooks. Each
    /// reachable vertex's early/late hooks fire exactly once and `on_edge`
    /// fires once per logical edge. An already-discovered root is a
    /// successful no-op.
    pub fn bfs<H: BfsHooks>(
        &mut self,
        graph: &Graph<'_>,
        root: VertexId,
        hooks: &mut H,
    ) -> Result<()> {
        self.check_graph(graph)?;
        if !graph.is_live(root) {
            return Err(GravaError::Invalid("root vertex is not live"));
        }
        if self.is_discovered(root)? {
            return Ok(());
        }
        if slab::read_i32(self.buf, fields::ROOT.start) == NIL {
            slab::write_i32(self.buf, fields::ROOT.start, root.0);
        }
        let directed = graph.mode() == EdgeMode::Directed;
        self.set_discovered(root.0 as usize);
        self.queue_push(root.0)?;
        while let Some(v0) = self.queue_pop()? {
            hooks.on_vertex_early(graph, self, VertexId(v0));
            // Processed before the edge scan so an undirected back-edge to
            // v0 is not reported a second time.
            self.set_processed(v0 as usize);
            let mut cursor = graph.edge_head_raw(v0 as usize);
            while cursor != NIL {
                let (dest, next) = graph.edge_record(cursor as usize)?;
                if directed || !self.processed_raw(dest as usize) {
                    hooks.on_edge(graph, self, VertexId(v0), VertexId(dest));
                }
                if !self.discovered_raw(dest as usize) {
                    self.set_discovered(dest as usize);
                    self.set_parent_raw(dest as usize, v0);
                    self.queue_push(dest)?;
                }
                cursor = next;
            }
            hooks.on_vertex_late(graph, self, VertexId(v0));
        }
        Ok(())
    }

    /// Parent of `v` in the search tree; `None` for roots and unreached
    /// vertices.
    pub fn parent(&self, v: VertexId) -> Result<Option<VertexId>> {
        let slot = self.check_vertex(v)?;
        let raw = slab::read_i32(self.buf, self.parent_base() + slot * 4);
        Ok((raw != NIL).then_some(VertexId(raw)))
    }

    pub fn is_discovered(&self, v: VertexId) -> Result<bool> {
        let slot = self.check_vertex(v)?;
        Ok(self.discovered_raw(slot))
    }

    pub fn is_processed(&self, v: VertexId) -> Result<bool> {
        let slot = self.check_vertex(v)?;
        Ok(self.processed_raw(slot))
    }

    /// First search root, once a search has run.
    pub fn root(&self) -> Option<VertexId> {
        let raw = slab::read_i32(self.buf, fields::ROOT.start);
        (raw != NIL).then_some(VertexId(raw))
    }

    pub fn vertex_capacity(&self) -> usize {
        slab::read_u32(self.buf, fields::VERTEX_CAPACITY.start) as usize
    }

    pub fn generation(&self) -> u32 {
        slab::read_u32(self.buf, fields::GENERATION.start)
    }

    pub fn buffer_size(&self) -> usize {
        slab::read_u32(self.buf, slab::header::RECORDED_SIZE.start) as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.buffer_size()]
    }

    fn check_graph(&self, graph: &Graph<'_>) -> Result<()> {
        if graph.vertex_capacity() != self.vertex_capacity() {
            return Err(GravaError::Invalid("state built for a different graph"));
        }
        if graph.generation() != self.generation() {
            return Err(GravaError::Invalid("traversal state is stale"));
        }
        Ok(())
    }

    fn check_vertex(&self, v: VertexId) -> Result<usize> {
        if v.0 < 0 || v.0 as usize >= self.vertex_capacity() {
            return Err(GravaError::Invalid("vertex id out of range"));
        }
        Ok(v.0 as usize)
    }

    fn words(&self) -> usize {
        slab::bitset_len(self.vertex_capacity())
    }

    fn discovered_raw(&self, slot: usize) -> bool {
        slab::bitset_get(self.buf, SCRATCH, slot)
    }

    fn set_discovered(&mut self, slot: usize) {
        slab::bitset_set(self.buf, SCRATCH, slot);
    }

    fn processed_raw(&self, slot: usize) -> bool {
        let base = SCRATCH + self.words();
        slab::bitset_get(self.buf, base, slot)
    }

    fn set_processed(&mut self, slot: usize) {
        let base = SCRATCH + self.words();
        slab::bitset_set(self.buf, base, slot);
    }

    fn parent_base(&self) -> usize {
        SCRATCH + 2 * self.words()
    }

    fn set_parent_raw(&mut self, slot: usize, parent: i32) {
        let off = self.parent_base() + slot * 4;
        slab::write_i32(self.buf, off, parent);
    }

    fn queue_push(&mut self, v: i32) -> Result<()> {
        let start = scratch_end(self.vertex_capacity());
        let end = self.buffer_size();
        let mut queue = Queue::attach(&mut self.buf[start..end])?;
        queue.push(Datum::from_int(v))
    }

    fn queue_pop(&mut self) -> Result<Option<i32>> {
        let start = scratch_end(self.vertex_capacity());
        let end = self.buffer_size();
        let mut queue = Queue::attach(&mut self.buf[start..end])?;
        if queue.is_empty() {
            return Ok(None);
        }
        Ok(Some(queue.pop()?.as_int()))
    }
}

fn scratch_end(vertex_capacity: usize) -> usize {
    SCRATCH + 2 * slab::bitset_len(vertex_capacity) + vertex_capacity * 4
}
