//! Depth-first traversal scratch state.
//!
//! The search is iterative: an embedded [`Stack`](crate::stack::Stack) of
//! vertex ids plus a per-vertex `next_edge` cursor into the graph's edge
//! pool replace recursion, so arbitrarily deep graphs traverse in constant
//! program stack. Entry/exit timestamps from a shared monotonic clock
//! support the Tree/Back/Forward/Cross classification that topological sort
//! relies on.

use tracing::debug;

use crate::error::{GravaError, Result};
use crate::slab::{self, SlabKind};
use crate::stack::{self, Stack};
use crate::types::{Datum, EdgeMode, VertexId};

use super::{Graph, NIL};

/// Classification of a directed edge relative to the DFS tree.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EdgeKind {
    /// First entry into the destination; the edge is in the search tree.
    Tree,
    /// Destination is an ancestor still being explored; proves a cycle.
    Back,
    /// Destination is a finished descendant.
    Forward,
    /// Destination finished in an earlier part of the search.
    Cross,
}

/// Traversal callbacks; see [`BfsHooks`](super::BfsHooks) for the contract.
pub trait DfsHooks {
    fn on_vertex_early(&mut self, _graph: &Graph<'_>, _state: &DfsState<'_>, _v: VertexId) {}
    fn on_edge(&mut self, _graph: &Graph<'_>, _state: &DfsState<'_>, _from: VertexId, _to: VertexId) {
    }
    fn on_vertex_late(&mut self, _graph: &Graph<'_>, _state: &DfsState<'_>, _v: VertexId) {}
}

/// Hook-free traversal.
impl DfsHooks for () {}

mod fields {
    use core::ops::Range;

    pub const VERTEX_CAPACITY: Range<usize> = 12..16;
    pub const GENERATION: Range<usize> = 16..20;
    pub const ROOT: Range<usize> = 20..24;
    pub const TIME: Range<usize> = 24..28;
}

const SCRATCH: usize = 28;

pub struct DfsState<'b> {
    buf: &'b mut [u8],
}

impl<'b> DfsState<'b> {
    /// Byte count for a state able to traverse `graph`, embedded stack
    /// included.
    pub fn compute_buffer_size(graph: &Graph<'_>) -> Result<usize> {
        let vertex_capacity = graph.vertex_capacity();
        let stack = stack::compute_buffer_size(vertex_capacity)?;
        scratch_end(vertex_capacity)
            .checked_add(stack)
            .filter(|&total| total <= u32::MAX as usize)
            .ok_or(GravaError::Invalid("traversal state size overflows"))
    }

    /// Lays out a fresh state bound to `graph`'s current generation. Each
    /// live vertex's edge cursor starts at its current list head.
    pub fn create(graph: &Graph<'_>, buf: &'b mut [u8]) -> Result<Self> {
        let total = Self::compute_buffer_size(graph)?;
        slab::check_create_buffer(buf, total)?;
        let vertex_capacity = graph.vertex_capacity();
        slab::write_header(buf, SlabKind::Dfs, total as u32);
        slab::write_u32(buf, fields::VERTEX_CAPACITY.start, vertex_capacity as u32);
        slab::write_u32(buf, fields::GENERATION.start, graph.generation());
        slab::write_i32(buf, fields::ROOT.start, NIL);
        slab::write_u32(buf, fields::TIME.start, 0);
        let words = slab::bitset_len(vertex_capacity);
        let parent = SCRATCH + 2 * words;
        let entry = parent + vertex_capacity * 4;
        let exit = entry + vertex_capacity * 4;
        let next_edge = exit + vertex_capacity * 4;
        buf[SCRATCH..SCRATCH + 2 * words].fill(0);
        for v in 0..vertex_capacity {
            slab::write_i32(buf, parent + v * 4, NIL);
            slab::write_u32(buf, entry + v * 4, 0);
            slab::write_u32(buf, exit + v * 4, 0);
            let cursor = if graph.slot_live(v) {
                graph.edge_head_raw(v)
            } else {
                NIL
            };
            slab::write_i32(buf, next_edge + v * 4, cursor);
        }
        let stack_start = scratch_end(vertex_capacity);
        Stack::create(vertex_capacity, &mut buf[stack_start..total])?;
        debug!(vertex_capacity, "created dfs state");
        Ok(Self { buf })
    }

    pub fn attach(buf: &'b mut [u8]) -> Result<Self> {
        let recorded = slab::check_header(buf, SlabKind::Dfs)?;
        if recorded < SCRATCH {
            return Err(GravaError::Corruption("dfs state header truncated"));
        }
        let vertex_capacity = slab::read_u32(buf, fields::VERTEX_CAPACITY.start) as usize;
        let stack = stack::compute_buffer_size(vertex_capacity)
            .map_err(|_| GravaError::Corruption("dfs state header fields out of range"))?;
        if scratch_end(vertex_capacity) + stack != recorded {
            return Err(GravaError::Corruption("dfs state recorded size mismatch"));
        }
        let root = slab::read_i32(buf, fields::ROOT.start);
        if root < NIL || root >= vertex_capacity as i32 {
            return Err(GravaError::Corruption("dfs state root out of range"));
        }
        let stack_start = scratch_end(vertex_capacity);
        Stack::attach(&mut buf[stack_start..recorded])?;
        Ok(Self { buf })
    }

    pub fn relocate(src: &[u8], dst: &'b mut [u8]) -> Result<Self> {
        slab::copy_object(src, dst, SlabKind::Dfs)?;
        Self::attach(dst)
    }

    /// Runs depth-first search from `root`, firing the hooks. An already
    /// discovered root is a successful no-op, so repeated calls walk the
    /// remaining components one at a time.
    pub fn dfs<H: DfsHooks>(
        &mut self,
        graph: &Graph<'_>,
        root: VertexId,
        hooks: &mut H,
    ) -> Result<()> {
        self.check_graph(graph)?;
        if !graph.is_live(root) {
            return Err(GravaError::Invalid("root vertex is not live"));
        }
        if self.discovered_raw(root.0 as usize) {
            return Ok(());
        }
        if slab::read_i32(self.buf, fields::ROOT.start) == NIL {
            slab::write_i32(self.buf, fields::ROOT.start, root.0);
        }
        let directed = graph.mode() == EdgeMode::Directed;
        self.stack_push(root.0)?;
        while let Some(v0) = self.stack_pop()? {
            let slot = v0 as usize;
            if !self.discovered_raw(slot) {
                self.set_discovered(slot);
                let t = self.tick();
                self.set_entry_raw(slot, t);
                hooks.on_vertex_early(graph, self, VertexId(v0));
            }
            let cursor = self.next_edge_raw(slot);
            if cursor != NIL {
                let (dest, next) = graph.edge_record(cursor as usize)?;
                self.set_next_edge_raw(slot, next);
                // Put v0 back first so the destination explores on top.
                self.stack_push(v0)?;
                if !self.discovered_raw(dest as usize) {
                    self.set_parent_raw(dest as usize, v0);
                    hooks.on_edge(graph, self, VertexId(v0), VertexId(dest));
                    self.stack_push(dest)?;
                } else if directed
                    || (!self.processed_raw(dest as usize) && self.parent_raw(slot) != dest)
                {
                    // Undirected: the edge back to the parent and edges to
                    // finished vertices were already reported once.
                    hooks.on_edge(graph, self, VertexId(v0), VertexId(dest));
                }
            } else {
                hooks.on_vertex_late(graph, self, VertexId(v0));
                let t = self.tick();
                self.set_exit_raw(slot, t);
                self.set_processed(slot);
            }
        }
        Ok(())
    }

    /// Classifies `from → to` against the current search tree and clocks.
    pub fn classify_edge(&self, from: VertexId, to: VertexId) -> Result<EdgeKind> {
        let from_slot = self.check_vertex(from)?;
        let to_slot = self.check_vertex(to)?;
        if self.parent_raw(to_slot) == from.0 {
            return Ok(EdgeKind::Tree);
        }
        if !self.discovered_raw(to_slot) {
            return Err(GravaError::Invalid("edge target not yet reached"));
        }
        if !self.processed_raw(to_slot) {
            return Ok(EdgeKind::Back);
        }
        if self.entry_raw(to_slot) > self.entry_raw(from_slot) {
            Ok(EdgeKind::Forward)
        } else {
            Ok(EdgeKind::Cross)
        }
    }

    /// Parent of `v` in the search tree; `None` for roots and unreached
    /// vertices.
    pub fn parent(&self, v: VertexId) -> Result<Option<VertexId>> {
        let slot = self.check_vertex(v)?;
        let raw = self.parent_raw(slot);
        Ok((raw != NIL).then_some(VertexId(raw)))
    }

    /// Clock tick at first discovery; zero if not reached.
    pub fn entry_time(&self, v: VertexId) -> Result<u32> {
        let slot = self.check_vertex(v)?;
        Ok(self.entry_raw(slot))
    }

    /// Clock tick at final finish; zero if not finished.
    pub fn exit_time(&self, v: VertexId) -> Result<u32> {
        let slot = self.check_vertex(v)?;
        Ok(self.exit_raw(slot))
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

    fn parent_raw(&self, slot: usize) -> i32 {
        slab::read_i32(self.buf, self.parent_base() + slot * 4)
    }

    fn set_parent_raw(&mut self, slot: usize, parent: i32) {
        let off = self.parent_base() + slot * 4;
        slab::write_i32(self.buf, off, parent);
    }

    fn entry_base(&self) -> usize {
        self.parent_base() + self.vertex_capacity() * 4
    }

    fn entry_raw(&self, slot: usize) -> u32 {
        slab::read_u32(self.buf, self.entry_base() + slot * 4)
    }

    fn set_entry_raw(&mut self, slot: usize, t: u32) {
        let off = self.entry_base() + slot * 4;
        slab::write_u32(self.buf, off, t);
    }

    fn exit_base(&self) -> usize {
        self.entry_base() + self.vertex_capacity() * 4
    }

    fn exit_raw(&self, slot: usize) -> u32 {
        slab::read_u32(self.buf, self.exit_base() + slot * 4)
    }

    fn set_exit_raw(&mut self, slot: usize, t: u32) {
        let off = self.exit_base() + slot * 4;
        slab::write_u32(self.buf, off, t);
    }

    fn next_edge_base(&self) -> usize {
        self.exit_base() + self.vertex_capacity() * 4
    }

    fn next_edge_raw(&self, slot: usize) -> i32 {
        slab::read_i32(self.buf, self.next_edge_base() + slot * 4)
    }

    fn set_next_edge_raw(&mut self, slot: usize, cursor: i32) {
        let off = self.next_edge_base() + slot * 4;
        slab::write_i32(self.buf, off, cursor);
    }

    fn tick(&mut self) -> u32 {
        let t = slab::read_u32(self.buf, fields::TIME.start) + 1;
        slab::write_u32(self.buf, fields::TIME.start, t);
        t
    }

    fn stack_push(&mut self, v: i32) -> Result<()> {
        let start = scratch_end(self.vertex_capacity());
        let end = self.buffer_size();
        let mut stack = Stack::attach(&mut self.buf[start..end])?;
        stack.push(Datum::from_int(v))
    }

    fn stack_pop(&mut self) -> Result<Option<i32>> {
        let start = scratch_end(self.vertex_capacity());
        let end = self.buffer_size();
        let mut stack = Stack::attach(&mut self.buf[start..end])?;
        if stack.is_empty() {
            return Ok(None);
        }
        Ok(Some(stack.pop()?.as_int()))
    }
}

fn scratch_end(vertex_capacity: usize) -> usize {
    SCRATCH + 2 * slab::bitset_len(vertex_capacity) + vertex_capacity * 4 * 4
}
