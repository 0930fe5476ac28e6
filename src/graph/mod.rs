//! Adjacency-list graph over a caller buffer.
//!
//! Vertices live in a fixed table; unused slots form an intrusive free-list
//! that reuses the datum field as the next-free link. Edges are records in
//! an embedded [`pool`](crate::pool) at the tail of the graph's buffer,
//! threaded into one singly-linked list per source vertex. A compact list of
//! live vertex ids plus its inverse map give O(1) iteration and O(1)
//! vertex-id removal from the iteration order.
//!
//! In undirected mode every logical edge is stored as two symmetric records
//! and counted once. Edge removal is a linear walk of the source's list;
//! removing a vertex from a directed graph scans every other vertex for
//! incoming edges, which keeps the records at 12 bytes at the cost of O(V+E)
//! removal.

use tracing::{debug, warn};

use crate::error::{GravaError, Result};
use crate::pool::{self, Pool, PoolView};
use crate::slab::{self, SlabKind};
use crate::types::{Datum, EdgeMode, VertexId, EDGE_MODE_UNDIRECTED};

mod bfs;
mod dfs;
mod topo;

pub use bfs::{BfsHooks, BfsState};
pub use dfs::{DfsHooks, DfsState, EdgeKind};
pub use topo::{topo_sort, topo_sort_buffer_size};

pub(crate) const NIL: i32 = -1;

mod fields {
    use core::ops::Range;

    pub const VERTEX_CAPACITY: Range<usize> = 12..16;
    pub const EDGE_CAPACITY: Range<usize> = 16..20;
    pub const EDGE_MODE: usize = 20;
    pub const VERTEX_COUNT: Range<usize> = 24..28;
    pub const EDGE_COUNT: Range<usize> = 28..32;
    pub const FREE_HEAD: Range<usize> = 32..36;
    pub const GENERATION: Range<usize> = 36..40;
}

const VERTEX_TABLE: usize = 40;

// Vertex record: degree i32 (-1 marks a free slot), datum bits u32 (the
// next-free link while the slot is free), edge list head i32.
const VERTEX_RECORD_LEN: usize = 12;
const VREC_DEGREE: usize = 0;
const VREC_DATUM: usize = 4;
const VREC_EDGE_HEAD: usize = 8;

// Edge record: destination vertex id i32, next edge in the same source's
// list i32, weight i32 (reserved, always zero).
const EDGE_RECORD_LEN: usize = 12;
const EREC_DEST: usize = 0;
const EREC_NEXT: usize = 4;

/// Capacity parameters fixed at graph creation.
#[derive(Copy, Clone, Debug)]
pub struct GraphConfig {
    pub vertex_capacity: usize,
    pub edge_capacity: usize,
    pub mode: EdgeMode,
}

impl GraphConfig {
    pub fn directed(vertex_capacity: usize, edge_capacity: usize) -> Self {
        Self {
            vertex_capacity,
            edge_capacity,
            mode: EdgeMode::Directed,
        }
    }

    pub fn undirected(vertex_capacity: usize, edge_capacity: usize) -> Self {
        Self {
            vertex_capacity,
            edge_capacity,
            mode: EdgeMode::Undirected,
        }
    }

    fn edge_node_capacity(&self) -> usize {
        self.edge_capacity * self.mode.arcs_per_edge()
    }
}

struct Regions {
    valid_ids: usize,
    id_to_index: usize,
    pool: usize,
}

fn regions_for(vertex_capacity: usize) -> Regions {
    let valid_ids = VERTEX_TABLE + vertex_capacity * VERTEX_RECORD_LEN;
    let id_to_index = valid_ids + vertex_capacity * 4;
    let pool = id_to_index + vertex_capacity * 4;
    Regions {
        valid_ids,
        id_to_index,
        pool,
    }
}

pub struct Graph<'b> {
    buf: &'b mut [u8],
}

impl<'b> Graph<'b> {
    /// Exact byte count a graph with the given shape requires, including its
    /// embedded edge pool.
    pub fn compute_buffer_size(config: GraphConfig) -> Result<usize> {
        if config.vertex_capacity < 1 || config.edge_capacity < 1 {
            return Err(GravaError::Invalid("capacities must be at least 1"));
        }
        if config.vertex_capacity > i32::MAX as usize {
            return Err(GravaError::Invalid("vertex capacity exceeds id range"));
        }
        let tables = config
            .vertex_capacity
            .checked_mul(VERTEX_RECORD_LEN + 8)
            .and_then(|t| t.checked_add(VERTEX_TABLE))
            .ok_or(GravaError::Invalid("graph size overflows"))?;
        let pool_size = pool::compute_buffer_size(EDGE_RECORD_LEN, config.edge_node_capacity())?;
        tables
            .checked_add(pool_size)
            .filter(|&total| total <= u32::MAX as usize)
            .ok_or(GravaError::Invalid("graph size overflows"))
    }

    pub fn create(config: GraphConfig, buf: &'b mut [u8]) -> Result<Self> {
        let total = Self::compute_buffer_size(config)?;
        slab::check_create_buffer(buf, total)?;
        slab::write_header(buf, SlabKind::Graph, total as u32);
        slab::write_u32(buf, fields::VERTEX_CAPACITY.start, config.vertex_capacity as u32);
        slab::write_u32(buf, fields::EDGE_CAPACITY.start, config.edge_capacity as u32);
        buf[fields::EDGE_MODE] = config.mode.as_u8();
        buf[fields::EDGE_MODE + 1..fields::EDGE_MODE + 4].fill(0);
        slab::write_u32(buf, fields::VERTEX_COUNT.start, 0);
        slab::write_u32(buf, fields::EDGE_COUNT.start, 0);
        slab::write_i32(buf, fields::FREE_HEAD.start, 0);
        slab::write_u32(buf, fields::GENERATION.start, 0);
        let regions = regions_for(config.vertex_capacity);
        for slot in 0..config.vertex_capacity {
            let rec = VERTEX_TABLE + slot * VERTEX_RECORD_LEN;
            let next = if slot + 1 < config.vertex_capacity {
                (slot + 1) as i32
            } else {
                NIL
            };
            slab::write_i32(buf, rec + VREC_DEGREE, NIL);
            slab::write_i32(buf, rec + VREC_DATUM, next);
            slab::write_i32(buf, rec + VREC_EDGE_HEAD, NIL);
            slab::write_i32(buf, regions.valid_ids + slot * 4, 0);
            slab::write_i32(buf, regions.id_to_index + slot * 4, NIL);
        }
        Pool::create(
            EDGE_RECORD_LEN,
            config.edge_node_capacity(),
            &mut buf[regions.pool..total],
        )?;
        debug!(
            vertex_capacity = config.vertex_capacity,
            edge_capacity = config.edge_capacity,
            mode = ?config.mode,
            "created graph"
        );
        Ok(Self { buf })
    }

    /// Re-opens a buffer that already contains a graph, validating the
    /// header and the embedded pool's shape.
    pub fn attach(buf: &'b mut [u8]) -> Result<Self> {
        let recorded = slab::check_header(buf, SlabKind::Graph)?;
        if recorded < VERTEX_TABLE {
            return Err(GravaError::Corruption("graph header truncated"));
        }
        let vertex_capacity = slab::read_u32(buf, fields::VERTEX_CAPACITY.start) as usize;
        let edge_capacity = slab::read_u32(buf, fields::EDGE_CAPACITY.start) as usize;
        let mode = EdgeMode::try_from(buf[fields::EDGE_MODE])?;
        let config = GraphConfig {
            vertex_capacity,
            edge_capacity,
            mode,
        };
        let expected = Self::compute_buffer_size(config)
            .map_err(|_| GravaError::Corruption("graph header fields out of range"))?;
        if expected != recorded {
            return Err(GravaError::Corruption("graph recorded size mismatch"));
        }
        if slab::read_u32(buf, fields::VERTEX_COUNT.start) as usize > vertex_capacity
            || slab::read_u32(buf, fields::EDGE_COUNT.start) as usize > edge_capacity
        {
            return Err(GravaError::Corruption("graph counts exceed capacities"));
        }
        let free_head = slab::read_i32(buf, fields::FREE_HEAD.start);
        if free_head < NIL || free_head >= vertex_capacity as i32 {
            return Err(GravaError::Corruption("graph free head out of range"));
        }
        let regions = regions_for(vertex_capacity);
        let view = PoolView::attach(&buf[regions.pool..recorded])?;
        if view.element_size() != EDGE_RECORD_LEN
            || view.capacity() != config.edge_node_capacity()
        {
            return Err(GravaError::Corruption("embedded edge pool shape mismatch"));
        }
        Ok(Self { buf })
    }

    /// Copies the graph stored in `src` into `dst` and attaches it. All
    /// internal links are indices, so no fix-up pass runs.
    pub fn relocate(src: &[u8], dst: &'b mut [u8]) -> Result<Self> {
        slab::copy_object(src, dst, SlabKind::Graph)?;
        Self::attach(dst)
    }

    pub fn vertex_capacity(&self) -> usize {
        slab::read_u32(self.buf, fields::VERTEX_CAPACITY.start) as usize
    }

    pub fn edge_capacity(&self) -> usize {
        slab::read_u32(self.buf, fields::EDGE_CAPACITY.start) as usize
    }

    pub fn mode(&self) -> EdgeMode {
        // The byte is validated at create/attach.
        if self.buf[fields::EDGE_MODE] == EDGE_MODE_UNDIRECTED {
            EdgeMode::Undirected
        } else {
            EdgeMode::Directed
        }
    }

    pub fn vertex_count(&self) -> usize {
        slab::read_u32(self.buf, fields::VERTEX_COUNT.start) as usize
    }

    /// Logical edge count: an undirected pair counts once.
    pub fn edge_count(&self) -> usize {
        slab::read_u32(self.buf, fields::EDGE_COUNT.start) as usize
    }

    /// Monotonic counter bumped by every structural mutation. Traversal
    /// states record it at creation to detect staleness.
    pub fn generation(&self) -> u32 {
        slab::read_u32(self.buf, fields::GENERATION.start)
    }

    pub fn buffer_size(&self) -> usize {
        slab::read_u32(self.buf, slab::header::RECORDED_SIZE.start) as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.buffer_size()]
    }

    pub fn is_live(&self, v: VertexId) -> bool {
        v.0 >= 0 && (v.0 as usize) < self.vertex_capacity() && self.degree_raw(v.0 as usize) >= 0
    }

    /// Iterates the live vertex ids in their compact-list order.
    pub fn vertices(&self) -> Vertices<'_, 'b> {
        Vertices {
            graph: self,
            index: 0,
        }
    }

    /// Claims a free vertex slot. The returned id stays valid until the
    /// vertex is removed.
    pub fn add_vertex(&mut self, data: Datum) -> Result<VertexId> {
        let head = slab::read_i32(self.buf, fields::FREE_HEAD.start);
        if head == NIL {
            return Err(GravaError::Failed("vertex capacity exhausted"));
        }
        let slot = head as usize;
        let next = self.datum_raw(slot) as i32;
        slab::write_i32(self.buf, fields::FREE_HEAD.start, next);
        self.set_degree_raw(slot, 0);
        self.set_datum_raw(slot, data.bits());
        self.set_edge_head_raw(slot, NIL);
        let count = self.vertex_count();
        let regions = self.regions();
        slab::write_i32(self.buf, regions.valid_ids + count * 4, slot as i32);
        slab::write_i32(self.buf, regions.id_to_index + slot * 4, count as i32);
        slab::write_u32(self.buf, fields::VERTEX_COUNT.start, count as u32 + 1);
        self.bump_generation();
        Ok(VertexId(slot as i32))
    }

    /// Removes a vertex and every incident edge, then returns its slot to
    /// the free-list. In undirected mode this costs the removed vertex's
    /// degree plus its neighbors' list walks; in directed mode it scans
    /// every other vertex for incoming edges.
    pub fn remove_vertex(&mut self, v: VertexId) -> Result<()> {
        let slot = self.require_live(v)?;
        match self.mode() {
            EdgeMode::Undirected => loop {
                let head = self.edge_head_raw(slot);
                if head == NIL {
                    break;
                }
                let (dest, _) = self.edge_record(head as usize)?;
                self.unlink_arc(slot, dest)?;
                self.unlink_arc(dest as usize, v.0)
                    .map_err(|_| GravaError::Corruption("undirected edge mirror missing"))?;
                self.dec_edge_count();
            },
            EdgeMode::Directed => {
                let mut head = self.edge_head_raw(slot);
                while head != NIL {
                    let (_, next) = self.edge_record(head as usize)?;
                    self.pool_mut()?.free(head as usize)?;
                    self.dec_edge_count();
                    head = next;
                }
                self.set_edge_head_raw(slot, NIL);
                self.set_degree_raw(slot, 0);
                for i in 0..self.vertex_count() {
                    let u = self.valid_id_at(i);
                    if u == v.0 {
                        continue;
                    }
                    if self.find_arc(u as usize, v.0)?.is_some() {
                        self.unlink_arc(u as usize, v.0)?;
                        self.dec_edge_count();
                    }
                }
            }
        }
        let free_head = slab::read_i32(self.buf, fields::FREE_HEAD.start);
        self.set_degree_raw(slot, NIL);
        self.set_datum_raw(slot, free_head as u32);
        self.set_edge_head_raw(slot, NIL);
        slab::write_i32(self.buf, fields::FREE_HEAD.start, slot as i32);
        let count = self.vertex_count();
        let regions = self.regions();
        let index = slab::read_i32(self.buf, regions.id_to_index + slot * 4) as usize;
        let last = slab::read_i32(self.buf, regions.valid_ids + (count - 1) * 4);
        slab::write_i32(self.buf, regions.valid_ids + index * 4, last);
        slab::write_i32(self.buf, regions.id_to_index + last as usize * 4, index as i32);
        slab::write_i32(self.buf, regions.id_to_index + slot * 4, NIL);
        slab::write_u32(self.buf, fields::VERTEX_COUNT.start, count as u32 - 1);
        self.bump_generation();
        Ok(())
    }

    /// Links a new edge at the head of the source's list. Adding an edge
    /// that already exists succeeds without change, which makes undirected
    /// insertion safe to call in either order. Self-edges are rejected.
    pub fn add_edge(&mut self, src: VertexId, dst: VertexId) -> Result<()> {
        let s = self.require_live(src)?;
        let d = self.require_live(dst)?;
        if src == dst {
            return Err(GravaError::Invalid("self edges are not allowed"));
        }
        if self.find_arc(s, dst.0)?.is_some() {
            return Ok(());
        }
        if self.edge_count() >= self.edge_capacity() {
            return Err(GravaError::Failed("edge capacity exhausted"));
        }
        // Admission is checked against the logical count, so the pool has
        // room for both records of an undirected pair or neither.
        self.link_arc(s, dst.0)?;
        if self.mode() == EdgeMode::Undirected {
            self.link_arc(d, src.0)?;
        }
        let count = self.edge_count();
        slab::write_u32(self.buf, fields::EDGE_COUNT.start, count as u32 + 1);
        self.bump_generation();
        Ok(())
    }

    /// Unlinks an edge; the mirror record too in undirected mode.
    pub fn remove_edge(&mut self, src: VertexId, dst: VertexId) -> Result<()> {
        let s = self.require_live(src)?;
        let d = self.require_live(dst)?;
        self.unlink_arc(s, dst.0)?;
        if self.mode() == EdgeMode::Undirected {
            self.unlink_arc(d, src.0)
                .map_err(|_| GravaError::Corruption("undirected edge mirror missing"))?;
        }
        self.dec_edge_count();
        self.bump_generation();
        Ok(())
    }

    pub fn has_edge(&self, src: VertexId, dst: VertexId) -> Result<bool> {
        let s = self.require_live(src)?;
        self.require_live(dst)?;
        Ok(self.find_arc(s, dst.0)?.is_some())
    }

    /// Outgoing edge count of a live vertex.
    pub fn degree(&self, v: VertexId) -> Result<usize> {
        let slot = self.require_live(v)?;
        Ok(self.degree_raw(slot) as usize)
    }

    /// Writes the destinations of `v`'s outgoing edges into `out`, most
    /// recently added first. `out` must be exactly `degree(v)` long.
    pub fn edges(&self, v: VertexId, out: &mut [VertexId]) -> Result<()> {
        let slot = self.require_live(v)?;
        if out.len() != self.degree_raw(slot) as usize {
            return Err(GravaError::Invalid("output length does not match degree"));
        }
        let mut cursor = self.edge_head_raw(slot);
        for entry in out.iter_mut() {
            let (dest, next) = self.edge_record(cursor as usize)?;
            *entry = VertexId(dest);
            cursor = next;
        }
        Ok(())
    }

    /// Iterates the destinations of `v`'s outgoing edges without an output
    /// buffer, most recently added first.
    pub fn neighbors(&self, v: VertexId) -> Result<Neighbors<'_, 'b>> {
        let slot = self.require_live(v)?;
        Ok(Neighbors {
            graph: self,
            cursor: self.edge_head_raw(slot),
        })
    }

    pub fn vertex_data(&self, v: VertexId) -> Result<Datum> {
        let slot = self.require_live(v)?;
        Ok(Datum::from_bits(self.datum_raw(slot)))
    }

    /// Payload writes do not bump the generation; traversal states remain
    /// valid across them.
    pub fn set_vertex_data(&mut self, v: VertexId, data: Datum) -> Result<()> {
        let slot = self.require_live(v)?;
        self.set_datum_raw(slot, data.bits());
        Ok(())
    }

    /// Exhaustive consistency check: list lengths match degrees, edge
    /// targets are live, live and free slots partition the table, the
    /// compact list and its inverse agree, and the edge pool's bookkeeping
    /// matches the degree totals.
    pub fn validate(&self) -> Result<()> {
        fn fail(reason: &'static str) -> GravaError {
            warn!(reason, "graph validation failed");
            GravaError::Invalid(reason)
        }

        let vertex_capacity = self.vertex_capacity();
        let vertex_count = self.vertex_count();
        let regions = self.regions();
        if vertex_count > vertex_capacity || self.edge_count() > self.edge_capacity() {
            return Err(fail("counts exceed capacities"));
        }

        let mut live = 0usize;
        for slot in 0..vertex_capacity {
            let index = slab::read_i32(self.buf, regions.id_to_index + slot * 4);
            if self.degree_raw(slot) >= 0 {
                live += 1;
                if index < 0
                    || index as usize >= vertex_count
                    || self.valid_id_at(index as usize) != slot as i32
                {
                    return Err(fail("live vertex missing from compact list"));
                }
            } else if index != NIL {
                return Err(fail("free slot present in inverse map"));
            }
        }
        if live != vertex_count {
            return Err(fail("live slot count does not match vertex count"));
        }

        let mut free_walked = 0usize;
        let mut cursor = slab::read_i32(self.buf, fields::FREE_HEAD.start);
        while cursor != NIL {
            if cursor < 0 || cursor as usize >= vertex_capacity {
                return Err(fail("vertex free-list index out of range"));
            }
            if self.degree_raw(cursor as usize) != NIL {
                return Err(fail("live slot reachable from vertex free-list"));
            }
            free_walked += 1;
            if free_walked > vertex_capacity - vertex_count {
                return Err(fail("vertex free-list longer than free slot count"));
            }
            cursor = self.datum_raw(cursor as usize) as i32;
        }
        if free_walked != vertex_capacity - vertex_count {
            return Err(fail("vertex free-list shorter than free slot count"));
        }

        let mut arc_total = 0usize;
        for i in 0..vertex_count {
            let v = self.valid_id_at(i);
            let slot = v as usize;
            let degree = self.degree_raw(slot);
            let mut walked = 0i32;
            let mut cursor = self.edge_head_raw(slot);
            while cursor != NIL {
                let (dest, next) = self.edge_record(cursor as usize)?;
                if dest == v {
                    return Err(fail("self edge present"));
                }
                if !self.is_live(VertexId(dest)) {
                    return Err(fail("edge target is not live"));
                }
                // Duplicate scan over the rest of the list.
                let mut probe = next;
                while probe != NIL {
                    let (other, after) = self.edge_record(probe as usize)?;
                    if other == dest {
                        return Err(fail("duplicate edge in one direction"));
                    }
                    probe = after;
                }
                if self.mode() == EdgeMode::Undirected
                    && self.find_arc(dest as usize, v)?.is_none()
                {
                    return Err(fail("undirected edge mirror missing"));
                }
                walked += 1;
                if walked > degree {
                    return Err(fail("edge list longer than recorded degree"));
                }
                cursor = next;
            }
            if walked != degree {
                return Err(fail("edge list shorter than recorded degree"));
            }
            arc_total += degree as usize;
        }
        if arc_total != self.edge_count() * self.mode().arcs_per_edge() {
            return Err(fail("edge records do not match logical edge count"));
        }

        let view = self.pool_view()?;
        if view.free_count() != view.capacity() - arc_total {
            return Err(fail("edge pool free count does not match usage"));
        }
        view.validate().map_err(|_| fail("edge pool free-list damaged"))
    }

    fn regions(&self) -> Regions {
        regions_for(self.vertex_capacity())
    }

    fn require_live(&self, v: VertexId) -> Result<usize> {
        if !self.is_live(v) {
            return Err(GravaError::Invalid("vertex id is not live"));
        }
        Ok(v.0 as usize)
    }

    fn vrec(&self, slot: usize) -> usize {
        VERTEX_TABLE + slot * VERTEX_RECORD_LEN
    }

    fn degree_raw(&self, slot: usize) -> i32 {
        slab::read_i32(self.buf, self.vrec(slot) + VREC_DEGREE)
    }

    fn set_degree_raw(&mut self, slot: usize, value: i32) {
        let off = self.vrec(slot) + VREC_DEGREE;
        slab::write_i32(self.buf, off, value);
    }

    fn datum_raw(&self, slot: usize) -> u32 {
        slab::read_u32(self.buf, self.vrec(slot) + VREC_DATUM)
    }

    fn set_datum_raw(&mut self, slot: usize, bits: u32) {
        let off = self.vrec(slot) + VREC_DATUM;
        slab::write_u32(self.buf, off, bits);
    }

    pub(crate) fn edge_head_raw(&self, slot: usize) -> i32 {
        slab::read_i32(self.buf, self.vrec(slot) + VREC_EDGE_HEAD)
    }

    fn set_edge_head_raw(&mut self, slot: usize, value: i32) {
        let off = self.vrec(slot) + VREC_EDGE_HEAD;
        slab::write_i32(self.buf, off, value);
    }

    pub(crate) fn slot_live(&self, slot: usize) -> bool {
        self.degree_raw(slot) >= 0
    }

    fn valid_id_at(&self, index: usize) -> i32 {
        slab::read_i32(self.buf, self.regions().valid_ids + index * 4)
    }

    /// Destination and next-link of an edge pool record.
    pub(crate) fn edge_record(&self, node: usize) -> Result<(i32, i32)> {
        let view = self.pool_view()?;
        let slot = view.slot(node)?;
        let dest = i32::from_le_bytes(slot[EREC_DEST..EREC_DEST + 4].try_into().unwrap());
        let next = i32::from_le_bytes(slot[EREC_NEXT..EREC_NEXT + 4].try_into().unwrap());
        Ok((dest, next))
    }

    fn pool_view(&self) -> Result<PoolView<'_>> {
        let start = self.regions().pool;
        let end = self.buffer_size();
        PoolView::attach(&self.buf[start..end])
    }

    fn pool_mut(&mut self) -> Result<Pool<'_>> {
        let start = self.regions().pool;
        let end = self.buffer_size();
        Pool::attach(&mut self.buf[start..end])
    }

    fn find_arc(&self, src_slot: usize, dst_id: i32) -> Result<Option<(Option<usize>, usize)>> {
        let mut prev = None;
        let mut cursor = self.edge_head_raw(src_slot);
        while cursor != NIL {
            let (dest, next) = self.edge_record(cursor as usize)?;
            if dest == dst_id {
                return Ok(Some((prev, cursor as usize)));
            }
            prev = Some(cursor as usize);
            cursor = next;
        }
        Ok(None)
    }

    fn link_arc(&mut self, src_slot: usize, dst_id: i32) -> Result<()> {
        let head = self.edge_head_raw(src_slot);
        let node = {
            let mut pool = self.pool_mut()?;
            let node = pool.alloc()?;
            let rec = pool.slot_mut(node)?;
            rec[0..4].copy_from_slice(&dst_id.to_le_bytes());
            rec[4..8].copy_from_slice(&head.to_le_bytes());
            rec[8..12].fill(0);
            node
        };
        self.set_edge_head_raw(src_slot, node as i32);
        let degree = self.degree_raw(src_slot);
        self.set_degree_raw(src_slot, degree + 1);
        Ok(())
    }

    fn unlink_arc(&mut self, src_slot: usize, dst_id: i32) -> Result<()> {
        let (prev, node) = self
            .find_arc(src_slot, dst_id)?
            .ok_or(GravaError::Failed("no such edge"))?;
        let (_, next) = self.edge_record(node)?;
        match prev {
            None => self.set_edge_head_raw(src_slot, next),
            Some(p) => {
                let mut pool = self.pool_mut()?;
                let rec = pool.slot_mut(p)?;
                rec[EREC_NEXT..EREC_NEXT + 4].copy_from_slice(&next.to_le_bytes());
            }
        }
        self.pool_mut()?.free(node)?;
        let degree = self.degree_raw(src_slot);
        self.set_degree_raw(src_slot, degree - 1);
        Ok(())
    }

    fn dec_edge_count(&mut self) {
        let count = slab::read_u32(self.buf, fields::EDGE_COUNT.start);
        slab::write_u32(self.buf, fields::EDGE_COUNT.start, count - 1);
    }

    fn bump_generation(&mut self) {
        let generation = slab::read_u32(self.buf, fields::GENERATION.start);
        slab::write_u32(self.buf, fields::GENERATION.start, generation.wrapping_add(1));
    }
}

/// Iterator over live vertex ids. See [`Graph::vertices`].
pub struct Vertices<'g, 'b> {
    graph: &'g Graph<'b>,
    index: usize,
}

impl Iterator for Vertices<'_, '_> {
    type Item = VertexId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.graph.vertex_count() {
            return None;
        }
        let id = self.graph.valid_id_at(self.index);
        self.index += 1;
        Some(VertexId(id))
    }
}

/// Iterator over one vertex's outgoing edge destinations. See
/// [`Graph::neighbors`].
pub struct Neighbors<'g, 'b> {
    graph: &'g Graph<'b>,
    cursor: i32,
}

impl Iterator for Neighbors<'_, '_> {
    type Item = VertexId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let (dest, next) = self.graph.edge_record(self.cursor as usize).ok()?;
        self.cursor = next;
        Some(VertexId(dest))
    }
}
