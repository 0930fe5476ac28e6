//! Array-backed binary min-heap of `(key, value)` [`Datum`] pairs.
//!
//! The node array is 1-based; node N's children are 2N and 2N+1 and its
//! parent is N/2, so entry 0 of the array is never used. The ordering comes
//! from a caller-supplied [`KeyOrder`] capability held in the handle, never
//! in the buffer: a serialized heap encodes only data, and `attach` and
//! `relocate` take the comparator again.

use std::cmp::Ordering;

use crate::error::{GravaError, Result};
use crate::slab::{self, SlabKind};
use crate::types::Datum;

/// Total order over heap keys.
///
/// `Ordering::Less` means `a` has higher priority than `b` and belongs
/// nearer the root. Closures of the right shape implement this directly.
pub trait KeyOrder {
    fn cmp_keys(&self, a: Datum, b: Datum) -> Ordering;
}

impl<F> KeyOrder for F
where
    F: Fn(Datum, Datum) -> Ordering,
{
    fn cmp_keys(&self, a: Datum, b: Datum) -> Ordering {
        self(a, b)
    }
}

/// Orders keys by their signed-integer view, smallest first.
#[derive(Copy, Clone, Debug, Default)]
pub struct IntAscending;

impl KeyOrder for IntAscending {
    fn cmp_keys(&self, a: Datum, b: Datum) -> Ordering {
        a.as_int().cmp(&b.as_int())
    }
}

/// Orders keys by their float view, smallest first, NaN sorting last.
#[derive(Copy, Clone, Debug, Default)]
pub struct FloatAscending;

impl KeyOrder for FloatAscending {
    fn cmp_keys(&self, a: Datum, b: Datum) -> Ordering {
        a.as_float().total_cmp(&b.as_float())
    }
}

mod fields {
    use core::ops::Range;

    pub const CAPACITY: Range<usize> = 12..16;
    pub const NEXT_EMPTY: Range<usize> = 16..20;
}

const NODES: usize = 20;
const NODE_LEN: usize = 8;
const ROOT: usize = 1;

pub struct MinHeap<'b, C> {
    buf: &'b mut [u8],
    cmp: C,
}

pub fn compute_buffer_size(capacity: usize) -> Result<usize> {
    if capacity < 1 {
        return Err(GravaError::Invalid("capacity must be at least 1"));
    }
    if capacity > i32::MAX as usize - 1 {
        return Err(GravaError::Invalid("capacity exceeds index range"));
    }
    (capacity + ROOT)
        .checked_mul(NODE_LEN)
        .and_then(|nodes| nodes.checked_add(NODES))
        .filter(|&total| total <= u32::MAX as usize)
        .ok_or(GravaError::Invalid("heap size overflows"))
}

impl<'b, C: KeyOrder> MinHeap<'b, C> {
    pub fn create(capacity: usize, cmp: C, buf: &'b mut [u8]) -> Result<Self> {
        let total = compute_buffer_size(capacity)?;
        slab::check_create_buffer(buf, total)?;
        slab::write_header(buf, SlabKind::Heap, total as u32);
        slab::write_u32(buf, fields::CAPACITY.start, capacity as u32);
        slab::write_u32(buf, fields::NEXT_EMPTY.start, ROOT as u32);
        Ok(Self { buf, cmp })
    }

    pub fn attach(buf: &'b mut [u8], cmp: C) -> Result<Self> {
        let recorded = slab::check_header(buf, SlabKind::Heap)?;
        if recorded < NODES {
            return Err(GravaError::Corruption("heap header truncated"));
        }
        let capacity = slab::read_u32(buf, fields::CAPACITY.start) as usize;
        let expected = compute_buffer_size(capacity)
            .map_err(|_| GravaError::Corruption("heap header fields out of range"))?;
        if expected != recorded {
            return Err(GravaError::Corruption("heap recorded size mismatch"));
        }
        let next_empty = slab::read_u32(buf, fields::NEXT_EMPTY.start) as usize;
        if next_empty < ROOT || next_empty > capacity + ROOT {
            return Err(GravaError::Corruption("heap next-empty out of range"));
        }
        Ok(Self { buf, cmp })
    }

    pub fn relocate(src: &[u8], dst: &'b mut [u8], cmp: C) -> Result<Self> {
        slab::copy_object(src, dst, SlabKind::Heap)?;
        Self::attach(dst, cmp)
    }

    /// Appends and bubbles up until the parent key no longer compares
    /// greater. Fails when the heap is full.
    pub fn insert(&mut self, key: Datum, value: Datum) -> Result<()> {
        if self.len() >= self.capacity() {
            return Err(GravaError::Failed("heap is full"));
        }
        let mut child = self.next_empty();
        self.set_next_empty(child + 1);
        self.write_node(child, key, value);
        while child > ROOT {
            let parent = child / 2;
            if self.cmp.cmp_keys(self.key(parent), self.key(child)) != Ordering::Greater {
                break;
            }
            self.swap_nodes(parent, child);
            child = parent;
        }
        Ok(())
    }

    /// Returns the root pair without removing it.
    pub fn peek(&self) -> Result<(Datum, Datum)> {
        if self.is_empty() {
            return Err(GravaError::Failed("heap is empty"));
        }
        Ok((self.key(ROOT), self.value(ROOT)))
    }

    /// Removes and returns the root pair, restoring heap order by bubbling
    /// the relocated tail node down. Ties do not swap.
    pub fn pop(&mut self) -> Result<(Datum, Datum)> {
        if self.is_empty() {
            return Err(GravaError::Failed("heap is empty"));
        }
        let out = (self.key(ROOT), self.value(ROOT));
        let last = self.next_empty() - 1;
        let (k, v) = (self.key(last), self.value(last));
        self.write_node(ROOT, k, v);
        self.set_next_empty(last);
        let mut parent = ROOT;
        loop {
            let left = parent * 2;
            if left >= self.next_empty() {
                break;
            }
            let mut min = parent;
            if self.cmp.cmp_keys(self.key(left), self.key(min)) == Ordering::Less {
                min = left;
            }
            let right = left + 1;
            if right < self.next_empty()
                && self.cmp.cmp_keys(self.key(right), self.key(min)) == Ordering::Less
            {
                min = right;
            }
            if min == parent {
                break;
            }
            self.swap_nodes(parent, min);
            parent = min;
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.next_empty() - ROOT
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        slab::read_u32(self.buf, fields::CAPACITY.start) as usize
    }

    pub fn buffer_size(&self) -> usize {
        slab::read_u32(self.buf, slab::header::RECORDED_SIZE.start) as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.buffer_size()]
    }

    /// Structural check: the cursor is in range and every non-root node's
    /// key compares no less than its parent's.
    pub fn validate(&self) -> Result<()> {
        let next_empty = self.next_empty();
        if next_empty < ROOT || next_empty > self.capacity() + ROOT {
            return Err(GravaError::Invalid("heap next-empty out of range"));
        }
        for node in ROOT + 1..next_empty {
            let parent = node / 2;
            if self.cmp.cmp_keys(self.key(parent), self.key(node)) == Ordering::Greater {
                return Err(GravaError::Invalid("heap order violated"));
            }
        }
        Ok(())
    }

    fn next_empty(&self) -> usize {
        slab::read_u32(self.buf, fields::NEXT_EMPTY.start) as usize
    }

    fn set_next_empty(&mut self, value: usize) {
        slab::write_u32(self.buf, fields::NEXT_EMPTY.start, value as u32);
    }

    fn key(&self, node: usize) -> Datum {
        Datum::from_bits(slab::read_u32(self.buf, NODES + node * NODE_LEN))
    }

    fn value(&self, node: usize) -> Datum {
        Datum::from_bits(slab::read_u32(self.buf, NODES + node * NODE_LEN + 4))
    }

    fn write_node(&mut self, node: usize, key: Datum, value: Datum) {
        slab::write_u32(self.buf, NODES + node * NODE_LEN, key.bits());
        slab::write_u32(self.buf, NODES + node * NODE_LEN + 4, value.bits());
    }

    fn swap_nodes(&mut self, a: usize, b: usize) {
        let (ak, av) = (self.key(a), self.value(a));
        let (bk, bv) = (self.key(b), self.value(b));
        self.write_node(a, bk, bv);
        self.write_node(b, ak, av);
    }
}
