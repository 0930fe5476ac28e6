//! Array-backed LIFO of [`Datum`] over a caller buffer.

use crate::error::{GravaError, Result};
use crate::slab::{self, SlabKind};
use crate::types::Datum;

mod fields {
    use core::ops::Range;

    pub const CAPACITY: Range<usize> = 12..16;
    pub const TOP: Range<usize> = 16..20;
}

const ELEMS: usize = 20;

pub struct Stack<'b> {
    buf: &'b mut [u8],
}

pub fn compute_buffer_size(capacity: usize) -> Result<usize> {
    if capacity < 1 {
        return Err(GravaError::Invalid("capacity must be at least 1"));
    }
    if capacity > i32::MAX as usize {
        return Err(GravaError::Invalid("capacity exceeds index range"));
    }
    capacity
        .checked_mul(4)
        .and_then(|elems| elems.checked_add(ELEMS))
        .filter(|&total| total <= u32::MAX as usize)
        .ok_or(GravaError::Invalid("stack size overflows"))
}

impl<'b> Stack<'b> {
    pub fn create(capacity: usize, buf: &'b mut [u8]) -> Result<Self> {
        let total = compute_buffer_size(capacity)?;
        slab::check_create_buffer(buf, total)?;
        slab::write_header(buf, SlabKind::Stack, total as u32);
        slab::write_u32(buf, fields::CAPACITY.start, capacity as u32);
        slab::write_u32(buf, fields::TOP.start, 0);
        Ok(Self { buf })
    }

    pub fn attach(buf: &'b mut [u8]) -> Result<Self> {
        let recorded = slab::check_header(buf, SlabKind::Stack)?;
        if recorded < ELEMS {
            return Err(GravaError::Corruption("stack header truncated"));
        }
        let capacity = slab::read_u32(buf, fields::CAPACITY.start) as usize;
        let expected = compute_buffer_size(capacity)
            .map_err(|_| GravaError::Corruption("stack header fields out of range"))?;
        if expected != recorded {
            return Err(GravaError::Corruption("stack recorded size mismatch"));
        }
        if slab::read_u32(buf, fields::TOP.start) as usize > capacity {
            return Err(GravaError::Corruption("stack top out of range"));
        }
        Ok(Self { buf })
    }

    pub fn relocate(src: &[u8], dst: &'b mut [u8]) -> Result<Self> {
        slab::copy_object(src, dst, SlabKind::Stack)?;
        Self::attach(dst)
    }

    pub fn push(&mut self, elem: Datum) -> Result<()> {
        let top = slab::read_u32(self.buf, fields::TOP.start) as usize;
        if top == self.capacity() {
            return Err(GravaError::Failed("stack is full"));
        }
        slab::write_u32(self.buf, ELEMS + top * 4, elem.bits());
        slab::write_u32(self.buf, fields::TOP.start, top as u32 + 1);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Datum> {
        let top = slab::read_u32(self.buf, fields::TOP.start) as usize;
        if top == 0 {
            return Err(GravaError::Failed("stack is empty"));
        }
        let bits = slab::read_u32(self.buf, ELEMS + (top - 1) * 4);
        slab::write_u32(self.buf, fields::TOP.start, top as u32 - 1);
        Ok(Datum::from_bits(bits))
    }

    pub fn len(&self) -> usize {
        slab::read_u32(self.buf, fields::TOP.start) as usize
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
}
