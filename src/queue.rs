//! Ring-buffer FIFO of [`Datum`] over a caller buffer.

use crate::error::{GravaError, Result};
use crate::slab::{self, SlabKind};
use crate::types::Datum;

mod fields {
    use core::ops::Range;

    pub const CAPACITY: Range<usize> = 12..16;
    pub const HEAD: Range<usize> = 16..20;
    pub const TAIL: Range<usize> = 20..24;
}

const RING: usize = 24;

// The ring holds capacity+1 cells; the cell at tail is always empty.
// head == tail means empty; head == (tail+1) % cells means full.

pub struct Queue<'b> {
    buf: &'b mut [u8],
}

pub fn compute_buffer_size(capacity: usize) -> Result<usize> {
    if capacity < 1 {
        return Err(GravaError::Invalid("capacity must be at least 1"));
    }
    if capacity > i32::MAX as usize - 1 {
        return Err(GravaError::Invalid("capacity exceeds index range"));
    }
    (capacity + 1)
        .checked_mul(4)
        .and_then(|ring| ring.checked_add(RING))
        .filter(|&total| total <= u32::MAX as usize)
        .ok_or(GravaError::Invalid("queue size overflows"))
}

impl<'b> Queue<'b> {
    pub fn create(capacity: usize, buf: &'b mut [u8]) -> Result<Self> {
        let total = compute_buffer_size(capacity)?;
        slab::check_create_buffer(buf, total)?;
        slab::write_header(buf, SlabKind::Queue, total as u32);
        slab::write_u32(buf, fields::CAPACITY.start, capacity as u32);
        slab::write_u32(buf, fields::HEAD.start, 0);
        slab::write_u32(buf, fields::TAIL.start, 0);
        Ok(Self { buf })
    }

    pub fn attach(buf: &'b mut [u8]) -> Result<Self> {
        let recorded = slab::check_header(buf, SlabKind::Queue)?;
        if recorded < RING {
            return Err(GravaError::Corruption("queue header truncated"));
        }
        let capacity = slab::read_u32(buf, fields::CAPACITY.start) as usize;
        let expected = compute_buffer_size(capacity)
            .map_err(|_| GravaError::Corruption("queue header fields out of range"))?;
        if expected != recorded {
            return Err(GravaError::Corruption("queue recorded size mismatch"));
        }
        let cells = (capacity + 1) as u32;
        if slab::read_u32(buf, fields::HEAD.start) >= cells
            || slab::read_u32(buf, fields::TAIL.start) >= cells
        {
            return Err(GravaError::Corruption("queue cursor out of range"));
        }
        Ok(Self { buf })
    }

    pub fn relocate(src: &[u8], dst: &'b mut [u8]) -> Result<Self> {
        slab::copy_object(src, dst, SlabKind::Queue)?;
        Self::attach(dst)
    }

    pub fn push(&mut self, elem: Datum) -> Result<()> {
        if self.is_full() {
            return Err(GravaError::Failed("queue is full"));
        }
        let cells = self.cells();
        let tail = slab::read_u32(self.buf, fields::TAIL.start);
        slab::write_u32(self.buf, RING + tail as usize * 4, elem.bits());
        slab::write_u32(self.buf, fields::TAIL.start, (tail + 1) % cells);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Datum> {
        if self.is_empty() {
            return Err(GravaError::Failed("queue is empty"));
        }
        let cells = self.cells();
        let head = slab::read_u32(self.buf, fields::HEAD.start);
        let bits = slab::read_u32(self.buf, RING + head as usize * 4);
        slab::write_u32(self.buf, fields::HEAD.start, (head + 1) % cells);
        Ok(Datum::from_bits(bits))
    }

    pub fn len(&self) -> usize {
        let cells = self.cells();
        let head = slab::read_u32(self.buf, fields::HEAD.start);
        let tail = slab::read_u32(self.buf, fields::TAIL.start);
        ((tail + cells - head) % cells) as usize
    }

    pub fn is_empty(&self) -> bool {
        slab::read_u32(self.buf, fields::HEAD.start) == slab::read_u32(self.buf, fields::TAIL.start)
    }

    pub fn is_full(&self) -> bool {
        let cells = self.cells();
        let head = slab::read_u32(self.buf, fields::HEAD.start);
        let tail = slab::read_u32(self.buf, fields::TAIL.start);
        head == (tail + 1) % cells
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

    fn cells(&self) -> u32 {
        self.capacity() as u32 + 1
    }
}
