//! Fixed-size-block allocator over a caller buffer.
//!
//! Free slots form a singly-linked free-list threaded through the first four
//! bytes of each free slot, encoded as a slot index with −1 for end-of-list.
//! Alloc and free are both O(1). The minimum element size is four bytes so
//! the link always fits.

use tracing::debug;

use crate::error::{GravaError, Result};
use crate::slab::{self, SlabKind};

/// Smallest allowed element size; a free slot must hold its list link.
pub const MIN_ELEMENT_SIZE: usize = 4;

mod fields {
    use core::ops::Range;

    pub const ELEMENT_SIZE: Range<usize> = 12..16;
    pub const CAPACITY: Range<usize> = 16..20;
    pub const FREE_HEAD: Range<usize> = 20..24;
    pub const FREE_COUNT: Range<usize> = 24..28;
}

const SLOTS: usize = 28;
const NIL: i32 = -1;

/// Mutable view of a pool allocator: alloc, free, slot writes.
pub struct Pool<'b> {
    buf: &'b mut [u8],
}

/// Read-only view of a pool allocator living in a shared byte slice.
pub struct PoolView<'b> {
    buf: &'b [u8],
}

/// Exact byte count a pool with the given shape requires.
pub fn compute_buffer_size(element_size: usize, capacity: usize) -> Result<usize> {
    if element_size < MIN_ELEMENT_SIZE {
        return Err(GravaError::Invalid("element size below free-list minimum"));
    }
    if capacity < 1 {
        return Err(GravaError::Invalid("capacity must be at least 1"));
    }
    if element_size > u32::MAX as usize || capacity > i32::MAX as usize {
        return Err(GravaError::Invalid("pool shape exceeds index range"));
    }
    capacity
        .checked_mul(element_size)
        .and_then(|slots| slots.checked_add(SLOTS))
        .filter(|&total| total <= u32::MAX as usize)
        .ok_or(GravaError::Invalid("pool size overflows"))
}

fn slot_start(index: usize, element_size: usize) -> usize {
    SLOTS + index * element_size
}

impl<'b> Pool<'b> {
    /// Lays the pool out in `buf` with every slot on the free-list.
    pub fn create(element_size: usize, capacity: usize, buf: &'b mut [u8]) -> Result<Self> {
        let total = compute_buffer_size(element_size, capacity)?;
        slab::check_create_buffer(buf, total)?;
        slab::write_header(buf, SlabKind::Pool, total as u32);
        slab::write_u32(buf, fields::ELEMENT_SIZE.start, element_size as u32);
        slab::write_u32(buf, fields::CAPACITY.start, capacity as u32);
        slab::write_i32(buf, fields::FREE_HEAD.start, 0);
        slab::write_u32(buf, fields::FREE_COUNT.start, capacity as u32);
        for i in 0..capacity {
            let next = if i + 1 < capacity { (i + 1) as i32 } else { NIL };
            slab::write_i32(buf, slot_start(i, element_size), next);
        }
        debug!(element_size, capacity, "created pool");
        Ok(Self { buf })
    }

    /// Re-opens a buffer that already contains a pool.
    pub fn attach(buf: &'b mut [u8]) -> Result<Self> {
        check_attach(buf)?;
        Ok(Self { buf })
    }

    /// Copies the pool stored in `src` into `dst` and attaches it. The old
    /// buffer is logically dead afterwards.
    pub fn relocate(src: &[u8], dst: &'b mut [u8]) -> Result<Self> {
        slab::copy_object(src, dst, SlabKind::Pool)?;
        Self::attach(dst)
    }

    /// Claims a free slot. Fails when every slot is outstanding.
    pub fn alloc(&mut self) -> Result<usize> {
        let head = slab::read_i32(self.buf, fields::FREE_HEAD.start);
        if head == NIL {
            return Err(GravaError::Failed("pool exhausted"));
        }
        let element_size = read_element_size(self.buf);
        let next = slab::read_i32(self.buf, slot_start(head as usize, element_size));
        slab::write_i32(self.buf, fields::FREE_HEAD.start, next);
        let free = slab::read_u32(self.buf, fields::FREE_COUNT.start);
        slab::write_u32(self.buf, fields::FREE_COUNT.start, free - 1);
        Ok(head as usize)
    }

    /// Returns a slot to the free-list.
    ///
    /// Freeing a slot that is already free corrupts the free-list; like the
    /// range check on `index`, that is the only validation performed.
    pub fn free(&mut self, index: usize) -> Result<()> {
        if index >= read_capacity(self.buf) {
            return Err(GravaError::Invalid("slot index out of range"));
        }
        let element_size = read_element_size(self.buf);
        let head = slab::read_i32(self.buf, fields::FREE_HEAD.start);
        slab::write_i32(self.buf, slot_start(index, element_size), head);
        slab::write_i32(self.buf, fields::FREE_HEAD.start, index as i32);
        let free = slab::read_u32(self.buf, fields::FREE_COUNT.start);
        slab::write_u32(self.buf, fields::FREE_COUNT.start, free + 1);
        Ok(())
    }

    pub fn slot(&self, index: usize) -> Result<&[u8]> {
        slot_bytes(self.buf, index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Result<&mut [u8]> {
        let element_size = read_element_size(self.buf);
        if index >= read_capacity(self.buf) {
            return Err(GravaError::Invalid("slot index out of range"));
        }
        let start = slot_start(index, element_size);
        Ok(&mut self.buf[start..start + element_size])
    }

    pub fn element_size(&self) -> usize {
        read_element_size(self.buf)
    }

    pub fn capacity(&self) -> usize {
        read_capacity(self.buf)
    }

    pub fn free_count(&self) -> usize {
        slab::read_u32(self.buf, fields::FREE_COUNT.start) as usize
    }

    pub fn buffer_size(&self) -> usize {
        slab::read_u32(self.buf, slab::header::RECORDED_SIZE.start) as usize
    }

    /// The serialized form: exactly the recorded prefix of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.buffer_size()]
    }

    /// Structural check of the free-list: bounded walk, indices in range,
    /// length matching the free count.
    pub fn validate(&self) -> Result<()> {
        validate_pool(self.buf)
    }
}

impl<'b> PoolView<'b> {
    pub fn attach(buf: &'b [u8]) -> Result<Self> {
        check_attach(buf)?;
        Ok(Self { buf })
    }

    pub fn slot(&self, index: usize) -> Result<&[u8]> {
        slot_bytes(self.buf, index)
    }

    pub fn element_size(&self) -> usize {
        read_element_size(self.buf)
    }

    pub fn capacity(&self) -> usize {
        read_capacity(self.buf)
    }

    pub fn free_count(&self) -> usize {
        slab::read_u32(self.buf, fields::FREE_COUNT.start) as usize
    }

    pub fn validate(&self) -> Result<()> {
        validate_pool(self.buf)
    }
}

fn read_element_size(buf: &[u8]) -> usize {
    slab::read_u32(buf, fields::ELEMENT_SIZE.start) as usize
}

fn read_capacity(buf: &[u8]) -> usize {
    slab::read_u32(buf, fields::CAPACITY.start) as usize
}

fn slot_bytes(buf: &[u8], index: usize) -> Result<&[u8]> {
    if index >= read_capacity(buf) {
        return Err(GravaError::Invalid("slot index out of range"));
    }
    let element_size = read_element_size(buf);
    let start = slot_start(index, element_size);
    Ok(&buf[start..start + element_size])
}

fn check_attach(buf: &[u8]) -> Result<()> {
    let recorded = slab::check_header(buf, SlabKind::Pool)?;
    if recorded < SLOTS {
        return Err(GravaError::Corruption("pool header truncated"));
    }
    let element_size = read_element_size(buf);
    let capacity = read_capacity(buf);
    let expected = compute_buffer_size(element_size, capacity)
        .map_err(|_| GravaError::Corruption("pool header fields out of range"))?;
    if expected != recorded {
        return Err(GravaError::Corruption("pool recorded size mismatch"));
    }
    let head = slab::read_i32(buf, fields::FREE_HEAD.start);
    if head < NIL || head >= capacity as i32 {
        return Err(GravaError::Corruption("pool free head out of range"));
    }
    if slab::read_u32(buf, fields::FREE_COUNT.start) as usize > capacity {
        return Err(GravaError::Corruption("pool free count exceeds capacity"));
    }
    Ok(())
}

fn validate_pool(buf: &[u8]) -> Result<()> {
    let element_size = read_element_size(buf);
    let capacity = read_capacity(buf);
    let free_count = slab::read_u32(buf, fields::FREE_COUNT.start) as usize;
    let mut cursor = slab::read_i32(buf, fields::FREE_HEAD.start);
    let mut walked = 0usize;
    while cursor != NIL {
        if cursor < 0 || cursor as usize >= capacity {
            return Err(GravaError::Invalid("free-list index out of range"));
        }
        walked += 1;
        if walked > free_count {
            return Err(GravaError::Invalid("free-list longer than free count"));
        }
        cursor = slab::read_i32(buf, slot_start(cursor as usize, element_size));
    }
    if walked != free_count {
        return Err(GravaError::Invalid("free-list shorter than free count"));
    }
    Ok(())
}
