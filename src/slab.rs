//! Shared buffer protocol for every container in the crate.
//!
//! Each object lives entirely inside one caller-provided byte buffer. The
//! buffer starts with a fixed header (magic, format version, object kind,
//! recorded size) followed by the object's field block and arrays. All
//! multi-byte fields are little-endian and sit at 4-byte-aligned offsets,
//! so a buffer can be copied to another address and re-attached without any
//! fix-up pass: every internal link is an index, never a pointer.

use crate::error::{GravaError, Result};

pub(crate) const MAGIC: [u8; 4] = *b"GRVA";
pub(crate) const FORMAT_VERSION: u16 = 1;
pub(crate) const HDR_LEN: usize = 12;
pub(crate) const ALIGN: usize = 4;

pub(crate) mod header {
    //! Byte offsets for the shared header fields.
    use core::ops::Range;

    pub const MAGIC: Range<usize> = 0..4;
    pub const FORMAT_VERSION: Range<usize> = 4..6;
    pub const KIND: usize = 6;
    pub const RESERVED: usize = 7;
    pub const RECORDED_SIZE: Range<usize> = 8..12;
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum SlabKind {
    Pool = 1,
    Heap = 2,
    Queue = 3,
    Stack = 4,
    Graph = 5,
    Bfs = 6,
    Dfs = 7,
}

impl SlabKind {
    pub(crate) const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for SlabKind {
    type Error = GravaError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(SlabKind::Pool),
            2 => Ok(SlabKind::Heap),
            3 => Ok(SlabKind::Queue),
            4 => Ok(SlabKind::Stack),
            5 => Ok(SlabKind::Graph),
            6 => Ok(SlabKind::Bfs),
            7 => Ok(SlabKind::Dfs),
            _ => Err(GravaError::Corruption("unknown object kind")),
        }
    }
}

pub(crate) fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(buf[off..off + 4].try_into().unwrap())
}

pub(crate) fn write_u32(buf: &mut [u8], off: usize, value: u32) {
    buf[off..off + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn read_i32(buf: &[u8], off: usize) -> i32 {
    i32::from_le_bytes(buf[off..off + 4].try_into().unwrap())
}

pub(crate) fn write_i32(buf: &mut [u8], off: usize, value: i32) {
    buf[off..off + 4].copy_from_slice(&value.to_le_bytes());
}

/// Rejects a creation buffer that is misaligned or smaller than `required`.
pub(crate) fn check_create_buffer(buf: &[u8], required: usize) -> Result<()> {
    if buf.as_ptr() as usize % ALIGN != 0 {
        return Err(GravaError::Invalid("buffer is not 4-byte aligned"));
    }
    if buf.len() < required {
        return Err(GravaError::Invalid("buffer smaller than computed size"));
    }
    Ok(())
}

/// Stamps the shared header at the start of a freshly created object.
pub(crate) fn write_header(buf: &mut [u8], kind: SlabKind, recorded_size: u32) {
    buf[header::MAGIC].copy_from_slice(&MAGIC);
    buf[header::FORMAT_VERSION].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf[header::KIND] = kind.as_u8();
    buf[header::RESERVED] = 0;
    buf[header::RECORDED_SIZE].copy_from_slice(&recorded_size.to_le_bytes());
}

/// Validates the shared header of a buffer being attached and returns the
/// recorded size. The buffer must be at least that long.
pub(crate) fn check_header(buf: &[u8], kind: SlabKind) -> Result<usize> {
    if buf.as_ptr() as usize % ALIGN != 0 {
        return Err(GravaError::Invalid("buffer is not 4-byte aligned"));
    }
    if buf.len() < HDR_LEN {
        return Err(GravaError::Corruption("buffer shorter than object header"));
    }
    if buf[header::MAGIC] != MAGIC {
        return Err(GravaError::Corruption("bad object magic"));
    }
    let version = u16::from_le_bytes(buf[header::FORMAT_VERSION].try_into().unwrap());
    if version != FORMAT_VERSION {
        return Err(GravaError::Corruption("unsupported format version"));
    }
    let found = SlabKind::try_from(buf[header::KIND])?;
    if found != kind {
        return Err(GravaError::Corruption("object kind mismatch"));
    }
    let recorded = read_u32(buf, header::RECORDED_SIZE.start) as usize;
    if recorded < HDR_LEN {
        return Err(GravaError::Corruption("recorded size shorter than header"));
    }
    if buf.len() < recorded {
        return Err(GravaError::Corruption("buffer shorter than recorded size"));
    }
    Ok(recorded)
}

/// Copies the recorded prefix of `src` into `dst`. Shared first step of
/// every `relocate`; the caller re-attaches `dst` afterwards.
pub(crate) fn copy_object(src: &[u8], dst: &mut [u8], kind: SlabKind) -> Result<usize> {
    let recorded = check_header(src, kind)?;
    check_create_buffer(dst, recorded)?;
    dst[..recorded].copy_from_slice(&src[..recorded]);
    Ok(recorded)
}

/// Size in bytes of a bitset covering `count` entries, rounded up to whole
/// 32-bit words.
pub(crate) const fn bitset_len(count: usize) -> usize {
    count.div_ceil(32) * 4
}

pub(crate) fn bitset_get(buf: &[u8], base: usize, index: usize) -> bool {
    let word = read_u32(buf, base + (index / 32) * 4);
    word & (1 << (index % 32)) != 0
}

pub(crate) fn bitset_set(buf: &mut [u8], base: usize, index: usize) {
    let off = base + (index / 32) * 4;
    let word = read_u32(buf, off);
    write_u32(buf, off, word | (1 << (index % 32)));
}
