#![forbid(unsafe_code)]
//! Layout constants and core types for the VSFS image format.
//!
//! VSFS is a fixed-geometry filesystem: 64 blocks of 4096 bytes, with the
//! superblock, both bitmaps, and the inode table at hard-wired positions.
//! Everything here is pure: the geometry, the unit-carrying index types,
//! and the little-endian read helpers the rest of the workspace builds on.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ── Geometry constants ──────────────────────────────────────────────────────

/// Superblock magic value.
pub const VSFS_MAGIC: u16 = 0xD34D;

/// Bytes per block.
pub const BLOCK_SIZE: usize = 4096;
/// Blocks in the image.
pub const TOTAL_BLOCKS: u32 = 64;
/// Exact byte length of a VSFS image.
pub const IMAGE_SIZE: usize = BLOCK_SIZE * TOTAL_BLOCKS as usize;

/// Bytes per inode record.
pub const INODE_SIZE: usize = 256;
/// Inode records per inode-table block.
pub const INODES_PER_BLOCK: u32 = 16;
/// Blocks occupied by the inode table.
pub const INODE_TABLE_BLOCKS: u32 = 5;
/// Inode records in the table.
pub const INODE_COUNT: u32 = INODES_PER_BLOCK * INODE_TABLE_BLOCKS;

pub const SUPERBLOCK_BLOCK: u32 = 0;
pub const INODE_BITMAP_BLOCK: u32 = 1;
pub const DATA_BITMAP_BLOCK: u32 = 2;
pub const INODE_TABLE_START: u32 = 3;
/// First block of the data region.
pub const FIRST_DATA_BLOCK: u32 = 8;
/// Blocks in the data region.
pub const DATA_BLOCK_COUNT: u32 = TOTAL_BLOCKS - FIRST_DATA_BLOCK;

/// Width of one indirect-block entry.
pub const POINTER_SIZE: usize = 4;
/// Entries per indirect block.
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / POINTER_SIZE;

// ── Newtypes ────────────────────────────────────────────────────────────────

/// Absolute block number within the image.
///
/// Pointer fields store these as raw u32s; out-of-image values can and do
/// occur in corrupt images, so nothing here is range-validated at
/// construction. The predicates below classify a value instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockNumber(pub u32);

impl BlockNumber {
    /// Whether this block lies inside the image at all.
    #[must_use]
    pub fn in_image(self) -> bool {
        self.0 < TOTAL_BLOCKS
    }

    /// Whether this block lies in the data region [8, 64).
    #[must_use]
    pub fn is_data(self) -> bool {
        (FIRST_DATA_BLOCK..TOTAL_BLOCKS).contains(&self.0)
    }

    /// Data-bitmap bit index for this block, if it is a data block.
    #[must_use]
    pub fn data_slot(self) -> Option<u32> {
        self.is_data().then(|| self.0 - FIRST_DATA_BLOCK)
    }

    /// Block number for a data-bitmap bit index.
    #[must_use]
    pub fn from_data_slot(slot: u32) -> Self {
        Self(FIRST_DATA_BLOCK + slot)
    }

    /// Byte offset of this block within the image buffer.
    ///
    /// Only meaningful for in-image blocks; callers gate on `in_image`.
    #[must_use]
    pub fn byte_offset(self) -> usize {
        self.0 as usize * BLOCK_SIZE
    }
}

impl fmt::Display for BlockNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-based index into the 80-entry inode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InodeIndex(pub u32);

impl InodeIndex {
    /// Whether this index addresses a real table entry.
    #[must_use]
    pub fn in_table(self) -> bool {
        self.0 < INODE_COUNT
    }

    /// Byte offset of this inode's record within the image buffer.
    #[must_use]
    pub fn byte_offset(self) -> usize {
        INODE_TABLE_START as usize * BLOCK_SIZE + self.0 as usize * INODE_SIZE
    }

    /// All table indices in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..INODE_COUNT).map(Self)
    }
}

impl fmt::Display for InodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Parse errors & read helpers ─────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("insufficient data: need {needed} bytes at offset {offset}, got {actual}")]
    InsufficientData {
        needed: usize,
        offset: usize,
        actual: usize,
    },
}

#[inline]
pub fn ensure_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], ParseError> {
    let end = offset.saturating_add(len);
    if end > data.len() {
        return Err(ParseError::InsufficientData {
            needed: len,
            offset,
            actual: data.len().saturating_sub(offset),
        });
    }
    Ok(&data[offset..end])
}

#[inline]
pub fn read_le_u16(data: &[u8], offset: usize) -> Result<u16, ParseError> {
    let bytes = ensure_slice(data, offset, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

#[inline]
pub fn read_le_u32(data: &[u8], offset: usize) -> Result<u32, ParseError> {
    let bytes = ensure_slice(data, offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
