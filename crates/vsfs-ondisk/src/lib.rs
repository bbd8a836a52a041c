#![forbid(unsafe_code)]
//! On-disk record parsing and encoding for VSFS.
//!
//! Pure parsing crate — no I/O, no side effects. Parses byte regions into
//! typed superblock and inode records and patches them back. Encoding
//! writes only the defined field bytes: the superblock's reserved tail and
//! the inode record's reserved tail are never touched, so repair preserves
//! them verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use vsfs_types::{
    BLOCK_SIZE, DATA_BITMAP_BLOCK, FIRST_DATA_BLOCK, INODE_BITMAP_BLOCK, INODE_COUNT, INODE_SIZE,
    INODE_TABLE_START, ParseError, TOTAL_BLOCKS, VSFS_MAGIC, read_le_u16, read_le_u32,
};

// ── Superblock ──────────────────────────────────────────────────────────────

// Field offsets within block 0. The u32 fields start at offset 4; bytes 2–3
// are dead space and bytes 36.. are reserved.
const SB_MAGIC: usize = 0;
const SB_BLOCK_SIZE: usize = 4;
const SB_TOTAL_BLOCKS: usize = 8;
const SB_INODE_BITMAP_BLOCK: usize = 12;
const SB_DATA_BITMAP_BLOCK: usize = 16;
const SB_INODE_TABLE_START: usize = 20;
const SB_FIRST_DATA_BLOCK: usize = 24;
const SB_INODE_SIZE: usize = 28;
const SB_INODE_COUNT: usize = 32;

/// Parsed superblock fields.
///
/// Parsing is deliberately value-agnostic: a wrong magic or geometry field
/// parses fine and is surfaced by the checker, not rejected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Superblock {
    pub magic: u16,
    pub block_size: u32,
    pub total_blocks: u32,
    pub inode_bitmap_block: u32,
    pub data_bitmap_block: u32,
    pub inode_table_start: u32,
    pub first_data_block: u32,
    pub inode_size: u32,
    pub inode_count: u32,
}

/// A named superblock field paired with its observed and expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuperblockField {
    pub name: &'static str,
    pub observed: u64,
    pub expected: u64,
}

impl Superblock {
    /// The well-formed superblock for the fixed VSFS geometry.
    pub const EXPECTED: Self = Self {
        magic: VSFS_MAGIC,
        block_size: BLOCK_SIZE as u32,
        total_blocks: TOTAL_BLOCKS,
        inode_bitmap_block: INODE_BITMAP_BLOCK,
        data_bitmap_block: DATA_BITMAP_BLOCK,
        inode_table_start: INODE_TABLE_START,
        first_data_block: FIRST_DATA_BLOCK,
        inode_size: INODE_SIZE as u32,
        inode_count: INODE_COUNT,
    };

    /// Parse a superblock from its block region.
    pub fn parse_region(region: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            magic: read_le_u16(region, SB_MAGIC)?,
            block_size: read_le_u32(region, SB_BLOCK_SIZE)?,
            total_blocks: read_le_u32(region, SB_TOTAL_BLOCKS)?,
            inode_bitmap_block: read_le_u32(region, SB_INODE_BITMAP_BLOCK)?,
            data_bitmap_block: read_le_u32(region, SB_DATA_BITMAP_BLOCK)?,
            inode_table_start: read_le_u32(region, SB_INODE_TABLE_START)?,
            first_data_block: read_le_u32(region, SB_FIRST_DATA_BLOCK)?,
            inode_size: read_le_u32(region, SB_INODE_SIZE)?,
            inode_count: read_le_u32(region, SB_INODE_COUNT)?,
        })
    }

    /// Patch the defined fields into a superblock region.
    ///
    /// Writes exactly the 36 defined bytes; everything else in the region is
    /// left as-is. The region must be at least 36 bytes long.
    pub fn encode_into(&self, region: &mut [u8]) {
        region[SB_MAGIC..SB_MAGIC + 2].copy_from_slice(&self.magic.to_le_bytes());
        for (offset, value) in [
            (SB_BLOCK_SIZE, self.block_size),
            (SB_TOTAL_BLOCKS, self.total_blocks),
            (SB_INODE_BITMAP_BLOCK, self.inode_bitmap_block),
            (SB_DATA_BITMAP_BLOCK, self.data_bitmap_block),
            (SB_INODE_TABLE_START, self.inode_table_start),
            (SB_FIRST_DATA_BLOCK, self.first_data_block),
            (SB_INODE_SIZE, self.inode_size),
            (SB_INODE_COUNT, self.inode_count),
        ] {
            region[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    /// Every defined field alongside its expected value, in on-disk order.
    #[must_use]
    pub fn fields(&self) -> [SuperblockField; 9] {
        let exp = Self::EXPECTED;
        [
            SuperblockField {
                name: "magic number",
                observed: u64::from(self.magic),
                expected: u64::from(exp.magic),
            },
            SuperblockField {
                name: "block size",
                observed: u64::from(self.block_size),
                expected: u64::from(exp.block_size),
            },
            SuperblockField {
                name: "total blocks",
                observed: u64::from(self.total_blocks),
                expected: u64::from(exp.total_blocks),
            },
            SuperblockField {
                name: "inode bitmap block",
                observed: u64::from(self.inode_bitmap_block),
                expected: u64::from(exp.inode_bitmap_block),
            },
            SuperblockField {
                name: "data bitmap block",
                observed: u64::from(self.data_bitmap_block),
                expected: u64::from(exp.data_bitmap_block),
            },
            SuperblockField {
                name: "inode table start block",
                observed: u64::from(self.inode_table_start),
                expected: u64::from(exp.inode_table_start),
            },
            SuperblockField {
                name: "first data block",
                observed: u64::from(self.first_data_block),
                expected: u64::from(exp.first_data_block),
            },
            SuperblockField {
                name: "inode size",
                observed: u64::from(self.inode_size),
                expected: u64::from(exp.inode_size),
            },
            SuperblockField {
                name: "inode count",
                observed: u64::from(self.inode_count),
                expected: u64::from(exp.inode_count),
            },
        ]
    }
}

// ── Inode ───────────────────────────────────────────────────────────────────

// Field offsets within a 256-byte inode record. The defined prefix is
// fourteen consecutive u32s; bytes 56.. are reserved.
const I_MODE: usize = 0;
const I_UID: usize = 4;
const I_GID: usize = 8;
const I_SIZE: usize = 12;
const I_ATIME: usize = 16;
const I_CTIME: usize = 20;
const I_MTIME: usize = 24;
const I_DTIME: usize = 28;
const I_LINKS_COUNT: usize = 32;
const I_BLOCKS_COUNT: usize = 36;
const I_DIRECT: usize = 40;
const I_SINGLE_INDIRECT: usize = 44;
const I_DOUBLE_INDIRECT: usize = 48;
const I_TRIPLE_INDIRECT: usize = 52;

/// Parsed inode record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inode {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub atime: u32,
    pub ctime: u32,
    pub mtime: u32,
    pub dtime: u32,
    pub links_count: u32,
    pub blocks_count: u32,
    pub direct_block: u32,
    pub single_indirect: u32,
    pub double_indirect: u32,
    pub triple_indirect: u32,
}

impl Inode {
    /// Parse an inode from its record region.
    pub fn parse_region(region: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            mode: read_le_u32(region, I_MODE)?,
            uid: read_le_u32(region, I_UID)?,
            gid: read_le_u32(region, I_GID)?,
            size: read_le_u32(region, I_SIZE)?,
            atime: read_le_u32(region, I_ATIME)?,
            ctime: read_le_u32(region, I_CTIME)?,
            mtime: read_le_u32(region, I_MTIME)?,
            dtime: read_le_u32(region, I_DTIME)?,
            links_count: read_le_u32(region, I_LINKS_COUNT)?,
            blocks_count: read_le_u32(region, I_BLOCKS_COUNT)?,
            direct_block: read_le_u32(region, I_DIRECT)?,
            single_indirect: read_le_u32(region, I_SINGLE_INDIRECT)?,
            double_indirect: read_le_u32(region, I_DOUBLE_INDIRECT)?,
            triple_indirect: read_le_u32(region, I_TRIPLE_INDIRECT)?,
        })
    }

    /// Patch the defined fields into an inode record region.
    ///
    /// Writes exactly the 56-byte prefix; the reserved tail is left as-is.
    pub fn encode_into(&self, region: &mut [u8]) {
        for (offset, value) in [
            (I_MODE, self.mode),
            (I_UID, self.uid),
            (I_GID, self.gid),
            (I_SIZE, self.size),
            (I_ATIME, self.atime),
            (I_CTIME, self.ctime),
            (I_MTIME, self.mtime),
            (I_DTIME, self.dtime),
            (I_LINKS_COUNT, self.links_count),
            (I_BLOCKS_COUNT, self.blocks_count),
            (I_DIRECT, self.direct_block),
            (I_SINGLE_INDIRECT, self.single_indirect),
            (I_DOUBLE_INDIRECT, self.double_indirect),
            (I_TRIPLE_INDIRECT, self.triple_indirect),
        ] {
            region[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
    }

    /// An inode is live iff it has links and no deletion time.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.links_count > 0 && self.dtime == 0
    }

    /// Value stored in one of the four root pointer slots.
    #[must_use]
    pub fn pointer(&self, slot: PointerSlot) -> u32 {
        match slot {
            PointerSlot::Direct => self.direct_block,
            PointerSlot::Single => self.single_indirect,
            PointerSlot::Double => self.double_indirect,
            PointerSlot::Triple => self.triple_indirect,
        }
    }
}

// ── Pointer slots ───────────────────────────────────────────────────────────

/// The four pointer fields stored in the inode record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerSlot {
    Direct,
    Single,
    Double,
    Triple,
}

impl PointerSlot {
    pub const ALL: [Self; 4] = [Self::Direct, Self::Single, Self::Double, Self::Triple];

    /// Byte offset of this slot within the inode record.
    #[must_use]
    pub fn record_offset(self) -> usize {
        match self {
            Self::Direct => I_DIRECT,
            Self::Single => I_SINGLE_INDIRECT,
            Self::Double => I_DOUBLE_INDIRECT,
            Self::Triple => I_TRIPLE_INDIRECT,
        }
    }
}

impl fmt::Display for PointerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct block"),
            Self::Single => write!(f, "single indirect block"),
            Self::Double => write!(f, "double indirect block"),
            Self::Triple => write!(f, "triple indirect block"),
        }
    }
}
