#![forbid(unsafe_code)]
//! In-memory VSFS image buffer.
//!
//! `Image` owns the one contiguous byte region holding the whole file
//! system. It is created by loading a file (or raw bytes), validated to the
//! fixed geometry up front, and from then on every accessor is a typed
//! window into the buffer: blocks, bitmaps, inode records. Mutation happens
//! either through those windows or through word-level patching at an
//! absolute byte offset, which is how repair zeroes individual pointers.

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::Path;
use vsfs_error::{Result, VsfsError};
use vsfs_ondisk::{Inode, Superblock};
use vsfs_types::{
    BLOCK_SIZE, BlockNumber, DATA_BITMAP_BLOCK, IMAGE_SIZE, INODE_BITMAP_BLOCK, INODE_SIZE,
    InodeIndex, SUPERBLOCK_BLOCK,
};

// ── Bitmap bit operations ───────────────────────────────────────────────────

/// Get bit `idx` from a bitmap byte slice (LSB-first within a byte).
#[must_use]
pub fn bitmap_get(bitmap: &[u8], idx: u32) -> bool {
    let byte_idx = (idx / 8) as usize;
    let bit_idx = idx % 8;
    if byte_idx >= bitmap.len() {
        return false;
    }
    (bitmap[byte_idx] >> bit_idx) & 1 == 1
}

/// Set bit `idx` in a bitmap byte slice.
pub fn bitmap_set(bitmap: &mut [u8], idx: u32) {
    let byte_idx = (idx / 8) as usize;
    let bit_idx = idx % 8;
    if byte_idx < bitmap.len() {
        bitmap[byte_idx] |= 1 << bit_idx;
    }
}

/// Clear bit `idx` in a bitmap byte slice.
pub fn bitmap_clear(bitmap: &mut [u8], idx: u32) {
    let byte_idx = (idx / 8) as usize;
    let bit_idx = idx % 8;
    if byte_idx < bitmap.len() {
        bitmap[byte_idx] &= !(1 << bit_idx);
    }
}

// ── Image buffer ────────────────────────────────────────────────────────────

/// The whole file system, in memory.
///
/// The buffer length is validated to `IMAGE_SIZE` at construction, which is
/// what lets every window accessor slice without further checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
}

impl Image {
    /// Take ownership of raw image bytes, validating the fixed geometry.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        if data.len() != IMAGE_SIZE {
            return Err(VsfsError::ImageSize {
                actual: data.len() as u64,
                expected: IMAGE_SIZE as u64,
            });
        }
        Ok(Self { data })
    }

    /// Load an image file into memory.
    ///
    /// The file is opened read+write so that an unwritable image fails here
    /// rather than after a repair sweep.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut data = Vec::with_capacity(IMAGE_SIZE);
        file.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Write the whole buffer back to the image file at offset 0.
    pub fn flush(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new().write(true).open(path)?;
        file.write_all(&self.data)?;
        file.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// One block's bytes. The block must be in-image.
    #[must_use]
    pub fn block(&self, block: BlockNumber) -> &[u8] {
        debug_assert!(block.in_image());
        let off = block.byte_offset();
        &self.data[off..off + BLOCK_SIZE]
    }

    /// One block's bytes, mutable. The block must be in-image.
    pub fn block_mut(&mut self, block: BlockNumber) -> &mut [u8] {
        debug_assert!(block.in_image());
        let off = block.byte_offset();
        &mut self.data[off..off + BLOCK_SIZE]
    }

    #[must_use]
    pub fn inode_bitmap(&self) -> &[u8] {
        self.block(BlockNumber(INODE_BITMAP_BLOCK))
    }

    pub fn inode_bitmap_mut(&mut self) -> &mut [u8] {
        self.block_mut(BlockNumber(INODE_BITMAP_BLOCK))
    }

    #[must_use]
    pub fn data_bitmap(&self) -> &[u8] {
        self.block(BlockNumber(DATA_BITMAP_BLOCK))
    }

    pub fn data_bitmap_mut(&mut self) -> &mut [u8] {
        self.block_mut(BlockNumber(DATA_BITMAP_BLOCK))
    }

    /// One inode record's bytes. The index must be in-table.
    #[must_use]
    pub fn inode_region(&self, ino: InodeIndex) -> &[u8] {
        debug_assert!(ino.in_table());
        let off = ino.byte_offset();
        &self.data[off..off + INODE_SIZE]
    }

    /// One inode record's bytes, mutable. The index must be in-table.
    pub fn inode_region_mut(&mut self, ino: InodeIndex) -> &mut [u8] {
        debug_assert!(ino.in_table());
        let off = ino.byte_offset();
        &mut self.data[off..off + INODE_SIZE]
    }

    /// Parse the superblock out of block 0.
    #[must_use]
    pub fn superblock(&self) -> Superblock {
        Superblock::parse_region(self.block(BlockNumber(SUPERBLOCK_BLOCK)))
            .expect("buffer length is validated at construction")
    }

    /// Parse one inode record out of the table.
    #[must_use]
    pub fn inode(&self, ino: InodeIndex) -> Inode {
        Inode::parse_region(self.inode_region(ino))
            .expect("buffer length is validated at construction")
    }

    /// Read a little-endian u32 at an absolute byte offset.
    #[must_use]
    pub fn read_u32_at(&self, offset: usize) -> u32 {
        let b = &self.data[offset..offset + 4];
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    /// Write a little-endian u32 at an absolute byte offset.
    pub fn write_u32_at(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsfs_types::{INODE_COUNT, VSFS_MAGIC};

    fn blank_image() -> Image {
        Image::from_bytes(vec![0_u8; IMAGE_SIZE]).expect("blank image")
    }

    #[test]
    fn from_bytes_enforces_exact_size() {
        assert!(Image::from_bytes(vec![0; IMAGE_SIZE]).is_ok());

        let short = Image::from_bytes(vec![0; IMAGE_SIZE - 1]);
        assert!(matches!(
            short,
            Err(VsfsError::ImageSize {
                actual: 262_143,
                expected: 262_144,
            })
        ));

        assert!(Image::from_bytes(vec![0; IMAGE_SIZE + 4096]).is_err());
    }

    #[test]
    fn load_and_flush_round_trip() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        let mut bytes = vec![0_u8; IMAGE_SIZE];
        bytes[0] = 0x4D;
        bytes[IMAGE_SIZE - 1] = 0xFF;
        file.write_all(&bytes).expect("write image");
        file.flush().expect("flush");

        let mut image = Image::load(file.path()).expect("load");
        assert_eq!(image.as_bytes(), &bytes[..]);

        image.write_u32_at(100, 0xDEAD_BEEF);
        image.flush(file.path()).expect("flush image");

        let reloaded = Image::load(file.path()).expect("reload");
        assert_eq!(reloaded.as_bytes(), image.as_bytes());
        assert_eq!(reloaded.read_u32_at(100), 0xDEAD_BEEF);
    }

    #[test]
    fn load_rejects_wrong_size_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&[0_u8; 1024]).expect("write");
        file.flush().expect("flush");

        assert!(matches!(
            Image::load(file.path()),
            Err(VsfsError::ImageSize { actual: 1024, .. })
        ));
    }

    #[test]
    fn block_windows_tile_the_buffer() {
        let mut image = blank_image();
        image.block_mut(BlockNumber(1))[0] = 0xAA;
        image.block_mut(BlockNumber(2))[4095] = 0xBB;

        assert_eq!(image.inode_bitmap()[0], 0xAA);
        assert_eq!(image.data_bitmap()[4095], 0xBB);
        assert_eq!(image.as_bytes()[BLOCK_SIZE], 0xAA);
        assert_eq!(image.as_bytes()[3 * BLOCK_SIZE - 1], 0xBB);
    }

    #[test]
    fn superblock_and_inode_windows_parse() {
        let mut image = blank_image();
        Superblock::EXPECTED.encode_into(image.block_mut(BlockNumber(0)));
        assert_eq!(image.superblock(), Superblock::EXPECTED);
        assert_eq!(image.superblock().magic, VSFS_MAGIC);

        let off = InodeIndex(5).byte_offset();
        image.write_u32_at(off + 32, 1); // links_count
        image.write_u32_at(off + 40, 8); // direct_block
        let inode = image.inode(InodeIndex(5));
        assert!(inode.is_live());
        assert_eq!(inode.direct_block, 8);
        assert!(!image.inode(InodeIndex(4)).is_live());
        assert!(InodeIndex(INODE_COUNT - 1).in_table());
    }

    #[test]
    fn word_patching_is_little_endian() {
        let mut image = blank_image();
        image.write_u32_at(8 * BLOCK_SIZE, 0x0000_0010);
        assert_eq!(image.block(BlockNumber(8))[0], 0x10);
        assert_eq!(image.block(BlockNumber(8))[1], 0x00);
        assert_eq!(image.read_u32_at(8 * BLOCK_SIZE), 16);
    }

    #[test]
    fn bitmap_ops_are_lsb_first_and_idempotent() {
        let mut bm = vec![0_u8; 8];

        bitmap_set(&mut bm, 0);
        assert_eq!(bm[0], 0b0000_0001);
        bitmap_set(&mut bm, 9);
        assert_eq!(bm[1], 0b0000_0010);
        assert!(bitmap_get(&bm, 0));
        assert!(bitmap_get(&bm, 9));
        assert!(!bitmap_get(&bm, 1));

        // Idempotence in both directions.
        bitmap_set(&mut bm, 0);
        assert_eq!(bm[0], 0b0000_0001);
        bitmap_clear(&mut bm, 3);
        assert_eq!(bm[0], 0b0000_0001);
        bitmap_clear(&mut bm, 0);
        assert_eq!(bm[0], 0);
        bitmap_clear(&mut bm, 0);
        assert_eq!(bm[0], 0);
    }

    #[test]
    fn bitmap_ops_ignore_out_of_slice_bits() {
        let mut bm = vec![0xFF_u8; 2];
        assert!(!bitmap_get(&bm, 16));
        bitmap_set(&mut bm, 16);
        bitmap_clear(&mut bm, 16);
        assert_eq!(bm, vec![0xFF, 0xFF]);
    }
}
