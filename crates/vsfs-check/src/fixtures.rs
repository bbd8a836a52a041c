//! Test image builders shared by the pass tests.

use vsfs_image::{Image, bitmap_set};
use vsfs_ondisk::{Inode, Superblock};
use vsfs_types::{BLOCK_SIZE, BlockNumber, IMAGE_SIZE, InodeIndex, POINTER_SIZE};

/// A structurally empty file system: valid superblock, everything else zero.
pub fn empty_fs() -> Image {
    let mut image = Image::from_bytes(vec![0_u8; IMAGE_SIZE]).expect("image size");
    Superblock::EXPECTED.encode_into(image.block_mut(BlockNumber(0)));
    image
}

/// A minimal consistent image: one live inode at index 0 holding data
/// block 8, with both bitmap bits set to match.
pub fn pristine() -> Image {
    let mut image = empty_fs();
    write_inode(&mut image, 0, live_file(8));
    set_inode_bit(&mut image, 0);
    set_data_bit(&mut image, 0);
    image
}

/// A live single-link inode whose only pointer is `direct_block`.
pub fn live_file(direct_block: u32) -> Inode {
    Inode {
        links_count: 1,
        direct_block,
        ..Inode::default()
    }
}

pub fn write_inode(image: &mut Image, index: u32, inode: Inode) {
    inode.encode_into(image.inode_region_mut(InodeIndex(index)));
}

pub fn set_inode_bit(image: &mut Image, index: u32) {
    bitmap_set(image.inode_bitmap_mut(), index);
}

pub fn set_data_bit(image: &mut Image, slot: u32) {
    bitmap_set(image.data_bitmap_mut(), slot);
}

/// Store `value` as entry `index` of the indirect block `block`.
pub fn set_entry(image: &mut Image, block: u32, index: usize, value: u32) {
    image.write_u32_at(block as usize * BLOCK_SIZE + index * POINTER_SIZE, value);
}
