//! Block-pointer walker.
//!
//! Yields every block number referenced by an inode, including the entries
//! inside each indirect block, as a stream of role-tagged references. The
//! walker owns traversal order and bounds discipline; the visitor owns
//! judgment. A visitor returning
//! [`Step::Prune`] for an interior reference stops descent through it, and
//! the walker never dereferences an interior block outside the data region
//! regardless of the verdict.
//!
//! Traversal order is fixed: direct pointer, then the single-indirect
//! subtree, then double, then triple, with indirect entries visited in
//! index order. Zero entries denote holes and are skipped, never yielded.

use serde::Serialize;
use std::fmt;
use vsfs_image::Image;
use vsfs_ondisk::PointerSlot;
use vsfs_types::{BLOCK_SIZE, BlockNumber, InodeIndex, POINTER_SIZE, POINTERS_PER_BLOCK};

/// Role of a reference within an inode's pointer tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// The inode's direct pointer.
    Direct,
    /// The inode's single-indirect pointer.
    L1Root,
    /// A data entry inside a single-indirect block.
    L1Leaf,
    /// The inode's double-indirect pointer.
    L2Root,
    /// An indirect entry inside a double-indirect block.
    L2Mid,
    /// A data entry two levels below a double-indirect pointer.
    L2Leaf,
    /// The inode's triple-indirect pointer.
    L3Root,
    /// A double-indirect entry inside a triple-indirect block.
    L3Upper,
    /// An indirect entry two levels below a triple-indirect pointer.
    L3Mid,
    /// A data entry three levels below a triple-indirect pointer.
    L3Leaf,
}

impl RefKind {
    /// Whether a reference of this role heads a subtree the walker can
    /// descend into.
    #[must_use]
    pub fn is_interior(self) -> bool {
        matches!(
            self,
            Self::L1Root | Self::L2Root | Self::L2Mid | Self::L3Root | Self::L3Upper | Self::L3Mid
        )
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct block"),
            Self::L1Root => write!(f, "single indirect block"),
            Self::L1Leaf => write!(f, "data block in single indirect chain"),
            Self::L2Root => write!(f, "double indirect block"),
            Self::L2Mid => write!(f, "indirect block in double indirect chain"),
            Self::L2Leaf => write!(f, "data block in double indirect chain"),
            Self::L3Root => write!(f, "triple indirect block"),
            Self::L3Upper => write!(f, "double indirect block in triple indirect chain"),
            Self::L3Mid => write!(f, "indirect block in triple indirect chain"),
            Self::L3Leaf => write!(f, "data block in triple indirect chain"),
        }
    }
}

/// Where a reference's pointer value is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefLocation {
    /// One of the four pointer fields in the inode record itself.
    Slot { inode: InodeIndex, slot: PointerSlot },
    /// An entry inside an indirect block.
    Entry { block: BlockNumber, index: usize },
}

impl fmt::Display for RefLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slot { inode, slot } => write!(f, "{slot} of inode {inode}"),
            Self::Entry { block, index } => write!(f, "entry {index} of indirect block {block}"),
        }
    }
}

/// One reference yielded by the walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    /// The referenced block number. May be out of range; that is the point.
    pub block: BlockNumber,
    pub kind: RefKind,
    pub location: RefLocation,
}

/// Visitor verdict for a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Follow interior references into their subtree.
    Descend,
    /// Do not descend. Ignored for leaf references.
    Prune,
}

/// Descent chains below each indirect root, by role.
const CHAINS: [(PointerSlot, RefKind, &[RefKind]); 3] = [
    (PointerSlot::Single, RefKind::L1Root, &[RefKind::L1Leaf]),
    (
        PointerSlot::Double,
        RefKind::L2Root,
        &[RefKind::L2Mid, RefKind::L2Leaf],
    ),
    (
        PointerSlot::Triple,
        RefKind::L3Root,
        &[RefKind::L3Upper, RefKind::L3Mid, RefKind::L3Leaf],
    ),
];

/// Walk every reference of one inode, in traversal order.
///
/// The image is threaded through to the visitor so that passes can repair
/// locations as they are reported; the walker snapshots each indirect block
/// before iterating its entries, so a repair never disturbs an in-progress
/// iteration.
pub fn walk_inode<F>(image: &mut Image, ino: InodeIndex, visit: &mut F)
where
    F: FnMut(&mut Image, BlockRef) -> Step,
{
    let inode = image.inode(ino);

    if inode.direct_block != 0 {
        visit(
            image,
            BlockRef {
                block: BlockNumber(inode.direct_block),
                kind: RefKind::Direct,
                location: RefLocation::Slot {
                    inode: ino,
                    slot: PointerSlot::Direct,
                },
            },
        );
    }

    for (slot, root_kind, chain) in CHAINS {
        let ptr = inode.pointer(slot);
        if ptr == 0 {
            continue;
        }
        let root = BlockNumber(ptr);
        let step = visit(
            image,
            BlockRef {
                block: root,
                kind: root_kind,
                location: RefLocation::Slot { inode: ino, slot },
            },
        );
        if step == Step::Descend && root.is_data() {
            walk_chain(image, root, chain, visit);
        }
    }
}

/// Visit the entries of one indirect block, recursing per the role chain.
fn walk_chain<F>(image: &mut Image, block: BlockNumber, chain: &[RefKind], visit: &mut F)
where
    F: FnMut(&mut Image, BlockRef) -> Step,
{
    let mut entries = [0_u8; BLOCK_SIZE];
    entries.copy_from_slice(image.block(block));

    let (kind, rest) = match chain {
        [kind, rest @ ..] => (*kind, rest),
        [] => return,
    };

    for index in 0..POINTERS_PER_BLOCK {
        let off = index * POINTER_SIZE;
        let value = u32::from_le_bytes([
            entries[off],
            entries[off + 1],
            entries[off + 2],
            entries[off + 3],
        ]);
        if value == 0 {
            continue;
        }
        let child = BlockNumber(value);
        let step = visit(
            image,
            BlockRef {
                block: child,
                kind,
                location: RefLocation::Entry { block, index },
            },
        );
        if !rest.is_empty() && step == Step::Descend && child.is_data() {
            walk_chain(image, child, rest, visit);
        }
    }
}

/// Zero the storage location of a reference.
pub fn clear_reference(image: &mut Image, location: RefLocation) {
    match location {
        RefLocation::Slot { inode, slot } => {
            image.write_u32_at(inode.byte_offset() + slot.record_offset(), 0);
        }
        RefLocation::Entry { block, index } => {
            image.write_u32_at(block.byte_offset() + index * POINTER_SIZE, 0);
        }
    }
}
