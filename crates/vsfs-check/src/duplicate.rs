//! Duplicate block pass.
//!
//! Enforces unique ownership: across all live inodes, every data-region
//! block may be claimed by at most one reference. Inodes are visited in
//! ascending index order and references in walker order, so the first
//! claimant always keeps the block and repair output is a function of the
//! image alone. A duplicate reference is never descended; its subtree
//! belongs to the first owner.

use crate::driver::BlockRefs;
use crate::report::{Finding, Mode, Pass, PassReport};
use crate::walker::{Step, clear_reference, walk_inode};
use tracing::debug;
use vsfs_image::Image;
use vsfs_types::InodeIndex;

pub fn check_duplicate_blocks(image: &mut Image, mode: Mode, refs: &mut BlockRefs) -> PassReport {
    let mut report = PassReport::new(Pass::DuplicateBlocks);

    for ino in InodeIndex::all() {
        if !image.inode(ino).is_live() {
            continue;
        }
        walk_inode(image, ino, &mut |image, r| {
            // Out-of-range references belong to the bad block pass.
            if !r.block.is_data() {
                return Step::Prune;
            }
            match refs.note(r.block, ino) {
                None => Step::Descend,
                Some(first_owner) => {
                    let fix = mode.repairs().then(|| {
                        clear_reference(image, r.location);
                        format!("Zeroing {}", r.location)
                    });
                    report.push(
                        Finding::DuplicateReference {
                            block: r.block,
                            first_owner,
                            inode: ino,
                            role: r.kind,
                        },
                        fix,
                    );
                    Step::Prune
                }
            }
        });
    }

    debug!(findings = report.diagnostics.len(), "duplicate block pass");
    report
}
