//! Bad block pass.
//!
//! Every reference yielded by the walker, root slots and indirect entries
//! alike, must name a block inside the image. Zero is absence, never bad;
//! blocks 0–7 are metadata but in-image, so they pass this rule (the walker
//! still refuses to treat them as indirect blocks). Repair zeroes the
//! offending storage location.

use crate::report::{Finding, Mode, Pass, PassReport};
use crate::walker::{Step, clear_reference, walk_inode};
use tracing::debug;
use vsfs_image::Image;
use vsfs_types::InodeIndex;

pub fn check_bad_blocks(image: &mut Image, mode: Mode) -> PassReport {
    let mut report = PassReport::new(Pass::BadBlocks);

    for ino in InodeIndex::all() {
        if !image.inode(ino).is_live() {
            continue;
        }
        walk_inode(image, ino, &mut |image, r| {
            if r.block.in_image() {
                return Step::Descend;
            }
            let fix = mode.repairs().then(|| {
                clear_reference(image, r.location);
                format!("Zeroing {}", r.location)
            });
            report.push(
                Finding::OutOfRangePointer {
                    inode: ino,
                    block: r.block,
                    role: r.kind,
                },
                fix,
            );
            Step::Prune
        });
    }

    debug!(findings = report.diagnostics.len(), "bad block pass");
    report
}
