//! Superblock well-formedness pass.
//!
//! Every defined superblock field is compared against its expected constant
//! for the fixed VSFS geometry. Repair overwrites the defined field bytes
//! with the expected values; the dead bytes and the reserved tail are never
//! validated or written.

use crate::report::{Finding, Mode, Pass, PassReport};
use vsfs_image::Image;
use vsfs_ondisk::Superblock;
use vsfs_types::{BlockNumber, SUPERBLOCK_BLOCK};

pub fn check_superblock(image: &mut Image, mode: Mode) -> PassReport {
    let mut report = PassReport::new(Pass::Superblock);
    let sb = image.superblock();

    for field in sb.fields() {
        if field.observed == field.expected {
            continue;
        }
        let fix = mode
            .repairs()
            .then(|| format!("Setting correct {}", field.name));
        report.push(
            Finding::SuperblockMismatch {
                field: field.name,
                observed: field.observed,
                expected: field.expected,
            },
            fix,
        );
    }

    if mode.repairs() && !report.valid() {
        Superblock::EXPECTED.encode_into(image.block_mut(BlockNumber(SUPERBLOCK_BLOCK)));
    }

    report
}
