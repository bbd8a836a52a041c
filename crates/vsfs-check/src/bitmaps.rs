//! Inode and data bitmap passes.
//!
//! Both passes treat the bitmap as the derivable view and the inode table
//! as the source of truth: liveness drives the inode bitmap, root-pointer
//! reachability drives the data bitmap. Disagreement in either direction is
//! diagnosed, and repair aligns the bitmap bit to the derived value. Bits
//! beyond the semantic range (80 inodes, 56 data blocks) are never touched.
//!
//! The data pass counts only the four root pointer slots of each live
//! inode; blocks reached only through indirect entries do not feed the
//! data bitmap.

use crate::driver::ReachableData;
use crate::report::{Finding, Mode, Pass, PassReport};
use vsfs_image::{Image, bitmap_clear, bitmap_get, bitmap_set};
use vsfs_ondisk::PointerSlot;
use vsfs_types::{BlockNumber, DATA_BLOCK_COUNT, InodeIndex};

pub fn check_inode_bitmap(image: &mut Image, mode: Mode) -> PassReport {
    let mut report = PassReport::new(Pass::InodeBitmap);

    for ino in InodeIndex::all() {
        let live = image.inode(ino).is_live();
        let marked = bitmap_get(image.inode_bitmap(), ino.0);
        if live == marked {
            continue;
        }

        let finding = if live {
            Finding::InodeMarkMissing { inode: ino }
        } else {
            Finding::InodeMarkStale { inode: ino }
        };
        let fix = mode.repairs().then(|| {
            if live {
                bitmap_set(image.inode_bitmap_mut(), ino.0);
                format!("Marking inode {ino} as used in inode bitmap")
            } else {
                bitmap_clear(image.inode_bitmap_mut(), ino.0);
                format!("Clearing inode {ino} in inode bitmap")
            }
        });
        report.push(finding, fix);
    }

    report
}

pub fn check_data_bitmap(
    image: &mut Image,
    mode: Mode,
    reachable: &mut ReachableData,
) -> PassReport {
    let mut report = PassReport::new(Pass::DataBitmap);

    // Roots of live inodes only; indirect subtrees are not descended here.
    for ino in InodeIndex::all() {
        let inode = image.inode(ino);
        if !inode.is_live() {
            continue;
        }
        for slot in PointerSlot::ALL {
            let ptr = inode.pointer(slot);
            if ptr == 0 {
                continue;
            }
            if let Some(data_slot) = BlockNumber(ptr).data_slot() {
                reachable.mark(data_slot);
            }
        }
    }

    for data_slot in 0..DATA_BLOCK_COUNT {
        let referenced = reachable.is_referenced(data_slot);
        let marked = bitmap_get(image.data_bitmap(), data_slot);
        if referenced == marked {
            continue;
        }

        let block = BlockNumber::from_data_slot(data_slot);
        let finding = if referenced {
            Finding::DataMarkMissing { block }
        } else {
            Finding::DataMarkStale { block }
        };
        let fix = mode.repairs().then(|| {
            if referenced {
                bitmap_set(image.data_bitmap_mut(), data_slot);
                format!("Marking block {block} as used in data bitmap")
            } else {
                bitmap_clear(image.data_bitmap_mut(), data_slot);
                format!("Clearing block {block} in data bitmap")
            }
        });
        report.push(finding, fix);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ReachableData;
    use crate::fixtures;
    use vsfs_ondisk::Inode;

    #[test]
    fn live_inode_without_its_bit_is_diagnosed_and_repaired() {
        let mut image = fixtures::empty_fs();
        fixtures::write_inode(&mut image, 0, fixtures::live_file(8));

        let report = check_inode_bitmap(&mut image, Mode::Check);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(
            report.diagnostics[0].finding,
            Finding::InodeMarkMissing {
                inode: InodeIndex(0)
            }
        );
        assert!(!bitmap_get(image.inode_bitmap(), 0));

        let report = check_inode_bitmap(&mut image, Mode::Repair);
        assert!(!report.valid());
        assert!(bitmap_get(image.inode_bitmap(), 0));
        assert!(check_inode_bitmap(&mut image, Mode::Check).valid());
    }

    #[test]
    fn phantom_bit_over_a_zeroed_inode_is_cleared() {
        let mut image = fixtures::empty_fs();
        bitmap_set(image.inode_bitmap_mut(), 5);

        let report = check_inode_bitmap(&mut image, Mode::Repair);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(
            report.diagnostics[0].finding,
            Finding::InodeMarkStale {
                inode: InodeIndex(5)
            }
        );
        assert!(!bitmap_get(image.inode_bitmap(), 5));
    }

    #[test]
    fn unlinked_and_deleted_inodes_are_not_live() {
        let mut image = fixtures::empty_fs();
        // links_count = 0, dtime = 0: not live.
        fixtures::write_inode(
            &mut image,
            1,
            Inode {
                links_count: 0,
                direct_block: 9,
                ..Inode::default()
            },
        );
        // dtime != 0, any links_count: not live.
        fixtures::write_inode(
            &mut image,
            2,
            Inode {
                links_count: 4,
                dtime: 1_700_000_000,
                ..Inode::default()
            },
        );

        assert!(check_inode_bitmap(&mut image, Mode::Check).valid());
    }

    #[test]
    fn bits_beyond_the_inode_table_are_preserved() {
        let mut image = fixtures::empty_fs();
        bitmap_set(image.inode_bitmap_mut(), 80);
        bitmap_set(image.inode_bitmap_mut(), 4095);

        assert!(check_inode_bitmap(&mut image, Mode::Repair).valid());
        assert!(bitmap_get(image.inode_bitmap(), 80));
        assert!(bitmap_get(image.inode_bitmap(), 4095));
    }

    #[test]
    fn bits_beyond_the_data_region_are_preserved() {
        let mut image = fixtures::empty_fs();
        bitmap_set(image.data_bitmap_mut(), 56);
        bitmap_set(image.data_bitmap_mut(), 1000);

        let mut reachable = ReachableData::new();
        assert!(check_data_bitmap(&mut image, Mode::Repair, &mut reachable).valid());
        assert!(bitmap_get(image.data_bitmap(), 56));
        assert!(bitmap_get(image.data_bitmap(), 1000));
    }

    #[test]
    fn root_pointers_of_live_inodes_drive_the_data_bitmap() {
        let mut image = fixtures::empty_fs();
        fixtures::write_inode(
            &mut image,
            0,
            Inode {
                links_count: 1,
                direct_block: 8,
                single_indirect: 10,
                ..Inode::default()
            },
        );
        fixtures::set_inode_bit(&mut image, 0);

        let mut reachable = ReachableData::new();
        let report = check_data_bitmap(&mut image, Mode::Repair, &mut reachable);
        assert_eq!(report.diagnostics.len(), 2);
        assert!(bitmap_get(image.data_bitmap(), 0)); // block 8
        assert!(bitmap_get(image.data_bitmap(), 2)); // block 10

        let mut fresh = ReachableData::new();
        assert!(check_data_bitmap(&mut image, Mode::Check, &mut fresh).valid());
    }

    #[test]
    fn stale_data_bit_is_cleared() {
        let mut image = fixtures::empty_fs();
        bitmap_set(image.data_bitmap_mut(), 7); // block 15, nothing references it

        let mut reachable = ReachableData::new();
        let report = check_data_bitmap(&mut image, Mode::Repair, &mut reachable);
        assert_eq!(
            report.diagnostics[0].finding,
            Finding::DataMarkStale {
                block: BlockNumber(15)
            }
        );
        assert!(!bitmap_get(image.data_bitmap(), 7));
    }

    #[test]
    fn dead_inode_roots_do_not_reach_anything() {
        let mut image = fixtures::empty_fs();
        fixtures::write_inode(
            &mut image,
            3,
            Inode {
                links_count: 0,
                direct_block: 12,
                ..Inode::default()
            },
        );

        let mut reachable = ReachableData::new();
        assert!(check_data_bitmap(&mut image, Mode::Check, &mut reachable).valid());
        assert!(!reachable.is_referenced(4));
    }

    #[test]
    fn metadata_and_out_of_image_roots_set_no_data_bit() {
        let mut image = fixtures::empty_fs();
        fixtures::write_inode(
            &mut image,
            0,
            Inode {
                links_count: 1,
                direct_block: 3,       // metadata region
                single_indirect: 200,  // beyond the image
                ..Inode::default()
            },
        );
        fixtures::set_inode_bit(&mut image, 0);

        let mut reachable = ReachableData::new();
        let report = check_data_bitmap(&mut image, Mode::Check, &mut reachable);
        assert!(report.valid());
        for slot in 0..DATA_BLOCK_COUNT {
            assert!(!reachable.is_referenced(slot));
        }
    }

    #[test]
    fn indirect_entries_do_not_feed_the_data_bitmap() {
        let mut image = fixtures::empty_fs();
        fixtures::write_inode(
            &mut image,
            0,
            Inode {
                links_count: 1,
                single_indirect: 10,
                ..Inode::default()
            },
        );
        fixtures::set_inode_bit(&mut image, 0);
        fixtures::set_entry(&mut image, 10, 0, 20);
        fixtures::set_data_bit(&mut image, 2); // block 10, the root itself

        let mut reachable = ReachableData::new();
        let report = check_data_bitmap(&mut image, Mode::Check, &mut reachable);
        // Block 20 is reached only through the indirect entry: no bit expected,
        // and its absence is not an error.
        assert!(report.valid());
        assert!(!reachable.is_referenced(12));
    }
}
