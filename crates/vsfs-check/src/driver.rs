//! Check driver and per-sweep side tables.
//!
//! The driver is the sole owner of the image buffer and of the discovery
//! state the passes share. Each sweep runs the five passes in a fixed
//! order (superblock, inode bitmap, data bitmap, duplicate blocks, bad
//! blocks) so that the data bitmap is derived from the image as read,
//! before the reference-walking passes mutate it, and so that repair
//! decisions are deterministic. After a repair sweep that found anything,
//! one read-only sweep with fresh side tables reports what remains.

use crate::badblock::check_bad_blocks;
use crate::bitmaps::{check_data_bitmap, check_inode_bitmap};
use crate::duplicate::check_duplicate_blocks;
use crate::report::{Mode, PassReport, RunReport};
use crate::superblock::check_superblock;
use tracing::{debug, info};
use vsfs_image::Image;
use vsfs_types::{BlockNumber, DATA_BLOCK_COUNT, InodeIndex, TOTAL_BLOCKS};

// ── Per-sweep side tables ───────────────────────────────────────────────────

/// First-owner table for every block in the image, filled by the duplicate
/// pass as it discovers references.
#[derive(Debug, Clone)]
pub struct BlockRefs {
    first_owner: [Option<InodeIndex>; TOTAL_BLOCKS as usize],
}

impl Default for BlockRefs {
    fn default() -> Self {
        Self {
            first_owner: [None; TOTAL_BLOCKS as usize],
        }
    }
}

impl BlockRefs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reference to `block` by `owner`.
    ///
    /// Returns `None` on first sight; on any later sight returns the first
    /// owner, leaving the table unchanged.
    pub fn note(&mut self, block: BlockNumber, owner: InodeIndex) -> Option<InodeIndex> {
        let slot = &mut self.first_owner[block.0 as usize];
        match *slot {
            Some(first) => Some(first),
            None => {
                *slot = Some(owner);
                None
            }
        }
    }

    /// The inode that first claimed `block`, if any reference was seen.
    #[must_use]
    pub fn first_owner(&self, block: BlockNumber) -> Option<InodeIndex> {
        self.first_owner[block.0 as usize]
    }
}

/// Per-data-slot reachability, filled by the data bitmap pass from the root
/// pointer slots of live inodes.
#[derive(Debug, Clone)]
pub struct ReachableData {
    referenced: [bool; DATA_BLOCK_COUNT as usize],
}

impl Default for ReachableData {
    fn default() -> Self {
        Self {
            referenced: [false; DATA_BLOCK_COUNT as usize],
        }
    }
}

impl ReachableData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&mut self, data_slot: u32) {
        self.referenced[data_slot as usize] = true;
    }

    #[must_use]
    pub fn is_referenced(&self, data_slot: u32) -> bool {
        self.referenced[data_slot as usize]
    }
}

// ── Driver ──────────────────────────────────────────────────────────────────

/// Run the checker over a loaded image.
///
/// In repair mode the buffer is mutated in place as findings are made; if
/// anything was found, a read-only re-verification sweep follows and its
/// results are attached to the report. No further repairs are attempted.
pub fn run(image: &mut Image, mode: Mode) -> RunReport {
    let passes = sweep(image, mode);

    let post_fix = (mode.repairs() && passes.iter().any(|p| !p.valid())).then(|| {
        info!("re-verifying after repairs");
        sweep(image, Mode::Check)
    });

    RunReport {
        mode,
        passes,
        post_fix,
    }
}

/// One ordered pass sequence with fresh side tables.
fn sweep(image: &mut Image, mode: Mode) -> Vec<PassReport> {
    let mut refs = BlockRefs::new();
    let mut reachable = ReachableData::new();

    let reports = vec![
        check_superblock(image, mode),
        check_inode_bitmap(image, mode),
        check_data_bitmap(image, mode, &mut reachable),
        check_duplicate_blocks(image, mode, &mut refs),
        check_bad_blocks(image, mode),
    ];
    for report in &reports {
        debug!(pass = %report.pass, findings = report.diagnostics.len(), "pass complete");
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::report::Pass;

    #[test]
    fn block_refs_first_owner_wins() {
        let mut refs = BlockRefs::new();
        assert_eq!(refs.note(BlockNumber(10), InodeIndex(3)), None);
        assert_eq!(refs.note(BlockNumber(10), InodeIndex(5)), Some(InodeIndex(3)));
        assert_eq!(refs.note(BlockNumber(10), InodeIndex(0)), Some(InodeIndex(3)));
        assert_eq!(refs.first_owner(BlockNumber(10)), Some(InodeIndex(3)));
        assert_eq!(refs.first_owner(BlockNumber(11)), None);
    }

    #[test]
    fn reachable_data_marks_slots() {
        let mut reachable = ReachableData::new();
        assert!(!reachable.is_referenced(0));
        reachable.mark(0);
        reachable.mark(55);
        assert!(reachable.is_referenced(0));
        assert!(reachable.is_referenced(55));
        assert!(!reachable.is_referenced(1));
    }

    #[test]
    fn run_reports_all_five_passes_in_order() {
        let mut image = fixtures::pristine();
        let report = run(&mut image, Mode::Check);
        let order: Vec<Pass> = report.passes.iter().map(|p| p.pass).collect();
        assert_eq!(order, Pass::ALL.to_vec());
        assert!(report.consistent());
        assert!(report.post_fix.is_none());
    }

    #[test]
    fn clean_repair_run_skips_the_post_fix_sweep() {
        let mut image = fixtures::pristine();
        let before = image.clone();
        let report = run(&mut image, Mode::Repair);
        assert!(report.consistent());
        assert!(report.post_fix.is_none());
        assert_eq!(image, before);
    }

    #[test]
    fn repair_run_with_findings_re_verifies_read_only() {
        let mut image = fixtures::pristine();
        vsfs_image::bitmap_clear(image.inode_bitmap_mut(), 0);

        let report = run(&mut image, Mode::Repair);
        assert!(!report.consistent());
        assert_eq!(report.post_fix_consistent(), Some(true));

        // The post-fix sweep recorded no repairs of its own.
        let post = report.post_fix.expect("post-fix sweep ran");
        assert!(post.iter().all(|p| p.diagnostics.is_empty()));
    }
}
