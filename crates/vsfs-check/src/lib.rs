#![forbid(unsafe_code)]
//! Structural consistency checking and repair for VSFS images.
//!
//! Five cooperating passes over one in-memory image enforce the VSFS
//! invariant set: superblock well-formedness, inode-bitmap/liveness
//! agreement, data-bitmap/reachability agreement, unique block ownership,
//! and bounded pointers. The [`walker`] yields role-tagged references so
//! the ownership and bounds passes differ only in their event handler; the
//! [`driver`] owns the image and the shared discovery state and fixes the
//! pass order. Findings are values collected into reports; no pass fails
//! and no pass aborts another.

pub mod badblock;
pub mod bitmaps;
pub mod driver;
pub mod duplicate;
pub mod report;
pub mod superblock;
pub mod walker;

pub use badblock::check_bad_blocks;
pub use bitmaps::{check_data_bitmap, check_inode_bitmap};
pub use driver::{BlockRefs, ReachableData, run};
pub use duplicate::check_duplicate_blocks;
pub use report::{Diagnostic, Finding, Mode, Pass, PassReport, RunReport};
pub use superblock::check_superblock;
pub use walker::{BlockRef, RefKind, RefLocation, Step, clear_reference, walk_inode};

#[cfg(test)]
pub(crate) mod fixtures;
