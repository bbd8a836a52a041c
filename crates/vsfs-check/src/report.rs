//! Finding taxonomy and run reports.
//!
//! Structural inconsistencies are values, never errors: each pass collects
//! its findings into a [`PassReport`], the driver aggregates five of them
//! into a [`RunReport`], and rendering is a pure function of the report.
//! The `Display` impl produces the diagnostics stream; the `serde` derives
//! produce the machine-readable form.

use crate::walker::RefKind;
use serde::Serialize;
use std::fmt;
use vsfs_types::{BlockNumber, InodeIndex};

// ── Mode ────────────────────────────────────────────────────────────────────

/// Whether passes may mutate the image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Read-only: report findings, touch nothing.
    Check,
    /// Repair in place as findings are made.
    Repair,
}

impl Mode {
    #[must_use]
    pub fn repairs(self) -> bool {
        self == Self::Repair
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Check => write!(f, "Check only"),
            Self::Repair => write!(f, "Check and fix"),
        }
    }
}

// ── Passes ──────────────────────────────────────────────────────────────────

/// The five structural passes, in driver order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Superblock,
    InodeBitmap,
    DataBitmap,
    DuplicateBlocks,
    BadBlocks,
}

impl Pass {
    pub const ALL: [Self; 5] = [
        Self::Superblock,
        Self::InodeBitmap,
        Self::DataBitmap,
        Self::DuplicateBlocks,
        Self::BadBlocks,
    ];

    /// Short name used in summary tables.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Superblock => "Superblock",
            Self::InodeBitmap => "Inode bitmap",
            Self::DataBitmap => "Data bitmap",
            Self::DuplicateBlocks => "Duplicate blocks",
            Self::BadBlocks => "Bad blocks",
        }
    }

    /// Section header used in the diagnostics stream.
    #[must_use]
    pub fn section(self) -> &'static str {
        match self {
            Self::Superblock => "Superblock Validation",
            Self::InodeBitmap => "Inode Bitmap Validation",
            Self::DataBitmap => "Data Bitmap Validation",
            Self::DuplicateBlocks => "Duplicate Block Check",
            Self::BadBlocks => "Bad Block Check",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Findings ────────────────────────────────────────────────────────────────

/// One structural inconsistency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// A superblock field differs from its expected constant.
    SuperblockMismatch {
        field: &'static str,
        observed: u64,
        expected: u64,
    },
    /// A live inode whose bitmap bit is clear.
    InodeMarkMissing { inode: InodeIndex },
    /// A non-live inode whose bitmap bit is set.
    InodeMarkStale { inode: InodeIndex },
    /// A root-referenced data block whose bitmap bit is clear.
    DataMarkMissing { block: BlockNumber },
    /// An unreferenced data block whose bitmap bit is set.
    DataMarkStale { block: BlockNumber },
    /// A block claimed by more than one reference.
    DuplicateReference {
        block: BlockNumber,
        first_owner: InodeIndex,
        inode: InodeIndex,
        role: RefKind,
    },
    /// A pointer naming a block beyond the end of the image.
    OutOfRangePointer {
        inode: InodeIndex,
        block: BlockNumber,
        role: RefKind,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SuperblockMismatch {
                field,
                observed,
                expected,
            } => {
                if *field == "magic number" {
                    write!(
                        f,
                        "Invalid {field} ({observed:#06X}). Expected {expected:#06X}"
                    )
                } else {
                    write!(f, "Invalid {field} ({observed}). Expected {expected}")
                }
            }
            Self::InodeMarkMissing { inode } => {
                write!(f, "Inode {inode} is live but not marked used in inode bitmap")
            }
            Self::InodeMarkStale { inode } => {
                write!(f, "Inode {inode} is not live but marked used in inode bitmap")
            }
            Self::DataMarkMissing { block } => write!(
                f,
                "Block {block} is referenced by an inode but not marked used in data bitmap"
            ),
            Self::DataMarkStale { block } => write!(
                f,
                "Block {block} is marked used in data bitmap but not referenced by any inode"
            ),
            Self::DuplicateReference {
                block,
                first_owner,
                inode,
                role,
            } => write!(
                f,
                "Block {block} ({role}) is referenced by inode {first_owner} and inode {inode}"
            ),
            Self::OutOfRangePointer { inode, block, role } => {
                write!(f, "Inode {inode} has bad {role}: {block}")
            }
        }
    }
}

/// A finding plus the repair applied for it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    #[serde(flatten)]
    pub finding: Finding,
    /// Description of the mutation made in repair mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

// ── Per-pass and per-run reports ────────────────────────────────────────────

/// Findings of one pass over the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub pass: Pass,
    pub diagnostics: Vec<Diagnostic>,
}

impl PassReport {
    #[must_use]
    pub fn new(pass: Pass) -> Self {
        Self {
            pass,
            diagnostics: Vec::new(),
        }
    }

    pub fn push(&mut self, finding: Finding, fix: Option<String>) {
        self.diagnostics.push(Diagnostic { finding, fix });
    }

    /// True iff the pass found no inconsistency (prior to any repair).
    #[must_use]
    pub fn valid(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Aggregated result of one checker invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub mode: Mode,
    /// The five passes, in driver order.
    pub passes: Vec<PassReport>,
    /// Read-only re-verification after repairs, when any were needed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_fix: Option<Vec<PassReport>>,
}

impl RunReport {
    /// True iff no pass found anything on the initial sweep.
    #[must_use]
    pub fn consistent(&self) -> bool {
        self.passes.iter().all(PassReport::valid)
    }

    /// Post-repair verdict: `None` when no re-verification ran.
    #[must_use]
    pub fn post_fix_consistent(&self) -> Option<bool> {
        self.post_fix
            .as_ref()
            .map(|passes| passes.iter().all(PassReport::valid))
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pass in &self.passes {
            writeln!(f, "\n=== {} ===", pass.pass.section())?;
            for diag in &pass.diagnostics {
                writeln!(f, "Error: {}", diag.finding)?;
                if let Some(fix) = &diag.fix {
                    writeln!(f, "Fixing: {fix}")?;
                }
            }
        }

        writeln!(f, "\n=== Consistency Check Summary ===")?;
        for pass in &self.passes {
            let status = if pass.valid() { "Valid" } else { "Errors found" };
            writeln!(f, "{}: {status}", pass.pass.label())?;
        }
        let verdict = if self.consistent() {
            "CONSISTENT"
        } else {
            "ERRORS DETECTED"
        };
        writeln!(f, "\nOverall file system status: {verdict}")?;

        if let Some(post_fix) = &self.post_fix {
            if post_fix.iter().any(|p| !p.valid()) {
                writeln!(f, "\n=== Re-running Checks After Fixes ===")?;
                for pass in post_fix {
                    for diag in &pass.diagnostics {
                        writeln!(f, "Error: {}", diag.finding)?;
                    }
                }
            }
            writeln!(f, "\n=== Post-Fix Consistency Check Summary ===")?;
            for pass in post_fix {
                let status = if pass.valid() { "Valid" } else { "Errors remain" };
                writeln!(f, "{}: {status}", pass.pass.label())?;
            }
            let verdict = if self.post_fix_consistent() == Some(true) {
                "CONSISTENT"
            } else {
                "ERRORS REMAIN"
            };
            writeln!(f, "\nPost-fix file system status: {verdict}")?;
        }

        Ok(())
    }
}
