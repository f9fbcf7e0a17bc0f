//! Corpus discovery and replay.

use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::target::{run_case, CaseOutcome};

/// Aggregate outcome of one replay pass.
#[derive(Debug, Default)]
pub struct ReplayReport {
    pub parsed: usize,
    pub rejected: usize,
    pub panicked: Vec<PathBuf>,
}

impl ReplayReport {
    pub fn total(&self) -> usize {
        self.parsed + self.rejected + self.panicked.len()
    }
}

/// Expand `--file` and `--directory` arguments into one case list. Files
/// come first, then each directory's regular files in name order, so a
/// given corpus always replays in the same order.
pub fn collect_cases(files: &[PathBuf], directories: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut cases: Vec<PathBuf> = files.to_vec();
    for dir in directories {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read corpus directory {}", dir.display()))?;
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                found.push(entry.path());
            }
        }
        found.sort();
        info!("Found {} corpus files in {}", found.len(), dir.display());
        cases.extend(found);
    }
    Ok(cases)
}

/// Feed every case to the target, trapping panics so one bad case cannot
/// take down the run.
pub fn replay(cases: &[PathBuf]) -> Result<ReplayReport> {
    let mut report = ReplayReport::default();
    for case in cases {
        let data = fs::read(case).with_context(|| format!("Failed to read {}", case.display()))?;
        match catch_unwind(AssertUnwindSafe(|| run_case(&data))) {
            Ok(CaseOutcome::Parsed) => {
                debug!("{}: parsed", case.display());
                report.parsed += 1;
            }
            Ok(CaseOutcome::Rejected) => {
                debug!("{}: rejected", case.display());
                report.rejected += 1;
            }
            Err(_) => {
                error!("{}: target panicked", case.display());
                report.panicked.push(case.clone());
            }
        }
    }
    Ok(report)
}
