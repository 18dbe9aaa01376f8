//! Run summaries.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

/// What happened to a single source image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleOutcome {
    Accepted,
    /// Expected skip, keyed by reason.
    Skipped(&'static str),
    /// Output could not be written.
    WriteFailed,
    /// The label mask broke the vocabulary range; nothing was written.
    LabelInvalid,
}

/// Counts for one split.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SplitReport {
    pub split: String,
    /// `false` when the split directory does not exist.
    pub present: bool,
    pub total: usize,
    pub accepted: usize,
    pub skipped: BTreeMap<String, usize>,
    pub write_failures: usize,
    pub label_failures: usize,
    /// Mask file stems shared by several classes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name_collisions: Vec<String>,
}

impl SplitReport {
    pub fn missing(split: &str) -> Self {
        Self {
            split: split.to_string(),
            ..Self::default()
        }
    }

    pub fn new(split: &str) -> Self {
        Self {
            split: split.to_string(),
            present: true,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: &SampleOutcome) {
        self.total += 1;
        match outcome {
            SampleOutcome::Accepted => self.accepted += 1,
            SampleOutcome::Skipped(reason) => {
                *self.skipped.entry((*reason).to_string()).or_default() += 1;
            }
            SampleOutcome::WriteFailed => self.write_failures += 1,
            SampleOutcome::LabelInvalid => self.label_failures += 1,
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }
}

/// Counts for a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input_root: String,
    pub output_root: String,
    pub classes: Vec<String>,
    pub splits: Vec<SplitReport>,
}

impl RunReport {
    pub fn accepted(&self) -> usize {
        self.splits.iter().map(|split| split.accepted).sum()
    }

    pub fn skipped(&self) -> usize {
        self.splits.iter().map(SplitReport::skipped_total).sum()
    }

    pub fn label_failures(&self) -> usize {
        self.splits.iter().map(|split| split.label_failures).sum()
    }

    pub fn write_failures(&self) -> usize {
        self.splits.iter().map(|split| split.write_failures).sum()
    }

    /// Write pretty-printed JSON to `path`, creating parent directories.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        let payload = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write report to {}", path.display()))
    }
}
