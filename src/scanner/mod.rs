mod count;
mod process;

use serde::Serialize;

use crate::models::FileReport;

/// What a run does with files whose header needs correcting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Report only.
    #[default]
    Check,
    /// Compute corrections without writing them.
    DryRun,
    /// Write corrections back, with a backup copy when enabled.
    Fix,
}

/// Per-run settings that are not part of the declaration engine.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub mode: Mode,
    pub max_depth: usize,
    pub max_file_size: u64,
    pub backup_suffix: String,
}

pub struct ProcessResult {
    pub files: Vec<FileReport>,
    pub excluded_count: usize,
}

pub use self::count::count;
pub use self::process::{process, process_file};
