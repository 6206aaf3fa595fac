use std::collections::BTreeMap;

use serde::Serialize;

use super::{FileReport, FileStatus};

pub const OUTPUT_FORMAT_VERSION: &str = "1.0.0";

#[derive(Serialize, Debug)]
pub struct Output {
    pub headers: Vec<Header>,
    pub files: Vec<FileReport>,
}

#[derive(Serialize, Debug)]
pub struct Header {
    pub tool_name: String,
    pub tool_version: String,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub duration: f64,
    pub mode: String,
    pub extra_data: ExtraData,
    pub errors: Vec<String>,
    pub output_format_version: String,
}

#[derive(Serialize, Debug, Default)]
pub struct ExtraData {
    pub files_count: usize,
    pub excluded_count: usize,
    pub license_list_version: String,
    /// Number of files per final status.
    pub status_counts: BTreeMap<String, usize>,
}

impl ExtraData {
    pub fn count_statuses(files: &[FileReport]) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for file in files {
            *counts.entry(status_key(file.status)).or_insert(0) += 1;
        }
        counts
    }
}

fn status_key(status: FileStatus) -> String {
    serde_json::to_value(status)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_statuses() {
        let files = vec![
            FileReport::skipped("a.bin".to_string(), 3, "Binary file"),
            FileReport::skipped("b.bin".to_string(), 3, "Binary file"),
            FileReport::failed("c.py".to_string(), "Read error"),
        ];
        let counts = ExtraData::count_statuses(&files);
        assert_eq!(counts.get("skipped"), Some(&2));
        assert_eq!(counts.get("failed"), Some(&1));
        assert_eq!(counts.get("valid"), None);
    }
}
