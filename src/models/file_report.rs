use derive_builder::Builder;
use serde::Serialize;

use crate::declaration::{Declaration, Issue, Language};

/// Where a file ended up after one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    /// The header was already valid; nothing to do.
    Valid,
    /// The header was invalid and check mode left it alone.
    Invalid,
    /// Dry run: a correction was computed but not written.
    WouldCorrect,
    /// The corrected content was written back.
    Corrected,
    Skipped,
    Failed,
}

impl FileStatus {
    /// Whether the file is in a passing state at the end of the run.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Valid | Self::Corrected | Self::Skipped)
    }
}

#[derive(Debug, Clone, Builder, Serialize)]
#[builder(build_fn(skip))]
pub struct FileReport {
    pub path: String,
    #[builder(default)]
    pub language: Option<Language>,
    pub status: FileStatus,
    #[builder(default)]
    pub size: u64,
    #[builder(default)]
    pub declaration: Option<Declaration>,
    #[builder(default)]
    pub errors: Vec<Issue>,
    #[builder(default)]
    pub warnings: Vec<Issue>,
    #[builder(default)]
    pub sha256_before: Option<String>,
    #[builder(default)]
    pub sha256_after: Option<String>,
    #[builder(default)]
    pub header_before: Option<String>,
    #[builder(default)]
    pub header_after: Option<String>,
    #[builder(default)]
    pub backup_path: Option<String>,
    /// Why the file was skipped or failed.
    #[builder(default)]
    pub reason: Option<String>,
}

impl FileReportBuilder {
    pub fn build(&self) -> Result<FileReport, String> {
        Ok(FileReport {
            path: self.path.clone().ok_or("Missing field: path")?,
            language: self.language.flatten(),
            status: self.status.ok_or("Missing field: status")?,
            size: self.size.unwrap_or_default(),
            declaration: self.declaration.clone().flatten(),
            errors: self.errors.clone().unwrap_or_default(),
            warnings: self.warnings.clone().unwrap_or_default(),
            sha256_before: self.sha256_before.clone().flatten(),
            sha256_after: self.sha256_after.clone().flatten(),
            header_before: self.header_before.clone().flatten(),
            header_after: self.header_after.clone().flatten(),
            backup_path: self.backup_path.clone().flatten(),
            reason: self.reason.clone().flatten(),
        })
    }
}

impl FileReport {
    /// Report for a file the pipeline never looked at.
    pub fn skipped(path: String, size: u64, reason: impl Into<String>) -> Self {
        Self {
            path,
            language: None,
            status: FileStatus::Skipped,
            size,
            declaration: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            sha256_before: None,
            sha256_after: None,
            header_before: None,
            header_after: None,
            backup_path: None,
            reason: Some(reason.into()),
        }
    }

    pub fn failed(path: String, reason: impl Into<String>) -> Self {
        Self {
            status: FileStatus::Failed,
            ..Self::skipped(path, 0, reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_path_and_status() {
        assert!(FileReportBuilder::default().build().is_err());
        assert!(
            FileReportBuilder::default()
                .path("a.py".to_string())
                .build()
                .is_err()
        );

        let report = FileReportBuilder::default()
            .path("a.py".to_string())
            .status(FileStatus::Valid)
            .language(Some(Language::Python))
            .build()
            .unwrap();
        assert_eq!(report.language, Some(Language::Python));
        assert!(report.errors.is_empty());
        assert_eq!(report.backup_path, None);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&FileStatus::WouldCorrect).unwrap(),
            "\"would_correct\""
        );
        assert!(FileStatus::Skipped.is_ok());
        assert!(!FileStatus::WouldCorrect.is_ok());
        assert!(!FileStatus::Invalid.is_ok());
    }

    #[test]
    fn test_failed_report_keeps_reason() {
        let report = FileReport::failed("x.go".to_string(), "Permission denied");
        assert_eq!(report.status, FileStatus::Failed);
        assert_eq!(report.reason.as_deref(), Some("Permission denied"));
    }
}
