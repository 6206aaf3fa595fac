use crate::declaration::{DeclarationEngine, FileOutcome, Inspection, Language};
use crate::models::{FileReport, FileReportBuilder, FileStatus};
use crate::scanner::{Mode, ProcessResult, ScanSettings};
use crate::utils::file::{create_backup, is_path_excluded, write_atomically};
use crate::utils::hash::calculate_sha256;
use crate::utils::language::detect_language;
use anyhow::Error;
use content_inspector::inspect;
use glob::Pattern;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;

pub fn process<P: AsRef<Path>>(
    path: P,
    settings: &ScanSettings,
    engine: &DeclarationEngine,
    progress_bar: Arc<ProgressBar>,
    exclude_patterns: &[Pattern],
) -> Result<ProcessResult, Error> {
    walk(
        path.as_ref(),
        settings.max_depth,
        settings,
        engine,
        progress_bar,
        exclude_patterns,
    )
}

fn walk(
    path: &Path,
    max_depth: usize,
    settings: &ScanSettings,
    engine: &DeclarationEngine,
    progress_bar: Arc<ProgressBar>,
    exclude_patterns: &[Pattern],
) -> Result<ProcessResult, Error> {
    if is_path_excluded(path, exclude_patterns) {
        return Ok(ProcessResult {
            files: Vec::new(),
            excluded_count: 1,
        });
    }

    let metadata = fs::metadata(path)?;
    if metadata.is_file() {
        let report = process_file(path, metadata.len(), settings, engine);
        progress_bar.inc(1);
        return Ok(ProcessResult {
            files: vec![report],
            excluded_count: 0,
        });
    }

    let mut all_files = Vec::new();
    let mut total_excluded = 0;

    let entries: Vec<_> = fs::read_dir(path)?.filter_map(Result::ok).collect();

    let mut file_entries = Vec::new();
    let mut dir_entries = Vec::new();

    for entry in entries {
        let path = entry.path();

        if is_path_excluded(&path, exclude_patterns) {
            total_excluded += 1;
            continue;
        }

        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => file_entries.push((path, metadata.len())),
            Ok(metadata) if metadata.is_dir() => dir_entries.push(path),
            _ => continue,
        }
    }
    file_entries.sort();
    dir_entries.sort();

    // One task per file; the engine is shared read-only.
    all_files.append(
        &mut file_entries
            .par_iter()
            .map(|(path, size)| {
                let report = process_file(path, *size, settings, engine);
                progress_bar.inc(1);
                report
            })
            .collect(),
    );

    if max_depth > 0 {
        for path in dir_entries {
            match walk(
                &path,
                max_depth - 1,
                settings,
                engine,
                progress_bar.clone(),
                exclude_patterns,
            ) {
                Ok(mut result) => {
                    all_files.append(&mut result.files);
                    total_excluded += result.excluded_count;
                }
                Err(e) => warn!("Error processing directory {}: {}", path.display(), e),
            }
        }
    }

    Ok(ProcessResult {
        files: all_files,
        excluded_count: total_excluded,
    })
}

/// Run the pipeline on one file and, in fix mode, write the result back.
///
/// Never fails: every problem ends up on the returned report.
pub fn process_file(
    path: &Path,
    size: u64,
    settings: &ScanSettings,
    engine: &DeclarationEngine,
) -> FileReport {
    let path_str = path.to_string_lossy().to_string();

    if size > settings.max_file_size {
        return FileReport::skipped(
            path_str,
            size,
            format!(
                "File size {} exceeds limit of {} bytes",
                size, settings.max_file_size
            ),
        );
    }

    let buffer = match fs::read(path) {
        Ok(buffer) => buffer,
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            return FileReport::failed(path_str, format!("Failed to read file: {}", e));
        }
    };

    if inspect(&buffer).is_binary() {
        debug!("Skipping binary file {}", path.display());
        return FileReport::skipped(path_str, size, "Binary file");
    }

    let Some(language) = detect_language(path, &buffer) else {
        debug!("Skipping {}: language not detected", path.display());
        return FileReport::skipped(path_str, size, "Language not detected");
    };

    let mut builder = FileReportBuilder::default();
    builder
        .path(path_str)
        .language(Some(language))
        .size(size)
        .sha256_before(Some(calculate_sha256(&buffer)));

    match engine.process(&buffer, language) {
        FileOutcome::AlreadyValid(inspection) => {
            add_inspection(&mut builder, &inspection);
            builder.status(FileStatus::Valid);
        }
        FileOutcome::Skipped { reason } => {
            debug!("Skipping {}: {}", path.display(), reason);
            builder.status(FileStatus::Skipped).reason(Some(reason));
        }
        FileOutcome::Failed { inspection, reason } => {
            warn!("Cannot correct {}: {}", path.display(), reason);
            if let Some(inspection) = &inspection {
                add_inspection(&mut builder, inspection);
            }
            builder.status(FileStatus::Failed).reason(Some(reason));
        }
        FileOutcome::Corrected {
            inspection,
            plan,
            corrected,
        } => {
            add_inspection(&mut builder, &inspection);
            let status = match settings.mode {
                Mode::Check if inspection.validation.valid => FileStatus::Valid,
                Mode::Check => FileStatus::Invalid,
                Mode::DryRun => FileStatus::WouldCorrect,
                Mode::Fix => {
                    match write_correction(path, &corrected, plan.backup_requested, settings, language) {
                        Ok(backup) => {
                            builder.backup_path(backup);
                            FileStatus::Corrected
                        }
                        Err(e) => {
                            warn!("Failed to write {}: {:#}", path.display(), e);
                            builder.reason(Some(format!("{:#}", e)));
                            FileStatus::Failed
                        }
                    }
                }
            };

            if settings.mode != Mode::Check {
                builder
                    .header_after(Some(plan.new_header_text))
                    .sha256_after(Some(calculate_sha256(&corrected)));
            }
            builder.status(status);
        }
    }

    builder
        .build()
        .expect("FileReport not completely initialized")
}

fn add_inspection(builder: &mut FileReportBuilder, inspection: &Inspection) {
    builder
        .declaration(Some(inspection.declaration.clone()))
        .errors(inspection.validation.errors.clone())
        .warnings(inspection.validation.warnings.clone());
    if !inspection.header.is_empty() {
        builder.header_before(Some(inspection.header.text.clone()));
    }
}

/// Back up the original if requested, then replace it. Returns the backup path.
fn write_correction(
    path: &Path,
    corrected: &[u8],
    backup: bool,
    settings: &ScanSettings,
    language: Language,
) -> Result<Option<String>, Error> {
    let backup_path = if backup {
        let backup_path = create_backup(path, &settings.backup_suffix)?;
        info!("Backed up {} to {}", path.display(), backup_path.display());
        Some(backup_path.to_string_lossy().to_string())
    } else {
        None
    };

    write_atomically(path, corrected)?;
    info!("Corrected {} header in {}", language, path.display());
    Ok(backup_path)
}
