use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::{info, warn};
use serde_json::to_string_pretty;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use spdx_headers::cli::Cli;
use spdx_headers::config::Config;
use spdx_headers::models::{ExtraData, FileStatus, Header, OUTPUT_FORMAT_VERSION, Output};
use spdx_headers::scanner::{self, Mode, ScanSettings, count, process};
use spdx_headers::utils::current_year;
use spdx_headers::utils::file::compile_exclude_patterns;

const EXIT_INVALID: u8 = 1;
const EXIT_FATAL: u8 = 2;

fn main() -> ExitCode {
    let multi_progress = init_logging();

    match run(&multi_progress) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_INVALID),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Route log output through the progress bars so lines do not tear them.
fn init_logging() -> MultiProgress {
    let logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).build();
    let level = logger.filter();
    let multi_progress = MultiProgress::new();

    match LogWrapper::new(multi_progress.clone(), logger).try_init() {
        Ok(()) => log::set_max_level(level),
        Err(e) => eprintln!("Failed to initialize logging: {}", e),
    }
    multi_progress
}

/// Returns whether every file ended up valid, corrected or skipped.
fn run(multi_progress: &MultiProgress) -> Result<bool> {
    let cli = Cli::parse();
    let start_time = Utc::now();

    let scan_root = Path::new(&cli.dir_path);
    if !scan_root.exists() {
        bail!("Path does not exist: {}", scan_root.display());
    }

    let (mut config, config_path) =
        Config::resolve(cli.config.as_deref().map(Path::new), scan_root)?;
    config.apply_cli_overrides(&cli.overrides());
    let year = current_year();
    config
        .validate_for_year(year)
        .context("Invalid configuration")?;
    match &config_path {
        Some(path) => println!("Using configuration from {}", path.display()),
        None => println!("Using default configuration"),
    }

    let engine = config.build_engine(year)?;
    let exclude_patterns = compile_exclude_patterns(&config.scanner.exclude);
    println!("Exclusion patterns: {:?}", config.scanner.exclude);

    let (total_files, excluded_count) =
        count(scan_root, config.scanner.max_depth, &exclude_patterns)
            .with_context(|| format!("Failed to walk {}", scan_root.display()))?;
    println!(
        "Found {} files ({} items excluded)",
        total_files, excluded_count
    );

    let mode = cli.mode();
    let settings = ScanSettings {
        mode,
        max_depth: config.scanner.max_depth,
        max_file_size: config.scanner.max_file_size,
        backup_suffix: config.correction.backup_suffix.clone(),
    };

    let progress_bar = create_progress_bar(multi_progress, total_files);
    let scan_result = process(
        scan_root,
        &settings,
        &engine,
        Arc::clone(&progress_bar),
        &exclude_patterns,
    )?;
    progress_bar.finish_with_message("Check complete!");

    let all_ok = scan_result.files.iter().all(|file| file.status.is_ok());
    let end_time = Utc::now();
    let output = create_output(
        start_time,
        end_time,
        mode,
        engine.licenses().version().unwrap_or("unknown"),
        scan_result,
    );
    log_summary(&output);
    write_output(&cli.output_file, &output)?;

    println!("JSON output written to {}", cli.output_file);
    Ok(all_ok)
}

fn create_progress_bar(multi_progress: &MultiProgress, total_files: usize) -> Arc<ProgressBar> {
    let progress_bar = multi_progress.add(ProgressBar::new(total_files as u64));
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files checked ({eta})")
            .expect("Failed to create progress bar style")
            .progress_chars("#>-"),
    );
    Arc::new(progress_bar)
}

fn create_output(
    start_time: chrono::DateTime<Utc>,
    end_time: chrono::DateTime<Utc>,
    mode: Mode,
    license_list_version: &str,
    scan_result: scanner::ProcessResult,
) -> Output {
    let duration = (end_time - start_time).num_nanoseconds().unwrap_or(0) as f64 / 1_000_000_000.0;

    let extra_data = ExtraData {
        files_count: scan_result.files.len(),
        excluded_count: scan_result.excluded_count,
        license_list_version: license_list_version.to_string(),
        status_counts: ExtraData::count_statuses(&scan_result.files),
    };

    let errors: Vec<String> = scan_result
        .files
        .iter()
        .filter(|file| file.status == FileStatus::Failed)
        .map(|file| {
            format!(
                "{}: {}",
                file.path,
                file.reason.as_deref().unwrap_or("unknown error")
            )
        })
        .collect();

    Output {
        headers: vec![Header {
            tool_name: env!("CARGO_PKG_NAME").to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            start_timestamp: start_time.to_rfc3339(),
            end_timestamp: end_time.to_rfc3339(),
            duration,
            mode: serde_json::to_value(mode)
                .ok()
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_default(),
            extra_data,
            errors,
            output_format_version: OUTPUT_FORMAT_VERSION.to_string(),
        }],
        files: scan_result.files,
    }
}

fn log_summary(output: &Output) {
    for header in &output.headers {
        info!("Status counts: {:?}", header.extra_data.status_counts);
        for error in &header.errors {
            warn!("{}", error);
        }
    }
}

fn write_output(output_file: &str, output: &Output) -> Result<()> {
    let json_output = to_string_pretty(output).context("Failed to serialize output")?;
    let mut file = File::create(output_file)
        .with_context(|| format!("Failed to create output file {}", output_file))?;
    file.write_all(json_output.as_bytes())
        .with_context(|| format!("Failed to write output file {}", output_file))?;
    Ok(())
}
