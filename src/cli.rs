use clap::Parser;

use crate::config::CliOverrides;
use crate::scanner::Mode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory or file to check
    pub dir_path: String,

    /// Output file path
    #[arg(default_value = "output.json", short)]
    pub output_file: String,

    /// Rewrite missing or invalid headers in place
    #[arg(long)]
    pub fix: bool,

    /// With --fix, compute corrections without writing them
    #[arg(long, requires = "fix")]
    pub dry_run: bool,

    /// Config file (TOML, JSON or YAML); discovered from the scanned path if omitted
    #[arg(short, long)]
    pub config: Option<String>,

    /// Maximum recursion depth (0 means no recursion)
    #[arg(short, long)]
    pub max_depth: Option<usize>,

    /// Exclude patterns (glob patterns like "*.tmp" or "node_modules")
    #[arg(short, long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Default SPDX license expression for new headers
    #[arg(long)]
    pub license: Option<String>,

    /// Default copyright holder for new headers
    #[arg(long)]
    pub holder: Option<String>,

    /// Default project attribution line for new headers
    #[arg(long)]
    pub project: Option<String>,

    /// Accept license identifiers missing from the SPDX list (reported as warnings)
    #[arg(long)]
    pub allow_unknown: bool,

    /// Do not keep a backup copy of rewritten files
    #[arg(long)]
    pub no_backup: bool,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        match (self.fix, self.dry_run) {
            (true, true) => Mode::DryRun,
            (true, false) => Mode::Fix,
            (false, _) => Mode::Check,
        }
    }

    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            license: self.license.clone(),
            holder: self.holder.clone(),
            project: self.project.clone(),
            allow_unknown: self.allow_unknown,
            no_backup: self.no_backup,
            max_depth: self.max_depth,
            exclude: self.exclude.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_is_default_mode() {
        let cli = Cli::try_parse_from(["spdx-headers", "src"]).unwrap();
        assert_eq!(cli.mode(), Mode::Check);
        assert_eq!(cli.output_file, "output.json");
        assert_eq!(cli.max_depth, None);
    }

    #[test]
    fn test_fix_flags() {
        let cli = Cli::try_parse_from(["spdx-headers", "src", "--fix", "--dry-run"]).unwrap();
        assert_eq!(cli.mode(), Mode::DryRun);

        let cli = Cli::try_parse_from(["spdx-headers", "src", "--fix", "--no-backup"]).unwrap();
        assert_eq!(cli.mode(), Mode::Fix);
        assert!(cli.overrides().no_backup);

        assert!(Cli::try_parse_from(["spdx-headers", "src", "--dry-run"]).is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "spdx-headers",
            "src",
            "-e",
            "vendor,*.min.js",
            "--license",
            "Apache-2.0",
            "--holder",
            "Acme",
            "-m",
            "3",
        ])
        .unwrap();
        let overrides = cli.overrides();
        assert_eq!(overrides.exclude, vec!["vendor", "*.min.js"]);
        assert_eq!(overrides.license.as_deref(), Some("Apache-2.0"));
        assert_eq!(overrides.holder.as_deref(), Some("Acme"));
        assert_eq!(overrides.max_depth, Some(3));
        assert!(!overrides.allow_unknown);
    }
}
