//! Run configuration.
//!
//! Resolution order, highest priority first:
//! 1. CLI flags (applied via [`Config::apply_cli_overrides`])
//! 2. The config file given with `--config`, or the first of
//!    [`CONFIG_FILE_NAMES`] found walking up from the scan root
//! 3. Compiled defaults

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::declaration::expression::parse_expression;
use crate::declaration::{
    CorrectionOptions, DeclarationEngine, Defaults, Language, LicenseList, RepairStrategy, RuleSet,
    Template, Templates, UnsupportedPolicy,
};

/// Config file names looked up in each directory, in order.
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "spdx-headers.toml",
    ".spdx-headers.toml",
    "spdx-headers.json",
    "spdx-headers.yaml",
];

pub const DEFAULT_BACKUP_SUFFIX: &str = ".spdx-backup";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_DEPTH: usize = 50;

const MIN_YEAR_FLOOR: i32 = 1900;
const MAX_YEAR_CEILING: i32 = 2100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// License expression written when a file has none or an invalid one.
    pub default_license: Option<String>,
    pub copyright_holder: Option<String>,
    pub project_name: Option<String>,
    pub validation: ValidationConfig,
    pub correction: CorrectionConfig,
    pub scanner: ScannerConfig,
    /// Language name to header template text.
    pub templates: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_license: Some("MIT".to_string()),
            copyright_holder: None,
            project_name: None,
            validation: ValidationConfig::default(),
            correction: CorrectionConfig::default(),
            scanner: ScannerConfig::default(),
            templates: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub require_license: bool,
    pub require_copyright: bool,
    pub require_project_attribution: bool,
    pub min_year: i32,
    pub max_year: Option<i32>,
    pub allow_unknown_licenses: bool,
    pub require_osi_approved: bool,
    pub require_spdx_version: bool,
    /// SPDX `licenses.json` replacing the embedded list.
    pub license_list: Option<PathBuf>,
    /// SPDX `exceptions.json` replacing the embedded list.
    pub exception_list: Option<PathBuf>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let rules = RuleSet::default();
        Self {
            require_license: rules.require_license,
            require_copyright: rules.require_copyright,
            require_project_attribution: rules.require_project_attribution,
            min_year: rules.min_year,
            max_year: rules.max_year,
            allow_unknown_licenses: rules.allow_unknown_licenses,
            require_osi_approved: rules.require_osi_approved,
            require_spdx_version: rules.require_spdx_version,
            license_list: None,
            exception_list: None,
        }
    }
}

impl ValidationConfig {
    pub fn rules(&self) -> RuleSet {
        RuleSet {
            require_license: self.require_license,
            require_copyright: self.require_copyright,
            require_project_attribution: self.require_project_attribution,
            min_year: self.min_year,
            max_year: self.max_year,
            allow_unknown_licenses: self.allow_unknown_licenses,
            require_osi_approved: self.require_osi_approved,
            require_spdx_version: self.require_spdx_version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub strategy: RepairStrategy,
    pub create_backups: bool,
    pub backup_suffix: String,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            strategy: RepairStrategy::default(),
            create_backups: true,
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
    /// Glob patterns matched against the full path and the file name.
    pub exclude: Vec<String>,
    pub max_depth: usize,
    pub unsupported: UnsupportedPolicy,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            exclude: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            unsupported: UnsupportedPolicy::default(),
        }
    }
}

/// Values given on the command line; `None`/`false` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub license: Option<String>,
    pub holder: Option<String>,
    pub project: Option<String>,
    pub allow_unknown: bool,
    pub no_backup: bool,
    pub max_depth: Option<usize>,
    pub exclude: Vec<String>,
}

impl Config {
    /// Load a config file; the format follows its extension (`.toml`,
    /// `.json`, `.yaml`/`.yml`).
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let config = match extension.as_str() {
            "toml" => Self::from_toml(&content),
            "json" => serde_json::from_str(&content).map_err(anyhow::Error::from),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(anyhow::Error::from),
            other => Err(anyhow!("Unsupported config format: {:?}", other)),
        }
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// First config file found in `start` or any of its ancestors.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        let start = if start.is_file() {
            start.parent()?
        } else {
            start
        };
        start.ancestors().find_map(|dir| {
            CONFIG_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }

    /// Load the explicit config file, or the discovered one, or defaults.
    pub fn resolve(explicit: Option<&Path>, scan_root: &Path) -> Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(scan_root),
        };
        match path {
            Some(path) => Ok((Self::load(&path)?, Some(path))),
            None => Ok((Self::default(), None)),
        }
    }

    pub fn apply_cli_overrides(&mut self, cli: &CliOverrides) {
        if cli.license.is_some() {
            self.default_license = cli.license.clone();
        }
        if cli.holder.is_some() {
            self.copyright_holder = cli.holder.clone();
        }
        if cli.project.is_some() {
            self.project_name = cli.project.clone();
        }
        if cli.allow_unknown {
            self.validation.allow_unknown_licenses = true;
        }
        if cli.no_backup {
            self.correction.create_backups = false;
        }
        if let Some(max_depth) = cli.max_depth {
            self.scanner.max_depth = max_depth;
        }
        self.scanner.exclude.extend(cli.exclude.iter().cloned());
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_for_year(crate::utils::current_year())
    }

    /// Check the settings, with `current_year` as the year new copyright
    /// lines are written with.
    pub fn validate_for_year(&self, current_year: i32) -> Result<()> {
        let validation = &self.validation;
        if validation.min_year < MIN_YEAR_FLOOR {
            bail!(
                "validation.min_year must be at least {}, got {}",
                MIN_YEAR_FLOOR,
                validation.min_year
            );
        }
        if let Some(max_year) = validation.max_year {
            if max_year > MAX_YEAR_CEILING {
                bail!(
                    "validation.max_year must be at most {}, got {}",
                    MAX_YEAR_CEILING,
                    max_year
                );
            }
            if validation.min_year >= max_year {
                bail!(
                    "validation.min_year ({}) must be less than validation.max_year ({})",
                    validation.min_year,
                    max_year
                );
            }
            if max_year < current_year {
                bail!(
                    "validation.max_year ({}) is before the current year ({}); corrected headers would fail validation",
                    max_year,
                    current_year
                );
            }
        }
        if validation.min_year > current_year {
            bail!(
                "validation.min_year ({}) is after the current year ({}); corrected headers would fail validation",
                validation.min_year,
                current_year
            );
        }

        if self.scanner.max_file_size == 0 {
            bail!("scanner.max_file_size must be greater than 0");
        }
        if self.correction.create_backups && self.correction.backup_suffix.is_empty() {
            bail!("correction.backup_suffix must not be empty when backups are enabled");
        }

        if let Some(license) = self.default_license.as_deref()
            && !license.trim().is_empty()
        {
            parse_expression(license)
                .with_context(|| format!("Invalid default_license {:?}", license))?;
        }

        for (language, text) in &self.templates {
            Language::from_str(language)
                .map_err(|_| anyhow!("Unknown template language {:?}", language))?;
            let unknown = Template::new(text).unknown_placeholders();
            if !unknown.is_empty() {
                bail!(
                    "Template for {} uses unknown placeholder(s): {}",
                    language,
                    unknown.join(", ")
                );
            }
        }

        Ok(())
    }

    pub fn templates(&self) -> Result<Templates> {
        let mut templates = Templates::default();
        for (language, text) in &self.templates {
            let language = Language::from_str(language)
                .map_err(|_| anyhow!("Unknown template language {:?}", language))?;
            templates.insert(language, Template::new(text));
        }
        Ok(templates)
    }

    pub fn correction_options(&self, current_year: i32) -> CorrectionOptions {
        CorrectionOptions {
            defaults: Defaults {
                license: self.default_license.clone(),
                holder: self.copyright_holder.clone(),
                project: self.project_name.clone(),
            },
            strategy: self.correction.strategy,
            current_year,
            backup: self.correction.create_backups,
        }
    }

    /// Build the shared engine, loading a custom license list if configured.
    pub fn build_engine(&self, current_year: i32) -> Result<DeclarationEngine> {
        let licenses = LicenseList::load(
            self.validation.license_list.as_deref(),
            self.validation.exception_list.as_deref(),
        )?;

        Ok(DeclarationEngine::new(licenses, self.validation.rules())
            .with_templates(self.templates()?)
            .with_options(self.correction_options(current_year))
            .with_unsupported_policy(self.scanner.unsupported))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_license.as_deref(), Some("MIT"));
        assert_eq!(config.copyright_holder, None);
        assert!(config.correction.create_backups);
        assert_eq!(config.correction.backup_suffix, ".spdx-backup");
        assert_eq!(config.scanner.max_file_size, 10 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml(
            r#"
copyright_holder = "Acme Corp"

[validation]
require_project_attribution = true
max_year = 2030

[correction]
strategy = "sub_field"

[scanner]
exclude = ["vendor", "*.min.js"]
unsupported = "hash_comment"

[templates]
python = "SPDX-License-Identifier: {license}\nSPDX-FileCopyrightText: {year} {holder}"
"#,
        )
        .unwrap();

        assert_eq!(config.default_license.as_deref(), Some("MIT"));
        assert_eq!(config.copyright_holder.as_deref(), Some("Acme Corp"));
        assert!(config.validation.require_project_attribution);
        assert!(config.validation.require_license);
        assert_eq!(config.validation.max_year, Some(2030));
        assert_eq!(config.correction.strategy, RepairStrategy::SubField);
        assert_eq!(config.scanner.unsupported, UnsupportedPolicy::HashComment);
        assert_eq!(config.scanner.max_depth, 50);
        assert!(config.validate_for_year(2026).is_ok());
        assert!(config.templates().is_ok());
    }

    #[test]
    fn test_load_by_extension() {
        let temp_dir = TempDir::new().unwrap();

        let json_path = temp_dir.path().join("spdx-headers.json");
        fs::write(&json_path, r#"{"project_name": "Widget"}"#).unwrap();
        let config = Config::load(&json_path).unwrap();
        assert_eq!(config.project_name.as_deref(), Some("Widget"));

        let yaml_path = temp_dir.path().join("spdx-headers.yaml");
        fs::write(&yaml_path, "validation:\n  min_year: 2000\n").unwrap();
        let config = Config::load(&yaml_path).unwrap();
        assert_eq!(config.validation.min_year, 2000);

        let ini_path = temp_dir.path().join("spdx-headers.ini");
        fs::write(&ini_path, "x=1").unwrap();
        assert!(Config::load(&ini_path).is_err());
    }

    #[test]
    fn test_discover_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join(".spdx-headers.toml"), "").unwrap();

        assert_eq!(
            Config::discover(&nested),
            Some(temp_dir.path().join(".spdx-headers.toml"))
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.validation.min_year = 1800;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.validation.max_year = Some(2200);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.validation.min_year = 2020;
        config.validation.max_year = Some(2020);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scanner.max_file_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.default_license = Some("MIT AND".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config
            .templates
            .insert("cobol".to_string(), "{license}".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config
            .templates
            .insert("rust".to_string(), "{license} {author}".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_year_bounds_excluding_current_year() {
        let mut config = Config::default();
        config.validation.max_year = Some(2025);
        assert!(config.validate_for_year(2025).is_ok());
        assert!(config.validate_for_year(2026).is_err());

        let mut config = Config::default();
        config.validation.min_year = 2027;
        assert!(config.validate_for_year(2026).is_err());
        assert!(config.validate_for_year(2027).is_ok());

        config.validation.max_year = Some(2030);
        assert!(config.validate_for_year(2026).is_err());
        assert!(config.validate_for_year(2028).is_ok());

        let mut config = Config::default();
        config.validation.max_year = Some(2000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = Config::from_toml("default_license = \"Apache-2.0\"\n").unwrap();
        config.apply_cli_overrides(&CliOverrides {
            license: Some("BSD-3-Clause".to_string()),
            holder: Some("Jane Doe".to_string()),
            no_backup: true,
            exclude: vec!["target".to_string()],
            ..CliOverrides::default()
        });

        assert_eq!(config.default_license.as_deref(), Some("BSD-3-Clause"));
        assert_eq!(config.copyright_holder.as_deref(), Some("Jane Doe"));
        assert!(!config.correction.create_backups);
        assert_eq!(config.scanner.exclude, vec!["target".to_string()]);
    }

    #[test]
    fn test_build_engine_uses_settings() {
        let mut config = Config::default();
        config.validation.max_year = Some(2030);
        let engine = config.build_engine(2024).unwrap();
        assert_eq!(engine.rules().max_year, Some(2030));
        assert!(engine.licenses().license("MIT").is_some());
    }
}
