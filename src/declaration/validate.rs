//! Declaration validation.
//!
//! Every rule runs independently and all findings are collected. Errors make
//! a declaration invalid; warnings are informational only.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::expression::{check_expression, parse_expression};
use super::licenses::LicenseList;
use super::types::{Declaration, DeclarationStyle, Field, Issue, ValidationOutcome};

pub const MISSING_LICENSE: &str = "missing-license";
pub const INVALID_LICENSE_EXPRESSION: &str = "invalid-license-expression";
pub const UNKNOWN_LICENSE_IDENTIFIER: &str = "unknown-license-identifier";
pub const INVALID_EXCEPTION: &str = "invalid-exception";
pub const DEPRECATED_LICENSE_IDENTIFIER: &str = "deprecated-license-identifier";
pub const NON_OSI_LICENSE: &str = "non-osi-license";
pub const DUPLICATE_LICENSE_LINE: &str = "duplicate-license-line";
pub const MISSING_COPYRIGHT: &str = "missing-copyright";
pub const MISSING_COPYRIGHT_YEAR: &str = "missing-copyright-year";
pub const MISSING_COPYRIGHT_HOLDER: &str = "missing-copyright-holder";
pub const COPYRIGHT_YEAR_OUT_OF_RANGE: &str = "copyright-year-out-of-range";
pub const INVALID_YEAR_RANGE: &str = "invalid-year-range";
pub const MISSING_ATTRIBUTION: &str = "missing-attribution";
pub const INLINE_DECLARATION: &str = "inline-declaration";
pub const MISSING_SPDX_VERSION: &str = "missing-spdx-version";
pub const UNUSUAL_SPDX_VERSION: &str = "unusual-spdx-version";
pub const EMPTY_CONTRIBUTORS: &str = "empty-contributors";
pub const INVALID_DOWNLOAD_LOCATION: &str = "invalid-download-location";
pub const INVALID_HOMEPAGE: &str = "invalid-homepage";

lazy_static::lazy_static! {
    static ref SPDX_VERSION: Regex = Regex::new(r"(?i)^SPDX-[0-9]+\.[0-9]+$")
        .expect("Invalid SPDX version regex");

    static ref HTTP_URL: Regex = Regex::new(
        r"^https?://[A-Za-z0-9\-._~:/?#\[\]@!$&'()*+,;=]+$"
    ).expect("Invalid URL regex");
}

/// Which fields are required and how strictly they are checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    pub require_license: bool,
    pub require_copyright: bool,
    pub require_project_attribution: bool,
    pub min_year: i32,
    /// Upper year bound. `None` means the current calendar year.
    pub max_year: Option<i32>,
    /// Report identifiers missing from the license list as warnings instead of errors.
    pub allow_unknown_licenses: bool,
    pub require_osi_approved: bool,
    /// Require an `SPDX-Version` tag line.
    pub require_spdx_version: bool,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            require_license: true,
            require_copyright: true,
            require_project_attribution: false,
            min_year: 1970,
            max_year: None,
            allow_unknown_licenses: false,
            require_osi_approved: false,
            require_spdx_version: false,
        }
    }
}

impl RuleSet {
    pub fn effective_max_year(&self) -> i32 {
        self.max_year.unwrap_or_else(crate::utils::current_year)
    }

    /// Fill in an unset upper bound, leaving a configured one alone.
    pub fn with_default_max_year(mut self, year: i32) -> Self {
        self.max_year.get_or_insert(year);
        self
    }
}

/// Check a parsed declaration against `rules` and the license reference set.
pub fn validate(declaration: &Declaration, rules: &RuleSet, licenses: &LicenseList) -> ValidationOutcome {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if declaration.declaration_style == DeclarationStyle::Inline {
        warnings.push(Issue::new(
            Field::Declaration,
            INLINE_DECLARATION,
            "License or copyright marker appears inline instead of on a dedicated header line",
        ));
    }

    validate_license(declaration, rules, licenses, &mut errors, &mut warnings);
    validate_copyright(declaration, rules, &mut errors);
    validate_tags(declaration, rules, &mut errors, &mut warnings);

    if rules.require_project_attribution && declaration.project_attribution.is_none() {
        errors.push(Issue::new(
            Field::Attribution,
            MISSING_ATTRIBUTION,
            "Missing project attribution line",
        ));
    }

    ValidationOutcome::new(errors, warnings)
}

fn validate_license(
    declaration: &Declaration,
    rules: &RuleSet,
    licenses: &LicenseList,
    errors: &mut Vec<Issue>,
    warnings: &mut Vec<Issue>,
) {
    for duplicate in &declaration.duplicate_license_lines {
        warnings.push(Issue::new(
            Field::License,
            DUPLICATE_LICENSE_LINE,
            format!("Additional license identifier line ignored: {}", duplicate),
        ));
    }

    let Some(identifier) = &declaration.license_identifier else {
        if rules.require_license {
            errors.push(Issue::new(
                Field::License,
                MISSING_LICENSE,
                "Missing SPDX-License-Identifier line",
            ));
        }
        return;
    };

    let expression = match parse_expression(identifier) {
        Ok(expression) => expression,
        Err(e) => {
            errors.push(Issue::new(
                Field::License,
                INVALID_LICENSE_EXPRESSION,
                format!("Invalid license expression '{}': {}", identifier, e),
            ));
            return;
        }
    };

    let check = check_expression(&expression, licenses);

    for id in check.unknown {
        let issue = Issue::new(
            Field::License,
            UNKNOWN_LICENSE_IDENTIFIER,
            format!("Unknown license identifier: {}", id),
        );
        if rules.allow_unknown_licenses {
            warnings.push(issue);
        } else {
            errors.push(issue);
        }
    }

    for exception in check.invalid_exceptions {
        errors.push(Issue::new(
            Field::License,
            INVALID_EXCEPTION,
            format!("Not a known license exception: {}", exception),
        ));
    }

    for id in check.deprecated {
        warnings.push(Issue::new(
            Field::License,
            DEPRECATED_LICENSE_IDENTIFIER,
            format!("Deprecated license identifier: {}", id),
        ));
    }

    if rules.require_osi_approved {
        for id in check.non_osi {
            warnings.push(Issue::new(
                Field::License,
                NON_OSI_LICENSE,
                format!("License is not OSI approved: {}", id),
            ));
        }
    }
}

fn validate_tags(
    declaration: &Declaration,
    rules: &RuleSet,
    errors: &mut Vec<Issue>,
    warnings: &mut Vec<Issue>,
) {
    match declaration.spdx_version() {
        None if rules.require_spdx_version => errors.push(Issue::new(
            Field::Declaration,
            MISSING_SPDX_VERSION,
            "Missing SPDX-Version line",
        )),
        Some(version) if !SPDX_VERSION.is_match(version) => warnings.push(Issue::new(
            Field::Declaration,
            UNUSUAL_SPDX_VERSION,
            format!("Unusual SPDX version: {}", version),
        )),
        _ => {}
    }

    for tag in &declaration.tags {
        let value = tag.value.as_str();
        if tag.is("Contributor") && value.is_empty() {
            warnings.push(Issue::new(
                Field::Declaration,
                EMPTY_CONTRIBUTORS,
                "SPDX-Contributor line is empty",
            ));
        } else if tag.is("DownloadLocation") && !HTTP_URL.is_match(value) {
            warnings.push(Issue::new(
                Field::Declaration,
                INVALID_DOWNLOAD_LOCATION,
                format!("Download location is not an http(s) URL: {}", value),
            ));
        } else if tag.is("Homepage") && !HTTP_URL.is_match(value) {
            warnings.push(Issue::new(
                Field::Declaration,
                INVALID_HOMEPAGE,
                format!("Homepage is not an http(s) URL: {}", value),
            ));
        }
    }
}

fn validate_copyright(declaration: &Declaration, rules: &RuleSet, errors: &mut Vec<Issue>) {
    if declaration.copyright_lines.is_empty() {
        if rules.require_copyright {
            errors.push(Issue::new(
                Field::Copyright,
                MISSING_COPYRIGHT,
                "Missing copyright line",
            ));
        }
        return;
    }

    let min_year = rules.min_year;
    let max_year = rules.effective_max_year();

    for (index, line) in declaration.copyright_lines.iter().enumerate() {
        if line.years.is_empty() {
            errors.push(
                Issue::new(
                    Field::Copyright,
                    MISSING_COPYRIGHT_YEAR,
                    "Copyright line has no year",
                )
                .on_line(index),
            );
        }

        if line.holder.is_empty() {
            errors.push(
                Issue::new(
                    Field::Copyright,
                    MISSING_COPYRIGHT_HOLDER,
                    "Copyright line has no holder",
                )
                .on_line(index),
            );
        }

        if let Some(range) = line.years.iter().find(|range| !range.is_ordered()) {
            errors.push(
                Issue::new(
                    Field::Copyright,
                    INVALID_YEAR_RANGE,
                    format!("Year range {} ends before it starts", range),
                )
                .on_line(index),
            );
        }

        let out_of_range = line
            .years
            .iter()
            .flat_map(|range| [Some(range.start), range.end])
            .flatten()
            .find(|year| *year < min_year || *year > max_year);
        if let Some(year) = out_of_range {
            errors.push(
                Issue::new(
                    Field::Copyright,
                    COPYRIGHT_YEAR_OUT_OF_RANGE,
                    format!(
                        "Copyright year {} is outside {}-{}",
                        year, min_year, max_year
                    ),
                )
                .on_line(index),
            );
        }
    }
}
