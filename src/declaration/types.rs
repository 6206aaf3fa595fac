//! Core types for the declaration engine.
//!
//! This module defines:
//! - The extracted header block ([`RawHeader`]) with its exact byte span
//! - The parsed declaration ([`Declaration`], [`CopyrightLine`], [`YearRange`])
//! - Validation results ([`ValidationOutcome`], [`Issue`])
//! - The computed rewrite ([`CorrectionPlan`])
//! - The engine error type ([`EngineError`])

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use super::syntax::{CommentSyntax, Language};

/// The leading comment block of one file, as found by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    /// The exact header text, decoded lossily from `content[byte_start..byte_end]`.
    pub text: String,
    /// Offset of the first header byte (after any BOM, shebang and prologue).
    pub byte_start: usize,
    /// Offset one past the last header byte, including the final line terminator.
    pub byte_end: usize,
    /// The shebang line without its terminator.
    pub shebang: Option<String>,
    /// A prologue line that must stay in front of the header (encoding
    /// cookie, XML declaration, PHP open tag), without its terminator.
    pub pragma: Option<String>,
    /// Whether the bytes before `byte_start` are empty (or only a BOM) or
    /// end with a line terminator.
    pub prefix_terminated: bool,
    /// The comment syntax the block was extracted with.
    pub syntax: CommentSyntax,
}

impl RawHeader {
    pub fn had_shebang(&self) -> bool {
        self.shebang.is_some()
    }

    pub fn span(&self) -> Range<usize> {
        self.byte_start..self.byte_end
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// How a declaration shows up in the header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationStyle {
    /// Markers sit on dedicated header lines.
    Header,
    /// A marker appears mid-line after other comment text.
    Inline,
    /// The header block is empty.
    Absent,
}

/// A single year or an inclusive `start-end` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    pub start: i32,
    pub end: Option<i32>,
}

impl YearRange {
    pub fn single(year: i32) -> Self {
        Self {
            start: year,
            end: None,
        }
    }

    pub fn last(&self) -> i32 {
        self.end.unwrap_or(self.start)
    }

    pub fn is_ordered(&self) -> bool {
        self.end.is_none_or(|end| end >= self.start)
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}-{}", self.start, end),
            None => write!(f, "{}", self.start),
        }
    }
}

/// One copyright statement from the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyrightLine {
    /// Parsed years in the order written. Empty when the line had no year.
    pub years: Vec<YearRange>,
    /// The year token exactly as written (e.g. `2019-2021, 2023`).
    pub years_text: String,
    /// Everything after the years, trimmed.
    pub holder: String,
}

/// An `SPDX-<Name>: <value>` line other than the license and copyright fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpdxTag {
    /// Tag name as written, without the `SPDX-` prefix (e.g. `Contributor`).
    pub name: String,
    pub value: String,
}

impl SpdxTag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for SpdxTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SPDX-{}: {}", self.name, self.value)
    }
}

/// A header comment line that carries no declaration field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextLine {
    pub text: String,
    /// Doc-comment prefix the line was written with (`///`, `//!`, `##`),
    /// when it differs from the plain line-comment token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

impl TextLine {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marker: None,
        }
    }
}

/// License, copyright and attribution fields recognized in a header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    /// The first license-identifier value, exactly as written.
    pub license_identifier: Option<String>,
    /// Copyright statements in file order.
    pub copyright_lines: Vec<CopyrightLine>,
    pub project_attribution: Option<String>,
    pub declaration_style: DeclarationStyle,
    /// Values of license-identifier lines after the first one.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub duplicate_license_lines: Vec<String>,
    /// Other `SPDX-` tag lines (`SPDX-Version`, `SPDX-Contributor`, ...) in file order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<SpdxTag>,
    /// Unrecognized comment lines that are not the project attribution.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub free_text: Vec<TextLine>,
}

impl Declaration {
    pub fn absent() -> Self {
        Self {
            license_identifier: None,
            copyright_lines: Vec::new(),
            project_attribution: None,
            declaration_style: DeclarationStyle::Absent,
            duplicate_license_lines: Vec::new(),
            tags: Vec::new(),
            free_text: Vec::new(),
        }
    }

    /// Whether any license, copyright or other SPDX tag line was recognized.
    pub fn has_fields(&self) -> bool {
        self.license_identifier.is_some() || !self.copyright_lines.is_empty() || !self.tags.is_empty()
    }

    /// Value of the first tag called `name`, compared case-insensitively.
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.is(name))
            .map(|tag| tag.value.as_str())
    }

    pub fn spdx_version(&self) -> Option<&str> {
        self.tag("Version")
    }
}

/// The part of a declaration an issue refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    License,
    Copyright,
    Attribution,
    Declaration,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::License => "license",
            Self::Copyright => "copyright",
            Self::Attribution => "attribution",
            Self::Declaration => "declaration",
        };
        f.write_str(name)
    }
}

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub field: Field,
    /// Stable kebab-case rule name, e.g. `missing-license`.
    pub code: &'static str,
    pub message: String,
    /// Index into `Declaration::copyright_lines` for per-line copyright issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Issue {
    pub fn new(field: Field, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            code,
            message: message.into(),
            line: None,
        }
    }

    pub fn on_line(mut self, index: usize) -> Self {
        self.line = Some(index);
        self
    }
}

/// Result of validating one declaration.
///
/// `valid` is true iff `errors` is empty; warnings never affect validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationOutcome {
    pub fn new(errors: Vec<Issue>, warnings: Vec<Issue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    pub fn has_error_on(&self, field: Field) -> bool {
        self.errors.iter().any(|issue| issue.field == field)
    }

    /// Whether the copyright line at `index` has its own error.
    pub fn has_error_on_line(&self, index: usize) -> bool {
        self.errors
            .iter()
            .any(|issue| issue.field == Field::Copyright && issue.line == Some(index))
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .any(|issue| issue.code == code)
    }
}

/// The replacement text and span that turn an invalid header into a valid one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionPlan {
    pub new_header_text: String,
    pub replace_span: Range<usize>,
    pub backup_requested: bool,
}

impl CorrectionPlan {
    /// Splice the new header into `original`.
    ///
    /// Bytes outside `replace_span` are copied unchanged.
    pub fn apply(&self, original: &[u8]) -> Result<Vec<u8>, EngineError> {
        let Range { start, end } = self.replace_span.clone();
        if start > end || end > original.len() {
            return Err(EngineError::InvalidSpan {
                start,
                end,
                len: original.len(),
            });
        }

        let mut output =
            Vec::with_capacity(original.len() - (end - start) + self.new_header_text.len());
        output.extend_from_slice(&original[..start]);
        output.extend_from_slice(self.new_header_text.as_bytes());
        output.extend_from_slice(&original[end..]);
        Ok(output)
    }
}

/// Errors raised by the declaration engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The language has no comment syntax to wrap a header in.
    UnsupportedLanguage(Language),

    /// The corrector could not resolve a required field from the file or the defaults.
    MissingDefault { field: Field },

    /// A correction span does not fit the buffer. Indicates an engine bug.
    InvalidSpan { start: usize, end: usize, len: usize },

    /// A header line contains the closing delimiter of the only comment
    /// style available, so it cannot be written back safely.
    CommentCloseInText { close: &'static str, line: String },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedLanguage(language) => {
                write!(f, "Unsupported language for header comments: {}", language)
            }
            Self::MissingDefault { field } => {
                write!(f, "No valid value or configured default for field: {}", field)
            }
            Self::InvalidSpan { start, end, len } => write!(
                f,
                "Internal error: correction span {}..{} does not fit buffer of {} bytes",
                start, end, len
            ),
            Self::CommentCloseInText { close, line } => write!(
                f,
                "Header line contains the comment terminator '{}': {}",
                close, line
            ),
        }
    }
}

impl std::error::Error for EngineError {}
