//! Header correction.
//!
//! Computes the [`CorrectionPlan`] that turns a missing or invalid header into
//! a valid one. Field values that passed validation are carried over verbatim;
//! only failed fields are replaced with configured defaults. The plan is pure
//! data: applying it and writing the result is up to the caller.
//!
//! Two splice modes exist:
//! - **Replace**: the header carries at least one declaration field, so its
//!   whole span is regenerated. Other SPDX tag lines follow the template body
//!   and unrelated comment lines are kept after the declaration, doc-comment
//!   prefixes included.
//! - **Insert**: the header is empty or unrelated to licensing, so the new
//!   declaration is inserted in front of it with a zero-length span.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::syntax::{CommentSyntax, HeaderStyle, Language};
use super::types::{
    CopyrightLine, CorrectionPlan, Declaration, EngineError, Field, RawHeader, SpdxTag, TextLine,
    ValidationOutcome,
};
use super::validate::{
    COPYRIGHT_YEAR_OUT_OF_RANGE, INVALID_YEAR_RANGE, MISSING_COPYRIGHT_YEAR, MISSING_SPDX_VERSION,
};

/// Built-in header body shared by every language without an override.
pub const DEFAULT_TEMPLATE: &str =
    "SPDX-License-Identifier: {license}\nCopyright (c) {year} {holder}\n{project}";

const PLACEHOLDERS: [&str; 4] = ["license", "year", "holder", "project"];

/// Written when an `SPDX-Version` line is required but missing.
pub const DEFAULT_SPDX_VERSION: &str = "SPDX-2.3";

lazy_static::lazy_static! {
    static ref PLACEHOLDER: Regex = Regex::new(r"\{([A-Za-z_]+)\}")
        .expect("Invalid placeholder regex");
}

/// How an invalid copyright line is repaired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStrategy {
    /// Regenerate the whole line from the current year and the default holder.
    #[default]
    WholeLine,
    /// Keep whichever of years/holder is valid and replace only the other.
    SubField,
}

/// Fallback values used when a field is missing or invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    pub license: Option<String>,
    pub holder: Option<String>,
    pub project: Option<String>,
}

/// Everything the corrector needs besides the file itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrectionOptions {
    pub defaults: Defaults,
    pub strategy: RepairStrategy,
    /// Year written into freshly generated copyright lines.
    pub current_year: i32,
    pub backup: bool,
}

impl Default for CorrectionOptions {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            strategy: RepairStrategy::default(),
            current_year: crate::utils::current_year(),
            backup: true,
        }
    }
}

/// Comment-free header body lines with `{license}`, `{year}`, `{holder}`
/// and `{project}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    lines: Vec<String>,
}

impl Template {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(|line| line.trim_end().to_string()).collect(),
        }
    }

    /// Placeholder names the corrector does not know how to fill.
    pub fn unknown_placeholders(&self) -> Vec<String> {
        self.lines
            .iter()
            .flat_map(|line| PLACEHOLDER.captures_iter(line))
            .filter_map(|captures| captures.get(1))
            .map(|name| name.as_str())
            .filter(|name| !PLACEHOLDERS.contains(name))
            .map(str::to_string)
            .collect()
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

/// The default template plus per-language overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Templates {
    default: Template,
    overrides: HashMap<Language, Template>,
}

impl Templates {
    pub fn insert(&mut self, language: Language, template: Template) {
        self.overrides.insert(language, template);
    }

    pub fn for_language(&self, language: Language) -> &Template {
        self.overrides.get(&language).unwrap_or(&self.default)
    }
}

/// One copyright line as it will be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CopyrightEntry {
    years: String,
    holder: String,
}

/// Field values resolved for rendering. `None` drops the template line.
#[derive(Debug)]
struct Resolved {
    license: Option<String>,
    copyrights: Vec<CopyrightEntry>,
    project: Option<String>,
}

/// Compute the correction for one file.
///
/// `original` must be the buffer `header` was extracted from. The returned
/// plan never touches bytes outside its span; the shebang and any prologue
/// line stay in the untouched prefix.
pub fn correct(
    original: &[u8],
    header: &RawHeader,
    declaration: &Declaration,
    outcome: &ValidationOutcome,
    template: &Template,
    options: &CorrectionOptions,
) -> Result<CorrectionPlan, EngineError> {
    let resolved = Resolved {
        license: resolve_license(declaration, outcome, options)?,
        copyrights: resolve_copyrights(declaration, outcome, options)?,
        project: resolve_project(declaration, outcome, options)?,
    };

    let eol = detect_line_ending(original, header);
    let insert = !declaration.has_fields();

    let mut body: Vec<TextLine> = fill_template(template, &resolved)
        .into_iter()
        .map(TextLine::plain)
        .collect();
    if !insert {
        body.extend(
            declaration
                .tags
                .iter()
                .map(|tag| TextLine::plain(tag.to_string().trim_end())),
        );
    }
    if outcome.has_code(MISSING_SPDX_VERSION) {
        body.push(TextLine::plain(
            SpdxTag::new("Version", DEFAULT_SPDX_VERSION).to_string(),
        ));
    }
    if body.is_empty() {
        // Nothing resolved at all: an absent, optional declaration with no defaults.
        return Err(EngineError::MissingDefault {
            field: Field::License,
        });
    }
    if !insert && !declaration.free_text.is_empty() {
        body.push(TextLine::plain(""));
        body.extend(declaration.free_text.iter().cloned());
    }

    let mut new_header_text = String::new();
    if !header.prefix_terminated {
        new_header_text.push_str(eol);
    }
    new_header_text.push_str(&render(&body, &header.syntax, eol)?);

    let replace_span = if insert {
        let remainder = &original[header.byte_start..];
        if first_line_has_text(remainder) {
            new_header_text.push_str(eol);
        }
        header.byte_start..header.byte_start
    } else {
        header.span()
    };

    Ok(CorrectionPlan {
        new_header_text,
        replace_span,
        backup_requested: options.backup,
    })
}

fn resolve_license(
    declaration: &Declaration,
    outcome: &ValidationOutcome,
    options: &CorrectionOptions,
) -> Result<Option<String>, EngineError> {
    if let Some(existing) = &declaration.license_identifier
        && !outcome.has_error_on(Field::License)
    {
        return Ok(Some(existing.clone()));
    }
    fallback(
        options.defaults.license.as_deref(),
        outcome.has_error_on(Field::License),
        Field::License,
    )
}

fn resolve_project(
    declaration: &Declaration,
    outcome: &ValidationOutcome,
    options: &CorrectionOptions,
) -> Result<Option<String>, EngineError> {
    if let Some(existing) = &declaration.project_attribution {
        return Ok(Some(existing.clone()));
    }
    fallback(
        options.defaults.project.as_deref(),
        outcome.has_error_on(Field::Attribution),
        Field::Attribution,
    )
}

/// Use the default if there is one; without it, a field that failed
/// validation is fatal and an optional one is left out.
fn fallback(
    default: Option<&str>,
    required: bool,
    field: Field,
) -> Result<Option<String>, EngineError> {
    match default.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Ok(Some(value.to_string())),
        None if required => Err(EngineError::MissingDefault { field }),
        None => Ok(None),
    }
}

fn resolve_copyrights(
    declaration: &Declaration,
    outcome: &ValidationOutcome,
    options: &CorrectionOptions,
) -> Result<Vec<CopyrightEntry>, EngineError> {
    let current_year = options.current_year.to_string();
    let default_holder = || -> Result<String, EngineError> {
        fallback(options.defaults.holder.as_deref(), true, Field::Copyright)?
            .ok_or(EngineError::MissingDefault {
                field: Field::Copyright,
            })
    };

    if declaration.copyright_lines.is_empty() {
        let Some(holder) = fallback(
            options.defaults.holder.as_deref(),
            outcome.has_error_on(Field::Copyright),
            Field::Copyright,
        )?
        else {
            return Ok(Vec::new());
        };
        return Ok(vec![CopyrightEntry {
            years: current_year,
            holder,
        }]);
    }

    let mut entries: Vec<CopyrightEntry> = Vec::new();
    for (index, line) in declaration.copyright_lines.iter().enumerate() {
        let entry = if !outcome.has_error_on_line(index) {
            kept(line)
        } else {
            match options.strategy {
                RepairStrategy::WholeLine => CopyrightEntry {
                    years: current_year.clone(),
                    holder: default_holder()?,
                },
                RepairStrategy::SubField => CopyrightEntry {
                    years: if years_failed(outcome, index) {
                        current_year.clone()
                    } else {
                        line.years_text.clone()
                    },
                    holder: if line.holder.is_empty() {
                        default_holder()?
                    } else {
                        line.holder.clone()
                    },
                },
            }
        };

        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }

    Ok(entries)
}

fn kept(line: &CopyrightLine) -> CopyrightEntry {
    CopyrightEntry {
        years: line.years_text.clone(),
        holder: line.holder.clone(),
    }
}

fn years_failed(outcome: &ValidationOutcome, index: usize) -> bool {
    outcome.errors.iter().any(|issue| {
        issue.line == Some(index)
            && matches!(
                issue.code,
                MISSING_COPYRIGHT_YEAR | COPYRIGHT_YEAR_OUT_OF_RANGE | INVALID_YEAR_RANGE
            )
    })
}

/// Fill the template, repeating the copyright line per entry and dropping
/// lines whose field did not resolve.
fn fill_template(template: &Template, resolved: &Resolved) -> Vec<String> {
    let mut body = Vec::new();

    for line in &template.lines {
        if line.contains("{year}") || line.contains("{holder}") {
            for entry in &resolved.copyrights {
                let filled = fill_line(line, resolved)
                    .replace("{year}", &entry.years)
                    .replace("{holder}", &entry.holder);
                body.push(filled.trim_end().to_string());
            }
            continue;
        }

        if line.contains("{license}") && resolved.license.is_none() {
            continue;
        }
        if line.contains("{project}") && resolved.project.is_none() {
            continue;
        }
        body.push(fill_line(line, resolved));
    }

    body
}

fn fill_line(line: &str, resolved: &Resolved) -> String {
    line.replace("{license}", resolved.license.as_deref().unwrap_or_default())
        .replace("{project}", resolved.project.as_deref().unwrap_or_default())
}

/// Wrap body lines in comment delimiters, each line ending in `eol`.
///
/// A block header falls back to line comments when a line carries a
/// doc-comment prefix or contains the block terminator. Without line
/// comments to fall back to, a terminator in the text is an error.
fn render(body: &[TextLine], syntax: &CommentSyntax, eol: &str) -> Result<String, EngineError> {
    let mut block = match (syntax.style, syntax.line, syntax.block) {
        (_, None, Some(block)) | (HeaderStyle::Block, _, Some(block)) => Some(block),
        _ => None,
    };
    if let Some(delimiters) = block
        && let Some(line) = body
            .iter()
            .find(|line| line.marker.is_some() || line.text.contains(delimiters.close))
    {
        if syntax.line.is_none() {
            return Err(EngineError::CommentCloseInText {
                close: delimiters.close,
                line: line.text.clone(),
            });
        }
        block = None;
    }

    let mut lines: Vec<String> = Vec::with_capacity(body.len() + 2);
    match (block, syntax.line) {
        (Some(block), _) => {
            let continuation = block.continuation.unwrap_or("");
            lines.push(block.open.to_string());
            for line in body {
                if line.text.is_empty() {
                    lines.push(continuation.trim_end().to_string());
                } else {
                    lines.push(format!("{}{}", continuation, line.text));
                }
            }
            let indent = if continuation.trim().is_empty() {
                ""
            } else {
                let trimmed = continuation.trim_start();
                &continuation[..continuation.len() - trimmed.len()]
            };
            lines.push(format!("{}{}", indent, block.close));
        }
        (None, Some(token)) => {
            for line in body {
                let prefix = line.marker.as_deref().unwrap_or(token);
                if line.text.is_empty() {
                    lines.push(prefix.to_string());
                } else {
                    lines.push(format!("{} {}", prefix, line.text));
                }
            }
        }
        // Unreachable for syntaxes from the table: every entry has a delimiter.
        (None, None) => lines.extend(body.iter().map(|line| line.text.clone())),
    }

    let mut text = lines.join(eol);
    text.push_str(eol);
    Ok(text)
}

/// Line ending of the header region, or the file's dominant one when there
/// is no header. Ties go to `\n`.
fn detect_line_ending(original: &[u8], header: &RawHeader) -> &'static str {
    let header_region = &original[header.span()];
    let region = if header_region.contains(&b'\n') {
        header_region
    } else {
        original
    };

    let mut crlf = 0usize;
    let mut lf = 0usize;
    for (i, &byte) in region.iter().enumerate() {
        if byte == b'\n' {
            if i > 0 && region[i - 1] == b'\r' {
                crlf += 1;
            } else {
                lf += 1;
            }
        }
    }

    if crlf > lf { "\r\n" } else { "\n" }
}

fn first_line_has_text(remainder: &[u8]) -> bool {
    remainder
        .iter()
        .take_while(|&&b| b != b'\n')
        .any(|b| !b.is_ascii_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::extract::extract;
    use crate::declaration::licenses::LicenseList;
    use crate::declaration::parse::parse;
    use crate::declaration::types::DeclarationStyle;
    use crate::declaration::validate::{RuleSet, validate};

    const YEAR: i32 = 2024;

    fn options() -> CorrectionOptions {
        CorrectionOptions {
            defaults: Defaults {
                license: Some("MIT".to_string()),
                holder: Some("Acme".to_string()),
                project: Some("Widget".to_string()),
            },
            strategy: RepairStrategy::WholeLine,
            current_year: YEAR,
            backup: false,
        }
    }

    fn rules() -> RuleSet {
        RuleSet {
            max_year: Some(YEAR),
            ..RuleSet::default()
        }
    }

    /// Run the full pipeline once; `None` when the file is already valid.
    fn fix(content: &[u8], language: Language, options: &CorrectionOptions) -> Option<Vec<u8>> {
        let header = extract(content, language).unwrap();
        let declaration = parse(&header);
        let outcome = validate(&declaration, &rules(), &LicenseList::embedded());
        if outcome.valid && declaration.declaration_style != DeclarationStyle::Absent {
            return None;
        }
        let plan = correct(
            content,
            &header,
            &declaration,
            &outcome,
            &Template::default(),
            options,
        )
        .unwrap();
        Some(plan.apply(content).unwrap())
    }

    fn fix_str(content: &str, language: Language) -> String {
        let fixed = fix(content.as_bytes(), language, &options()).expect("expected a correction");
        String::from_utf8(fixed).unwrap()
    }

    fn assert_idempotent(fixed: &[u8], language: Language) {
        assert_eq!(
            fix(fixed, language, &options()),
            None,
            "second pass changed:\n{}",
            String::from_utf8_lossy(fixed)
        );
    }

    #[test]
    fn test_empty_python_file() {
        let header = extract(b"", Language::Python).unwrap();
        let declaration = parse(&header);
        let outcome = validate(&declaration, &rules(), &LicenseList::embedded());
        assert!(outcome.has_code("missing-license"));
        assert!(outcome.has_code("missing-copyright"));

        let plan = correct(
            b"",
            &header,
            &declaration,
            &outcome,
            &Template::default(),
            &options(),
        )
        .unwrap();
        assert_eq!(plan.replace_span, 0..0);
        assert_eq!(
            plan.new_header_text,
            "# SPDX-License-Identifier: MIT\n# Copyright (c) 2024 Acme\n# Widget\n"
        );
        assert_idempotent(&plan.apply(b"").unwrap(), Language::Python);
    }

    #[test]
    fn test_future_year_replaced_whole_line() {
        let fixed = fix_str("// Copyright (c) 2031 Acme\nconst x = 1;\n", Language::JavaScript);
        assert_eq!(
            fixed,
            "// SPDX-License-Identifier: MIT\n// Copyright (c) 2024 Acme\n// Widget\nconst x = 1;\n"
        );
        assert_idempotent(fixed.as_bytes(), Language::JavaScript);
    }

    #[test]
    fn test_whole_line_uses_default_holder() {
        let fixed = fix_str(
            "// SPDX-License-Identifier: MIT\n// Copyright (c) 1931 Someone Else\n",
            Language::Go,
        );
        assert!(fixed.contains("// Copyright (c) 2024 Acme\n"));
        assert!(!fixed.contains("Someone Else"));
    }

    #[test]
    fn test_sub_field_keeps_holder() {
        let options = CorrectionOptions {
            strategy: RepairStrategy::SubField,
            ..options()
        };
        let content = b"// SPDX-License-Identifier: MIT\n// Copyright (c) 1931 Someone Else\n";
        let fixed = String::from_utf8(fix(content, Language::Go, &options).unwrap()).unwrap();
        assert!(fixed.contains("// Copyright (c) 2024 Someone Else\n"));
    }

    #[test]
    fn test_valid_fields_preserved_verbatim() {
        let content = "# SPDX-License-Identifier: apache-2.0\n# Copyright 2019-2021, 2023 Old Corp\nimport os\n";
        let fixed = fix_str(&content.replace("apache-2.0", "Bogus-1.0"), Language::Python);
        assert!(fixed.contains("# SPDX-License-Identifier: MIT\n"));
        assert!(fixed.contains("# Copyright (c) 2019-2021, 2023 Old Corp\n"));
        assert!(fixed.ends_with("import os\n"));
    }

    #[test]
    fn test_existing_attribution_kept() {
        let fixed = fix_str(
            "# SPDX-License-Identifier: Bogus\n# Copyright (c) 2020 Acme\n# Gadget\n",
            Language::Shell,
        );
        assert_eq!(
            fixed,
            "# SPDX-License-Identifier: MIT\n# Copyright (c) 2020 Acme\n# Gadget\n"
        );
    }

    #[test]
    fn test_shebang_kept_in_prefix() {
        let fixed = fix_str("#!/usr/bin/env python3\nprint('hi')\n", Language::Python);
        assert_eq!(
            fixed,
            "#!/usr/bin/env python3\n# SPDX-License-Identifier: MIT\n# Copyright (c) 2024 Acme\n# Widget\n\nprint('hi')\n"
        );
        assert_idempotent(fixed.as_bytes(), Language::Python);
    }

    #[test]
    fn test_unterminated_shebang_gets_line_ending() {
        let fixed = fix_str("#!/bin/sh", Language::Shell);
        assert_eq!(
            fixed,
            "#!/bin/sh\n# SPDX-License-Identifier: MIT\n# Copyright (c) 2024 Acme\n# Widget\n"
        );
        assert_idempotent(fixed.as_bytes(), Language::Shell);
    }

    #[test]
    fn test_c_block_rendering() {
        let fixed = fix_str("int main(void) { return 0; }\n", Language::C);
        assert_eq!(
            fixed,
            "/*\n * SPDX-License-Identifier: MIT\n * Copyright (c) 2024 Acme\n * Widget\n */\n\nint main(void) { return 0; }\n"
        );
        assert_idempotent(fixed.as_bytes(), Language::C);
    }

    #[test]
    fn test_markup_rendering() {
        let fixed = fix_str("<html></html>\n", Language::Html);
        assert_eq!(
            fixed,
            "<!--\n  SPDX-License-Identifier: MIT\n  Copyright (c) 2024 Acme\n  Widget\n-->\n\n<html></html>\n"
        );
        assert_idempotent(fixed.as_bytes(), Language::Html);
    }

    #[test]
    fn test_unrelated_comment_kept_after_insert() {
        let content = "// Helpers for parsing.\nfn main() {}\n";
        let fixed = fix_str(content, Language::Rust);
        assert_eq!(
            fixed,
            "// SPDX-License-Identifier: MIT\n// Copyright (c) 2024 Acme\n// Widget\n\n// Helpers for parsing.\nfn main() {}\n"
        );
        assert_idempotent(fixed.as_bytes(), Language::Rust);
    }

    #[test]
    fn test_free_text_kept_on_replace() {
        let content = "# Copyright (c) 2020 Acme\n#\n# Build helpers.\necho hi\n";
        let fixed = fix_str(content, Language::Shell);
        assert_eq!(
            fixed,
            "# SPDX-License-Identifier: MIT\n# Copyright (c) 2020 Acme\n# Widget\n#\n# Build helpers.\necho hi\n"
        );
        assert_idempotent(fixed.as_bytes(), Language::Shell);
    }

    #[test]
    fn test_crlf_preserved() {
        let content = "// Copyright 2031 Acme\r\nint x;\r\n";
        let fixed = fix_str(content, Language::Cpp);
        assert_eq!(
            fixed,
            "// SPDX-License-Identifier: MIT\r\n// Copyright (c) 2024 Acme\r\n// Widget\r\nint x;\r\n"
        );
        assert_idempotent(fixed.as_bytes(), Language::Cpp);
    }

    #[test]
    fn test_dominant_line_ending_without_header() {
        let content = "x = 1\r\ny = 2\r\nz = 3\n";
        let fixed = fix_str(content, Language::Python);
        assert!(fixed.starts_with("# SPDX-License-Identifier: MIT\r\n"));
        assert!(fixed.ends_with("x = 1\r\ny = 2\r\nz = 3\n"));
    }

    #[test]
    fn test_encoding_cookie_stays_first() {
        let content = "# -*- coding: utf-8 -*-\nimport os\n";
        let fixed = fix_str(content, Language::Python);
        assert!(fixed.starts_with("# -*- coding: utf-8 -*-\n# SPDX-License-Identifier: MIT\n"));
        assert_idempotent(fixed.as_bytes(), Language::Python);
    }

    #[test]
    fn test_duplicate_regenerated_lines_collapse() {
        let content = "# SPDX-License-Identifier: MIT\n# Copyright 2031 A\n# Copyright 1800 B\n";
        let fixed = fix_str(content, Language::Ruby);
        assert_eq!(fixed.matches("Copyright").count(), 1);
    }

    #[test]
    fn test_project_line_dropped_without_default() {
        let options = CorrectionOptions {
            defaults: Defaults {
                project: None,
                ..options().defaults
            },
            ..options()
        };
        let fixed = String::from_utf8(fix(b"", Language::Yaml, &options).unwrap()).unwrap();
        assert_eq!(
            fixed,
            "# SPDX-License-Identifier: MIT\n# Copyright (c) 2024 Acme\n"
        );
    }

    #[test]
    fn test_missing_default_license() {
        let header = extract(b"", Language::Python).unwrap();
        let declaration = parse(&header);
        let outcome = validate(&declaration, &rules(), &LicenseList::embedded());
        let options = CorrectionOptions {
            defaults: Defaults {
                license: None,
                ..options().defaults
            },
            ..options()
        };
        let result = correct(
            b"",
            &header,
            &declaration,
            &outcome,
            &Template::default(),
            &options,
        );
        assert_eq!(
            result,
            Err(EngineError::MissingDefault {
                field: Field::License
            })
        );
    }

    #[test]
    fn test_missing_default_holder_for_invalid_line() {
        let content = b"// SPDX-License-Identifier: MIT\n// Copyright 2031 Acme\n";
        let header = extract(content, Language::Java).unwrap();
        let declaration = parse(&header);
        let outcome = validate(&declaration, &rules(), &LicenseList::embedded());
        let options = CorrectionOptions {
            defaults: Defaults {
                holder: None,
                ..options().defaults
            },
            ..options()
        };
        let result = correct(
            content,
            &header,
            &declaration,
            &outcome,
            &Template::default(),
            &options,
        );
        assert_eq!(
            result,
            Err(EngineError::MissingDefault {
                field: Field::Copyright
            })
        );
    }

    #[test]
    fn test_custom_template() {
        let template = Template::new("SPDX-License-Identifier: {license}\nSPDX-FileCopyrightText: {year} {holder}");
        let header = extract(b"", Language::Toml).unwrap();
        let declaration = parse(&header);
        let outcome = validate(&declaration, &rules(), &LicenseList::embedded());
        let plan = correct(b"", &header, &declaration, &outcome, &template, &options()).unwrap();
        assert_eq!(
            plan.new_header_text,
            "# SPDX-License-Identifier: MIT\n# SPDX-FileCopyrightText: 2024 Acme\n"
        );
        assert_idempotent(&plan.apply(b"").unwrap(), Language::Toml);
    }

    #[test]
    fn test_template_placeholders() {
        assert!(Template::default().unknown_placeholders().is_empty());
        let template = Template::new("{license} by {author}");
        assert_eq!(template.unknown_placeholders(), vec!["author"]);
    }

    #[test]
    fn test_templates_override_per_language() {
        let mut templates = Templates::default();
        templates.insert(Language::Go, Template::new("SPDX-License-Identifier: {license}"));
        assert_eq!(templates.for_language(Language::Rust), &Template::default());
        assert_ne!(templates.for_language(Language::Go), &Template::default());
    }

    #[test]
    fn test_backup_flag_carried() {
        let header = extract(b"", Language::Python).unwrap();
        let declaration = parse(&header);
        let outcome = validate(&declaration, &rules(), &LicenseList::embedded());
        let options = CorrectionOptions {
            backup: true,
            ..options()
        };
        let plan = correct(b"", &header, &declaration, &outcome, &Template::default(), &options)
            .unwrap();
        assert!(plan.backup_requested);
    }

    #[test]
    fn test_block_terminator_in_text_falls_back_to_line_comments() {
        let content = "// Copyright 2031 Acme\n//\n// Scans src/**/*.c for headers.\nint x;\n";
        let fixed = fix_str(content, Language::C);
        assert_eq!(
            fixed,
            "// SPDX-License-Identifier: MIT\n// Copyright (c) 2024 Acme\n// Widget\n//\n// Scans src/**/*.c for headers.\nint x;\n"
        );
        assert_idempotent(fixed.as_bytes(), Language::C);
    }

    #[test]
    fn test_block_terminator_without_line_comments_is_error() {
        let header = extract(b"", Language::Css).unwrap();
        let declaration = parse(&header);
        let outcome = validate(&declaration, &rules(), &LicenseList::embedded());
        let options = CorrectionOptions {
            defaults: Defaults {
                project: Some("Styles for dist/**/*.html".to_string()),
                ..options().defaults
            },
            ..options()
        };
        let result = correct(b"", &header, &declaration, &outcome, &Template::default(), &options);
        assert_eq!(
            result,
            Err(EngineError::CommentCloseInText {
                close: "*/",
                line: "Styles for dist/**/*.html".to_string()
            })
        );
    }

    #[test]
    fn test_doc_comments_keep_their_prefix() {
        let content = "// Copyright 2031 Acme\n//! Crate docs.\n//!\n//! More docs.\nfn main() {}\n";
        let fixed = fix_str(content, Language::Rust);
        assert_eq!(
            fixed,
            "// SPDX-License-Identifier: MIT\n// Copyright (c) 2024 Acme\n// Widget\n//\n//! Crate docs.\n//!\n//! More docs.\nfn main() {}\n"
        );
        assert_idempotent(fixed.as_bytes(), Language::Rust);
    }

    #[test]
    fn test_doc_comments_force_line_style_in_block_languages() {
        let content = "// Copyright 2031 Acme\n/// Entry point.\nint main(void);\n";
        let fixed = fix_str(content, Language::C);
        assert!(fixed.starts_with("// SPDX-License-Identifier: MIT\n"));
        assert!(fixed.ends_with("/// Entry point.\nint main(void);\n"));
        assert_idempotent(fixed.as_bytes(), Language::C);
    }

    #[test]
    fn test_spdx_tags_kept_on_replace() {
        let content = "# SPDX-License-Identifier: Bogus\n# SPDX-FileCopyrightText: 2020 Acme\n# SPDX-Contributor: Jane Doe\n";
        let fixed = fix_str(content, Language::Python);
        assert_eq!(
            fixed,
            "# SPDX-License-Identifier: MIT\n# Copyright (c) 2020 Acme\n# Widget\n# SPDX-Contributor: Jane Doe\n"
        );
        assert_idempotent(fixed.as_bytes(), Language::Python);
    }

    #[test]
    fn test_required_spdx_version_is_added() {
        let strict = RuleSet {
            require_spdx_version: true,
            ..rules()
        };
        let content = b"# SPDX-License-Identifier: MIT\n# Copyright (c) 2020 Acme\n";
        let header = extract(content, Language::Shell).unwrap();
        let declaration = parse(&header);
        let outcome = validate(&declaration, &strict, &LicenseList::embedded());
        assert!(outcome.has_code(MISSING_SPDX_VERSION));

        let plan = correct(
            content,
            &header,
            &declaration,
            &outcome,
            &Template::default(),
            &options(),
        )
        .unwrap();
        assert_eq!(
            plan.new_header_text,
            "# SPDX-License-Identifier: MIT\n# Copyright (c) 2020 Acme\n# Widget\n# SPDX-Version: SPDX-2.3\n"
        );

        let fixed = plan.apply(content).unwrap();
        let header = extract(&fixed, Language::Shell).unwrap();
        let outcome = validate(&parse(&header), &strict, &LicenseList::embedded());
        assert!(outcome.valid, "{:?}", outcome.errors);
    }
}
