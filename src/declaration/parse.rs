//! Declaration parsing.
//!
//! Turns the text of a [`RawHeader`] into a [`Declaration`]. Each header line
//! is stripped of its comment delimiters and then matched against the field
//! grammars in fixed precedence order:
//!
//! 1. license-identifier line (`SPDX-License-Identifier: <expression>`)
//! 2. other SPDX tag line (`SPDX-Version: SPDX-2.3`, `SPDX-Contributor: ...`)
//! 3. copyright line (`Copyright (c) <years> <holder>`, or a leading `©`)
//! 4. project attribution: the sole unrecognized line adjacent to a field line
//!
//! Parsing never fails. Unrecognized lines are free text and missing
//! structure shows up as empty fields. Doc-comment lines (`///`, `//!`) are
//! always free text and remember their prefix.

use regex::Regex;

use super::syntax::CommentSyntax;
use super::types::{
    CopyrightLine, Declaration, DeclarationStyle, RawHeader, SpdxTag, TextLine, YearRange,
};

lazy_static::lazy_static! {
    static ref LICENSE_LINE: Regex = Regex::new(
        r"(?i)(?:SPDX-)?License-Identifier\s*:\s*(?P<expression>.*)$"
    ).expect("Invalid license line regex");

    static ref TAG_LINE: Regex = Regex::new(
        r"(?i)^SPDX-(?P<name>[A-Za-z][A-Za-z0-9]*)\s*:\s*(?P<value>.*)$"
    ).expect("Invalid tag line regex");

    static ref COPYRIGHT_MARKER: Regex = Regex::new(
        r"(?i)SPDX-FileCopyrightText\s*:|\bcopyright\b|^©"
    ).expect("Invalid copyright marker regex");

    static ref COPYRIGHT_BODY: Regex = Regex::new(
        r"(?i)^\s*(?:\(c\)|©)?\s*(?P<years>\d{4}(?:\s*[-–]\s*\d{4})?(?:\s*,\s*\d{4}(?:\s*[-–]\s*\d{4})?)*)\b\s*,?\s*(?P<holder>.*)$"
    ).expect("Invalid copyright body regex");

    static ref COPYRIGHT_SYMBOL: Regex = Regex::new(r"(?i)^\s*(?:\(c\)|©)?\s*")
        .expect("Invalid copyright symbol regex");
}

/// Classification of one comment-stripped header line.
#[derive(Debug, Clone, PartialEq)]
enum HeaderLine {
    Blank,
    License { expression: String },
    Tag(SpdxTag),
    Copyright(CopyrightLine),
    Text(TextLine),
}

impl HeaderLine {
    fn is_field(&self) -> bool {
        matches!(self, Self::License { .. } | Self::Tag(_) | Self::Copyright(_))
    }
}

/// Parse the declaration fields out of an extracted header.
pub fn parse(header: &RawHeader) -> Declaration {
    if header.is_empty() {
        return Declaration::absent();
    }

    let stripped = strip_comments(&header.text, &header.syntax);
    let mut inline = false;
    let classified: Vec<HeaderLine> = stripped
        .into_iter()
        .map(|(line, doc_marker)| {
            let (kind, marker_offset) = classify(&line);
            if marker_offset.is_some_and(|offset| offset > 0) {
                inline = true;
            }
            match kind {
                HeaderLine::Blank if doc_marker.is_some() => HeaderLine::Text(TextLine {
                    text: String::new(),
                    marker: doc_marker,
                }),
                HeaderLine::Text(text) => HeaderLine::Text(TextLine {
                    marker: doc_marker,
                    ..text
                }),
                kind => kind,
            }
        })
        .collect();

    let mut declaration = Declaration {
        declaration_style: if inline {
            DeclarationStyle::Inline
        } else {
            DeclarationStyle::Header
        },
        ..Declaration::absent()
    };

    for line in &classified {
        match line {
            HeaderLine::License { expression } => {
                if declaration.license_identifier.is_none() {
                    declaration.license_identifier = Some(expression.clone());
                } else {
                    declaration.duplicate_license_lines.push(expression.clone());
                }
            }
            HeaderLine::Tag(tag) => declaration.tags.push(tag.clone()),
            HeaderLine::Copyright(copyright) => declaration.copyright_lines.push(copyright.clone()),
            HeaderLine::Blank | HeaderLine::Text(_) => {}
        }
    }

    let attribution = attribution_candidate(&classified);
    for (index, line) in classified.into_iter().enumerate() {
        let HeaderLine::Text(text) = line else {
            continue;
        };
        if attribution == Some(index) {
            declaration.project_attribution = Some(text.text);
        } else {
            declaration.free_text.push(text);
        }
    }
    declaration
}

/// Index of the project line: the only plain free-text line sitting
/// directly next to a field line.
fn attribution_candidate(lines: &[HeaderLine]) -> Option<usize> {
    let mut candidates = lines.iter().enumerate().filter_map(|(index, line)| {
        let HeaderLine::Text(text) = line else {
            return None;
        };
        if text.marker.is_some() {
            return None;
        }
        let before = index.checked_sub(1).and_then(|i| lines.get(i));
        let after = lines.get(index + 1);
        let adjacent = before.is_some_and(HeaderLine::is_field) || after.is_some_and(HeaderLine::is_field);
        adjacent.then_some(index)
    });

    let first = candidates.next()?;
    if candidates.next().is_some() {
        return None;
    }
    Some(first)
}

/// Classify one stripped line, returning the byte offset of the recognized marker.
fn classify(line: &str) -> (HeaderLine, Option<usize>) {
    if line.is_empty() {
        return (HeaderLine::Blank, None);
    }

    if let Some(captures) = LICENSE_LINE.captures(line)
        && let Some(marker) = captures.get(0)
    {
        let expression = captures
            .name("expression")
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        return (HeaderLine::License { expression }, Some(marker.start()));
    }

    if let Some(captures) = TAG_LINE.captures(line)
        && let (Some(name), Some(value)) = (captures.name("name"), captures.name("value"))
        && !name.as_str().eq_ignore_ascii_case("FileCopyrightText")
    {
        let tag = SpdxTag::new(name.as_str(), value.as_str().trim());
        return (HeaderLine::Tag(tag), Some(0));
    }

    if let Some(marker) = COPYRIGHT_MARKER.find(line) {
        let rest = &line[marker.end()..];
        if let Some(copyright) = parse_copyright_body(rest) {
            return (HeaderLine::Copyright(copyright), Some(marker.start()));
        }
        // Prose mentioning copyright mid-sentence is only a field when it leads the line.
        if marker.start() == 0 {
            let holder = COPYRIGHT_SYMBOL.replace(rest, "").trim().to_string();
            let copyright = CopyrightLine {
                years: Vec::new(),
                years_text: String::new(),
                holder,
            };
            return (HeaderLine::Copyright(copyright), Some(0));
        }
    }

    (HeaderLine::Text(TextLine::plain(line)), None)
}

fn parse_copyright_body(rest: &str) -> Option<CopyrightLine> {
    let captures = COPYRIGHT_BODY.captures(rest)?;
    let years_text = captures.name("years")?.as_str().trim().to_string();
    let holder = captures
        .name("holder")
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    Some(CopyrightLine {
        years: parse_years(&years_text),
        years_text,
        holder,
    })
}

/// Parse `2019`, `2019-2021` and comma lists of both.
pub(crate) fn parse_years(text: &str) -> Vec<YearRange> {
    text.split(',')
        .filter_map(|part| {
            let part = part.trim();
            let mut bounds = part.split(['-', '–']).map(str::trim);
            let start = bounds.next()?.parse::<i32>().ok()?;
            let end = match bounds.next() {
                Some(end) => Some(end.parse::<i32>().ok()?),
                None => None,
            };
            Some(YearRange { start, end })
        })
        .collect()
}

/// Strip comment delimiters from every header line, keeping line positions.
///
/// Each line comes with the doc-comment prefix it was written with, if any.
fn strip_comments(text: &str, syntax: &CommentSyntax) -> Vec<(String, Option<String>)> {
    let mut in_block = false;
    text.lines()
        .map(|line| strip_line(line, syntax, &mut in_block))
        .collect()
}

fn strip_line(line: &str, syntax: &CommentSyntax, in_block: &mut bool) -> (String, Option<String>) {
    let mut text = line.trim();

    if !*in_block {
        if let Some(block) = syntax.block
            && let Some(rest) = text.strip_prefix(block.open)
        {
            text = rest;
            *in_block = true;
        } else if let Some(token) = syntax.line
            && let Some(rest) = text.strip_prefix(token)
        {
            // `///`, `//!`, `##` and similar doc-comment variants.
            let body = rest.trim_start_matches(|c: char| token.contains(c) || c == '!');
            let prefix = &text[..text.len() - body.len()];
            let marker = (prefix.len() > token.len()).then(|| prefix.to_string());
            return (body.trim().to_string(), marker);
        }
    }

    if *in_block && let Some(block) = syntax.block {
        if let Some(close_at) = text.find(block.close) {
            text = &text[..close_at];
            *in_block = false;
        }
        let continuation = block
            .continuation
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty());
        if let Some(prefix) = continuation {
            text = text.trim_start();
            while let Some(rest) = text.strip_prefix(prefix) {
                text = rest;
            }
        }
    }

    (text.trim().to_string(), None)
}
