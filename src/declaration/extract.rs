//! Header block extraction.
//!
//! Locates the leading comment block of a file and reports its exact byte
//! span. Everything in front of the block that has to stay first in the file
//! (UTF-8 BOM, shebang, encoding cookie, XML declaration, doctype, PHP open
//! tag) is skipped and recorded separately.
//!
//! Extraction never fails on content: malformed or binary-looking input
//! yields a possibly empty [`RawHeader`].

use regex::bytes::Regex;

use super::syntax::{CommentSyntax, Language, Prologue, syntax_for};
use super::types::{EngineError, RawHeader};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Prologue lines consumed at most; covers shebang + cookie + directive stacks.
const MAX_PROLOGUE_LINES: usize = 3;

lazy_static::lazy_static! {
    // PEP 263 and the Ruby magic comment share this shape.
    static ref ENCODING_COOKIE: Regex =
        Regex::new(r"^[ \t\f]*#.*?coding[:=][ \t]*[-_.a-zA-Z0-9]+").expect("Invalid cookie regex");

    static ref XML_DECLARATION: Regex =
        Regex::new(r"^\s*<\?xml\b").expect("Invalid XML declaration regex");

    static ref DOCTYPE: Regex =
        Regex::new(r"(?i)^\s*<!DOCTYPE\b").expect("Invalid doctype regex");

    static ref PHP_OPEN_TAG: Regex =
        Regex::new(r"^\s*<\?(php\b|=)").expect("Invalid PHP tag regex");

    static ref DOCKER_DIRECTIVE: Regex =
        Regex::new(r"(?i)^#\s*(syntax|escape|check)\s*=").expect("Invalid directive regex");
}

/// Extract the header block of `content` written in `language`.
///
/// Fails only with [`EngineError::UnsupportedLanguage`].
pub fn extract(content: &[u8], language: Language) -> Result<RawHeader, EngineError> {
    let syntax = syntax_for(language)?;
    Ok(extract_with_syntax(content, &syntax))
}

/// Extract the header block of `content` using an explicit comment syntax.
pub fn extract_with_syntax(content: &[u8], syntax: &CommentSyntax) -> RawHeader {
    let bom_len = if content.starts_with(UTF8_BOM) {
        UTF8_BOM.len()
    } else {
        0
    };
    let mut pos = bom_len;

    let mut shebang = None;
    if syntax.shebang && content[pos..].starts_with(b"#!") {
        let line = Line::at(content, pos);
        shebang = Some(lossy(line.body(content)));
        pos = line.end;
    }

    let mut pragma_lines: Vec<String> = Vec::new();
    if let Some(prologue) = syntax.prologue {
        while pos < content.len() && pragma_lines.len() < MAX_PROLOGUE_LINES {
            let line = Line::at(content, pos);
            if !prologue_matches(prologue, line.body(content)) {
                break;
            }
            pragma_lines.push(lossy(line.body(content)));
            pos = line.end;
        }
    }

    let prefix_terminated = pos == bom_len || content[pos - 1] == b'\n';
    let (byte_start, byte_end) = scan_comment_run(content, pos, syntax);

    RawHeader {
        text: lossy(&content[byte_start..byte_end]),
        byte_start,
        byte_end,
        shebang,
        pragma: (!pragma_lines.is_empty()).then(|| pragma_lines.join("\n")),
        prefix_terminated,
        syntax: *syntax,
    }
}

fn prologue_matches(prologue: Prologue, line: &[u8]) -> bool {
    match prologue {
        Prologue::EncodingCookie => ENCODING_COOKIE.is_match(line),
        Prologue::XmlDeclaration => XML_DECLARATION.is_match(line),
        Prologue::PhpOpenTag => PHP_OPEN_TAG.is_match(line),
        Prologue::Doctype => DOCTYPE.is_match(line),
        Prologue::DockerDirective => DOCKER_DIRECTIVE.is_match(line),
    }
}

/// Consume the contiguous comment run starting at `pos`.
///
/// Returns the `(start, end)` span; an empty run is the insertion point `(pos, pos)`.
fn scan_comment_run(content: &[u8], pos: usize, syntax: &CommentSyntax) -> (usize, usize) {
    let mut cursor = pos;
    let mut start: Option<usize> = None;
    let mut end = pos;
    let mut blank_run = 0;

    while cursor < content.len() {
        let line = Line::at(content, cursor);
        let body = line.body(content);
        let indent = body
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        let rest = &body[indent..];

        if rest.is_empty() {
            blank_run += 1;
            if blank_run >= 2 {
                break;
            }
            cursor = line.end;
            continue;
        }

        // Block open is checked first: Lua's `--[[` also starts with `--`.
        if let Some(block) = syntax.block
            && rest.starts_with(block.open.as_bytes())
        {
            start.get_or_insert(line.start);
            let after_open = line.start + indent + block.open.len();
            end = match find(content, after_open, block.close.as_bytes()) {
                Some(close_at) => block_end(content, close_at + block.close.len()),
                None => content.len(),
            };
            break;
        }

        if let Some(token) = syntax.line
            && rest.starts_with(token.as_bytes())
        {
            start.get_or_insert(line.start);
            end = line.end;
            blank_run = 0;
            cursor = line.end;
            continue;
        }

        break;
    }

    match start {
        Some(start) => (start, end),
        None => (pos, pos),
    }
}

/// Where a header ending in a block close at `close_end` stops.
///
/// The rest of the closing line belongs to the header only if it is blank.
fn block_end(content: &[u8], close_end: usize) -> usize {
    let line = Line::at(content, close_end);
    if line.body(content).iter().all(|b| b.is_ascii_whitespace()) {
        line.end
    } else {
        close_end
    }
}

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// One physical line: `start..content_end` is the body, `end` is past the terminator.
#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    content_end: usize,
    end: usize,
}

impl Line {
    fn at(content: &[u8], start: usize) -> Self {
        let newline = content[start..].iter().position(|&b| b == b'\n');
        let (mut content_end, end) = match newline {
            Some(offset) => (start + offset, start + offset + 1),
            None => (content.len(), content.len()),
        };
        if content_end > start && content[content_end - 1] == b'\r' {
            content_end -= 1;
        }
        Self {
            start,
            content_end,
            end,
        }
    }

    fn body<'a>(&self, content: &'a [u8]) -> &'a [u8] {
        &content[self.start..self.content_end]
    }
}
