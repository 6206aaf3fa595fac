//! Comment syntax table.
//!
//! Maps every [`Language`] to the comment delimiters used to wrap a header
//! block. The table is a closed `match` over the enum, so adding a language
//! fails to compile until its syntax is declared.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::types::EngineError;

/// Source languages known to the engine.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    C,
    #[strum(to_string = "cpp", serialize = "c++")]
    Cpp,
    #[strum(to_string = "csharp", serialize = "c#")]
    CSharp,
    Java,
    #[strum(to_string = "javascript", serialize = "js")]
    JavaScript,
    #[strum(to_string = "typescript", serialize = "ts")]
    TypeScript,
    Go,
    Rust,
    Swift,
    Kotlin,
    Scala,
    Dart,
    Php,
    Css,
    Scss,
    Python,
    #[strum(to_string = "shell", serialize = "sh", serialize = "bash")]
    Shell,
    Ruby,
    Perl,
    R,
    Yaml,
    Toml,
    Makefile,
    Dockerfile,
    Sql,
    Lua,
    Haskell,
    Html,
    Xml,
    Json,
    #[strum(to_string = "plaintext", serialize = "text")]
    PlainText,
}

/// Which delimiters a freshly rendered header uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// One line comment per header line.
    Line,
    /// A single block comment around all header lines.
    Block,
}

/// Opening and closing delimiters of a block comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockComment {
    pub open: &'static str,
    pub close: &'static str,
    /// Prefix for interior lines when rendering (e.g. ` * `).
    pub continuation: Option<&'static str>,
}

/// A first line that must stay ahead of any header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prologue {
    /// `# -*- coding: utf-8 -*-` and friends (PEP 263, Ruby magic comment).
    EncodingCookie,
    /// `<?xml version="1.0"?>`
    XmlDeclaration,
    /// `<?php`
    PhpOpenTag,
    /// `<!DOCTYPE html>`; a comment in front of it changes browser rendering mode.
    Doctype,
    /// `# syntax=docker/dockerfile:1` parser directives.
    DockerDirective,
}

/// Comment conventions for one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentSyntax {
    pub line: Option<&'static str>,
    pub block: Option<BlockComment>,
    /// Whether a `#!` interpreter line may precede the header.
    pub shebang: bool,
    pub style: HeaderStyle,
    pub prologue: Option<Prologue>,
}

const C_BLOCK: BlockComment = BlockComment {
    open: "/*",
    close: "*/",
    continuation: Some(" * "),
};

const HTML_BLOCK: BlockComment = BlockComment {
    open: "<!--",
    close: "-->",
    continuation: Some("  "),
};

impl CommentSyntax {
    /// `//` line comments with `/* */` blocks.
    pub const SLASH: CommentSyntax = CommentSyntax {
        line: Some("//"),
        block: Some(C_BLOCK),
        shebang: false,
        style: HeaderStyle::Line,
        prologue: None,
    };

    /// `#` line comments, shebang allowed. Also the fallback for unsupported languages.
    pub const HASH: CommentSyntax = CommentSyntax {
        line: Some("#"),
        block: None,
        shebang: true,
        style: HeaderStyle::Line,
        prologue: None,
    };

    /// `--` line comments.
    pub const DASH: CommentSyntax = CommentSyntax {
        line: Some("--"),
        block: None,
        shebang: false,
        style: HeaderStyle::Line,
        prologue: None,
    };

    /// `<!-- -->` blocks.
    pub const MARKUP: CommentSyntax = CommentSyntax {
        line: None,
        block: Some(HTML_BLOCK),
        shebang: false,
        style: HeaderStyle::Block,
        prologue: None,
    };

    const fn with_shebang(mut self) -> Self {
        self.shebang = true;
        self
    }

    const fn with_block(mut self, block: BlockComment) -> Self {
        self.block = Some(block);
        self
    }

    const fn with_style(mut self, style: HeaderStyle) -> Self {
        self.style = style;
        self
    }

    const fn with_prologue(mut self, prologue: Prologue) -> Self {
        self.prologue = Some(prologue);
        self
    }
}

/// Look up the comment syntax for `language`.
///
/// Fails with [`EngineError::UnsupportedLanguage`] for languages that have no
/// comment syntax (JSON, plain text).
pub fn syntax_for(language: Language) -> Result<CommentSyntax, EngineError> {
    use Language::*;

    let syntax = match language {
        C => CommentSyntax::SLASH.with_style(HeaderStyle::Block),
        Cpp | CSharp | Java | Go | Rust | Kotlin | Scala => CommentSyntax::SLASH,
        JavaScript | TypeScript | Swift | Dart => CommentSyntax::SLASH.with_shebang(),
        Php => CommentSyntax::SLASH
            .with_shebang()
            .with_prologue(Prologue::PhpOpenTag),
        Css => CommentSyntax {
            line: None,
            block: Some(C_BLOCK),
            shebang: false,
            style: HeaderStyle::Block,
            prologue: None,
        },
        Scss => CommentSyntax::SLASH.with_style(HeaderStyle::Block),
        Python | Ruby => CommentSyntax::HASH.with_prologue(Prologue::EncodingCookie),
        Shell | Perl | R => CommentSyntax::HASH,
        Yaml | Toml | Makefile => CommentSyntax {
            shebang: false,
            ..CommentSyntax::HASH
        },
        Dockerfile => CommentSyntax {
            shebang: false,
            ..CommentSyntax::HASH
        }
        .with_prologue(Prologue::DockerDirective),
        Sql => CommentSyntax::DASH.with_block(C_BLOCK),
        Lua => CommentSyntax::DASH
            .with_shebang()
            .with_block(BlockComment {
                open: "--[[",
                close: "]]",
                continuation: Some("  "),
            }),
        Haskell => CommentSyntax::DASH.with_block(BlockComment {
            open: "{-",
            close: "-}",
            continuation: Some("  "),
        }),
        Html => CommentSyntax::MARKUP.with_prologue(Prologue::Doctype),
        Xml => CommentSyntax::MARKUP.with_prologue(Prologue::XmlDeclaration),
        Json | PlainText => return Err(EngineError::UnsupportedLanguage(language)),
    };

    Ok(syntax)
}

impl Language {
    pub fn is_supported(self) -> bool {
        syntax_for(self).is_ok()
    }
}
