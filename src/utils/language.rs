use std::path::Path;

use crate::declaration::Language;

/// Detect the source language of a file from its shebang, extension or name.
///
/// Returns `None` when nothing identifies the file; the caller skips it.
pub fn detect_language(path: &Path, content: &[u8]) -> Option<Language> {
    if let Some(language) = language_from_shebang(content) {
        return Some(language);
    }

    if let Some(language) = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(language_from_extension)
    {
        return Some(language);
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    match file_name.as_str() {
        "dockerfile" | "containerfile" => Some(Language::Dockerfile),
        name if name.starts_with("dockerfile.") => Some(Language::Dockerfile),
        "makefile" | "gnumakefile" => Some(Language::Makefile),
        "gemfile" | "rakefile" => Some(Language::Ruby),
        _ => None,
    }
}

fn language_from_extension(extension: &str) -> Option<Language> {
    let language = match extension.to_lowercase().as_str() {
        "c" | "h" => Language::C,
        "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
        "cs" => Language::CSharp,
        "java" => Language::Java,
        "js" | "mjs" | "cjs" | "jsx" => Language::JavaScript,
        "ts" | "mts" | "cts" | "tsx" => Language::TypeScript,
        "go" => Language::Go,
        "rs" => Language::Rust,
        "swift" => Language::Swift,
        "kt" | "kts" => Language::Kotlin,
        "scala" | "sc" => Language::Scala,
        "dart" => Language::Dart,
        "php" => Language::Php,
        "css" => Language::Css,
        "scss" | "less" => Language::Scss,
        "py" | "pyi" | "pyw" => Language::Python,
        "sh" | "bash" | "zsh" => Language::Shell,
        "rb" | "rake" | "gemspec" => Language::Ruby,
        "pl" | "pm" => Language::Perl,
        "r" => Language::R,
        "yml" | "yaml" => Language::Yaml,
        "toml" => Language::Toml,
        "mk" => Language::Makefile,
        "sql" => Language::Sql,
        "lua" => Language::Lua,
        "hs" => Language::Haskell,
        "html" | "htm" => Language::Html,
        "xml" | "xsd" | "xsl" | "svg" => Language::Xml,
        "json" => Language::Json,
        "txt" | "md" | "markdown" => Language::PlainText,
        _ => return None,
    };
    Some(language)
}

/// Interpreter named by a `#!` line, looking through `env`.
fn language_from_shebang(content: &[u8]) -> Option<Language> {
    if !content.starts_with(b"#!") {
        return None;
    }

    let line_end = content
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(content.len());
    let line = String::from_utf8_lossy(&content[2..line_end]);
    let mut words = line.split_whitespace();
    let mut interpreter = words.next()?.rsplit('/').next()?;
    if interpreter == "env" {
        interpreter = words.find(|word| !word.starts_with('-'))?;
    }

    let name = interpreter.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
    let language = match name {
        "python" | "pypy" => Language::Python,
        "node" | "deno" | "bun" => Language::JavaScript,
        "ts-node" => Language::TypeScript,
        "ruby" => Language::Ruby,
        "perl" => Language::Perl,
        "php" => Language::Php,
        "Rscript" => Language::R,
        "lua" | "luajit" => Language::Lua,
        "sh" | "bash" | "zsh" | "dash" | "ksh" => Language::Shell,
        _ => return None,
    };
    Some(language)
}
