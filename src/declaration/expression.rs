//! SPDX license expression parsing.
//!
//! This module provides a parser for the compound license grammar used in
//! `SPDX-License-Identifier` lines:
//! - License identifiers as written (e.g., `MIT`, `GPL-2.0-or-later`, `GPL-2.0+`)
//! - Operators: `AND`, `OR`, `WITH` (case-insensitive)
//! - Parenthetical grouping
//! - `LicenseRef-*` and `DocumentRef-*:LicenseRef-*` user-defined references
//!
//! Parsing is purely syntactic. [`check_expression`] then looks every leaf up
//! in a [`LicenseList`].

use std::fmt;

use super::licenses::LicenseList;

/// Error type for license expression parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Empty expression
    EmptyExpression,

    /// Unexpected character or token at position
    UnexpectedToken { token: String, position: usize },

    /// Mismatched parentheses
    MismatchedParentheses,

    /// `WITH` not followed by a single exception identifier
    MissingException,

    /// Generic parse error with message
    ParseError(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyExpression => write!(f, "Empty license expression"),
            Self::UnexpectedToken { token, position } => {
                write!(f, "Unexpected token '{}' at position {}", token, position)
            }
            Self::MismatchedParentheses => write!(f, "Mismatched parentheses"),
            Self::MissingException => write!(f, "WITH must be followed by an exception identifier"),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

/// Token in a license expression, with its character position.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Identifier(String),
    And,
    Or,
    With,
    LeftParen,
    RightParen,
}

/// A parsed license expression represented as an AST.
#[derive(Debug, Clone, PartialEq)]
pub enum LicenseExpression {
    /// A license identifier, case preserved
    License(String),

    /// A `LicenseRef-*` or `DocumentRef-*` reference
    LicenseRef(String),

    /// left AND right
    And {
        left: Box<LicenseExpression>,
        right: Box<LicenseExpression>,
    },

    /// left OR right
    Or {
        left: Box<LicenseExpression>,
        right: Box<LicenseExpression>,
    },

    /// license WITH exception
    With {
        license: Box<LicenseExpression>,
        exception: String,
    },
}

impl LicenseExpression {
    /// License leaves in order of appearance, without duplicates.
    pub fn license_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids<'a>(&'a self, ids: &mut Vec<&'a str>) {
        match self {
            Self::License(id) => {
                if !ids.contains(&id.as_str()) {
                    ids.push(id);
                }
            }
            Self::LicenseRef(_) => {}
            Self::And { left, right } | Self::Or { left, right } => {
                left.collect_ids(ids);
                right.collect_ids(ids);
            }
            Self::With { license, .. } => license.collect_ids(ids),
        }
    }

    /// Exception identifiers named by `WITH` operators.
    pub fn exception_ids(&self) -> Vec<&str> {
        match self {
            Self::License(_) | Self::LicenseRef(_) => Vec::new(),
            Self::And { left, right } | Self::Or { left, right } => {
                let mut ids = left.exception_ids();
                ids.extend(right.exception_ids());
                ids
            }
            Self::With { license, exception } => {
                let mut ids = license.exception_ids();
                ids.push(exception);
                ids
            }
        }
    }

    fn is_compound(&self) -> bool {
        matches!(self, Self::And { .. } | Self::Or { .. })
    }
}

impl fmt::Display for LicenseExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::License(id) | Self::LicenseRef(id) => f.write_str(id),
            Self::And { left, right } => {
                write_operand(f, left, |e| matches!(e, Self::Or { .. }))?;
                f.write_str(" AND ")?;
                write_operand(f, right, LicenseExpression::is_compound)
            }
            Self::Or { left, right } => {
                write!(f, "{} OR ", left)?;
                write_operand(f, right, |e| matches!(e, Self::Or { .. }))
            }
            Self::With { license, exception } => {
                write_operand(f, license, LicenseExpression::is_compound)?;
                write!(f, " WITH {}", exception)
            }
        }
    }
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    operand: &LicenseExpression,
    needs_parens: impl Fn(&LicenseExpression) -> bool,
) -> fmt::Result {
    if needs_parens(operand) {
        write!(f, "({})", operand)
    } else {
        write!(f, "{}", operand)
    }
}

/// Parse a license expression string into a structured expression.
///
/// # Examples
/// ```
/// use spdx_headers::declaration::expression::parse_expression;
///
/// let expr = parse_expression("MIT OR Apache-2.0").unwrap();
/// assert_eq!(expr.license_ids(), vec!["MIT", "Apache-2.0"]);
/// ```
pub fn parse_expression(expr: &str) -> Result<LicenseExpression, ParseError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyExpression);
    }

    let tokens = tokenize(trimmed)?;
    parse_tokens(&tokens)
}

/// Whether `id` is a user-defined reference rather than a list identifier.
pub fn is_license_ref(id: &str) -> bool {
    let lower = id.to_ascii_lowercase();
    lower.starts_with("licenseref-") || lower.starts_with("documentref-")
}

/// Reference-set findings for a parsed expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionCheck {
    /// Leaves absent from the license list.
    pub unknown: Vec<String>,
    /// Leaves the list marks deprecated.
    pub deprecated: Vec<String>,
    /// Leaves the list does not mark OSI approved.
    pub non_osi: Vec<String>,
    /// `WITH` operands that are not known exceptions.
    pub invalid_exceptions: Vec<String>,
}

/// Look every leaf of `expr` up in `licenses`.
///
/// `LicenseRef-*`/`DocumentRef-*` leaves are always accepted and never
/// reported as deprecated or non-OSI.
pub fn check_expression(expr: &LicenseExpression, licenses: &LicenseList) -> ExpressionCheck {
    let mut check = ExpressionCheck::default();

    for id in expr.license_ids() {
        match licenses.license(id) {
            Some(info) => {
                if info.is_deprecated_license_id {
                    check.deprecated.push(id.to_string());
                }
                if !info.is_osi_approved {
                    check.non_osi.push(id.to_string());
                }
            }
            None => check.unknown.push(id.to_string()),
        }
    }

    for exception in expr.exception_ids() {
        if licenses.exception(exception).is_none() {
            check.invalid_exceptions.push(exception.to_string());
        }
    }

    check
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '+' | ':')
}

/// Tokenize a license expression string into tokens.
fn tokenize(expr: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let chars: Vec<char> = expr.chars().collect();

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        match c {
            '(' => {
                tokens.push((Token::LeftParen, pos));
                pos += 1;
            }
            ')' => {
                tokens.push((Token::RightParen, pos));
                pos += 1;
            }
            _ if is_identifier_char(c) => {
                let start = pos;
                while pos < chars.len() && is_identifier_char(chars[pos]) {
                    pos += 1;
                }
                let text: String = chars[start..pos].iter().collect();
                tokens.push((match_text_to_token(text), start));
            }
            _ => {
                return Err(ParseError::UnexpectedToken {
                    token: c.to_string(),
                    position: pos,
                });
            }
        }
    }

    Ok(tokens)
}

/// Match text to the appropriate token.
fn match_text_to_token(text: String) -> Token {
    match text.to_ascii_uppercase().as_str() {
        "AND" => Token::And,
        "OR" => Token::Or,
        "WITH" => Token::With,
        _ => Token::Identifier(text),
    }
}

type Tokens<'a> = &'a [(Token, usize)];

/// Deepest parenthesis nesting accepted.
const MAX_NESTING: usize = 64;

/// Longest expression accepted, in tokens.
const MAX_TOKENS: usize = 1024;

/// Parse tokens into a LicenseExpression using recursive descent.
fn parse_tokens(tokens: Tokens<'_>) -> Result<LicenseExpression, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::EmptyExpression);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(ParseError::ParseError(format!(
            "expression longer than {} tokens",
            MAX_TOKENS
        )));
    }

    let (expr, remaining) = parse_or(tokens, 0)?;
    match remaining.first() {
        None => Ok(expr),
        Some((Token::RightParen, _)) => Err(ParseError::MismatchedParentheses),
        Some((token, position)) => Err(ParseError::UnexpectedToken {
            token: token_text(token),
            position: *position,
        }),
    }
}

/// Parse OR expressions (lowest precedence).
fn parse_or(tokens: Tokens<'_>, depth: usize) -> Result<(LicenseExpression, Tokens<'_>), ParseError> {
    let (mut expr, mut remaining) = parse_and(tokens, depth)?;

    while let Some((Token::Or, _)) = remaining.first() {
        let (right, rest) = parse_and(&remaining[1..], depth)?;
        expr = LicenseExpression::Or {
            left: Box::new(expr),
            right: Box::new(right),
        };
        remaining = rest;
    }

    Ok((expr, remaining))
}

/// Parse AND expressions (binds tighter than OR).
fn parse_and(tokens: Tokens<'_>, depth: usize) -> Result<(LicenseExpression, Tokens<'_>), ParseError> {
    let (mut expr, mut remaining) = parse_with(tokens, depth)?;

    while let Some((Token::And, _)) = remaining.first() {
        let (right, rest) = parse_with(&remaining[1..], depth)?;
        expr = LicenseExpression::And {
            left: Box::new(expr),
            right: Box::new(right),
        };
        remaining = rest;
    }

    Ok((expr, remaining))
}

/// Parse `license WITH exception`. The exception is always a bare identifier.
fn parse_with(tokens: Tokens<'_>, depth: usize) -> Result<(LicenseExpression, Tokens<'_>), ParseError> {
    let (expr, remaining) = parse_primary(tokens, depth)?;

    let Some((Token::With, _)) = remaining.first() else {
        return Ok((expr, remaining));
    };

    match remaining.get(1) {
        Some((Token::Identifier(exception), _)) => {
            let with = LicenseExpression::With {
                license: Box::new(expr),
                exception: exception.clone(),
            };
            let rest = &remaining[2..];
            if let Some((Token::With, position)) = rest.first() {
                return Err(ParseError::UnexpectedToken {
                    token: "WITH".to_string(),
                    position: *position,
                });
            }
            Ok((with, rest))
        }
        _ => Err(ParseError::MissingException),
    }
}

/// Parse primary expressions (identifiers or parenthesized expressions).
fn parse_primary(tokens: Tokens<'_>, depth: usize) -> Result<(LicenseExpression, Tokens<'_>), ParseError> {
    let Some((token, position)) = tokens.first() else {
        return Err(ParseError::EmptyExpression);
    };

    match token {
        Token::LeftParen => {
            if depth >= MAX_NESTING {
                return Err(ParseError::ParseError(
                    "expression nested too deeply".to_string(),
                ));
            }
            let (expr, remaining) = parse_or(&tokens[1..], depth + 1)?;
            match remaining.first() {
                Some((Token::RightParen, _)) => Ok((expr, &remaining[1..])),
                _ => Err(ParseError::MismatchedParentheses),
            }
        }
        Token::Identifier(id) => {
            let expr = if is_license_ref(id) {
                LicenseExpression::LicenseRef(id.clone())
            } else {
                LicenseExpression::License(id.clone())
            };
            Ok((expr, &tokens[1..]))
        }
        Token::RightParen => Err(ParseError::MismatchedParentheses),
        Token::And | Token::Or | Token::With => Err(ParseError::UnexpectedToken {
            token: token_text(token),
            position: *position,
        }),
    }
}

fn token_text(token: &Token) -> String {
    match token {
        Token::Identifier(id) => id.clone(),
        Token::And => "AND".to_string(),
        Token::Or => "OR".to_string(),
        Token::With => "WITH".to_string(),
        Token::LeftParen => "(".to_string(),
        Token::RightParen => ")".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn license(id: &str) -> LicenseExpression {
        LicenseExpression::License(id.to_string())
    }

    #[test]
    fn test_parse_simple_license() {
        let expr = parse_expression("MIT").unwrap();
        assert_eq!(expr, license("MIT"));
    }

    #[test]
    fn test_parse_preserves_case() {
        let expr = parse_expression("apache-2.0").unwrap();
        assert_eq!(expr, license("apache-2.0"));
    }

    #[test]
    fn test_parse_and_expression() {
        let expr = parse_expression("MIT AND Apache-2.0").unwrap();
        assert!(matches!(expr, LicenseExpression::And { .. }));
        assert_eq!(expr.license_ids(), vec!["MIT", "Apache-2.0"]);
    }

    #[test]
    fn test_parse_or_expression() {
        let expr = parse_expression("MIT OR Apache-2.0").unwrap();
        assert!(matches!(expr, LicenseExpression::Or { .. }));
    }

    #[test]
    fn test_parse_lowercase_operators() {
        let expr = parse_expression("mit or apache-2.0").unwrap();
        assert!(matches!(expr, LicenseExpression::Or { .. }));
    }

    #[test]
    fn test_parse_with_expression() {
        let expr = parse_expression("GPL-2.0-or-later WITH Classpath-exception-2.0").unwrap();
        assert_eq!(
            expr,
            LicenseExpression::With {
                license: Box::new(license("GPL-2.0-or-later")),
                exception: "Classpath-exception-2.0".to_string(),
            }
        );
        assert_eq!(expr.exception_ids(), vec!["Classpath-exception-2.0"]);
        assert_eq!(expr.license_ids(), vec!["GPL-2.0-or-later"]);
    }

    #[test]
    fn test_parse_plus_suffix() {
        let expr = parse_expression("GPL-2.0+").unwrap();
        assert_eq!(expr, license("GPL-2.0+"));
    }

    #[test]
    fn test_parse_license_ref() {
        let expr = parse_expression("LicenseRef-Acme-Proprietary").unwrap();
        assert_eq!(
            expr,
            LicenseExpression::LicenseRef("LicenseRef-Acme-Proprietary".to_string())
        );
        let expr = parse_expression("DocumentRef-spdx-tool:LicenseRef-Internal").unwrap();
        assert!(matches!(expr, LicenseExpression::LicenseRef(_)));
        assert!(expr.license_ids().is_empty());
    }

    #[test]
    fn test_parse_nested_parens() {
        let expr = parse_expression("((MIT OR Apache-2.0) AND BSD-3-Clause)").unwrap();
        assert!(matches!(expr, LicenseExpression::And { .. }));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse_expression("MIT OR Apache-2.0 AND BSD-2-Clause").unwrap();
        let LicenseExpression::Or { left, right } = expr else {
            panic!("expected OR at the root");
        };
        assert_eq!(*left, license("MIT"));
        assert!(matches!(*right, LicenseExpression::And { .. }));
    }

    #[test]
    fn test_parse_empty_expression() {
        assert_eq!(parse_expression(""), Err(ParseError::EmptyExpression));
        assert_eq!(parse_expression("   "), Err(ParseError::EmptyExpression));
    }

    #[test]
    fn test_parse_mismatched_parens() {
        assert_eq!(
            parse_expression("(MIT OR Apache-2.0"),
            Err(ParseError::MismatchedParentheses)
        );
        assert_eq!(
            parse_expression("MIT OR Apache-2.0)"),
            Err(ParseError::MismatchedParentheses)
        );
    }

    #[test]
    fn test_parse_unexpected_character() {
        assert_eq!(
            parse_expression("MIT / Apache-2.0"),
            Err(ParseError::UnexpectedToken {
                token: "/".to_string(),
                position: 4
            })
        );
    }

    #[test]
    fn test_parse_dangling_operator() {
        assert!(parse_expression("MIT AND").is_err());
        assert!(parse_expression("OR MIT").is_err());
        assert!(parse_expression("MIT Apache-2.0").is_err());
    }

    #[test]
    fn test_with_requires_bare_exception() {
        assert_eq!(
            parse_expression("GPL-2.0-only WITH"),
            Err(ParseError::MissingException)
        );
        assert_eq!(
            parse_expression("GPL-2.0-only WITH (Classpath-exception-2.0)"),
            Err(ParseError::MissingException)
        );
        assert!(parse_expression("GPL-2.0-only WITH A WITH B").is_err());
    }

    #[test]
    fn test_display_canonical_form() {
        let expr = parse_expression("(mit or apache-2.0) and bsd-3-clause").unwrap();
        assert_eq!(expr.to_string(), "(mit OR apache-2.0) AND bsd-3-clause");

        let expr = parse_expression("(MIT AND Zlib) WITH LLVM-exception").unwrap();
        assert_eq!(expr.to_string(), "(MIT AND Zlib) WITH LLVM-exception");
    }

    #[test]
    fn test_display_reparses_to_same_tree() {
        for text in [
            "MIT",
            "MIT OR (Apache-2.0 AND BSD-2-Clause)",
            "(MIT OR ISC) AND Apache-2.0 WITH LLVM-exception",
            "MIT OR (ISC OR Zlib)",
            "MIT AND (ISC AND Zlib)",
        ] {
            let expr = parse_expression(text).unwrap();
            assert_eq!(parse_expression(&expr.to_string()).unwrap(), expr);
        }
    }

    #[test]
    fn test_license_ids_deduplicated() {
        let expr = parse_expression("MIT AND (MIT OR Apache-2.0)").unwrap();
        assert_eq!(expr.license_ids(), vec!["MIT", "Apache-2.0"]);
    }

    #[test]
    fn test_check_expression_known_and_unknown() {
        let licenses = LicenseList::embedded();
        let expr = parse_expression("MIT AND Not-A-License").unwrap();
        let check = check_expression(&expr, &licenses);
        assert_eq!(check.unknown, vec!["Not-A-License"]);
        assert!(check.invalid_exceptions.is_empty());
    }

    #[test]
    fn test_check_expression_case_insensitive_lookup() {
        let licenses = LicenseList::embedded();
        let expr = parse_expression("apache-2.0 or mit").unwrap();
        assert_eq!(check_expression(&expr, &licenses), ExpressionCheck::default());
    }

    #[test]
    fn test_check_expression_exceptions() {
        let licenses = LicenseList::embedded();
        let expr = parse_expression("GPL-2.0-only WITH Classpath-exception-2.0").unwrap();
        assert!(check_expression(&expr, &licenses).invalid_exceptions.is_empty());

        let expr = parse_expression("GPL-2.0-only WITH MIT").unwrap();
        assert_eq!(check_expression(&expr, &licenses).invalid_exceptions, vec!["MIT"]);
    }

    #[test]
    fn test_check_expression_deprecated_and_non_osi() {
        let licenses = LicenseList::embedded();
        let expr = parse_expression("GPL-2.0+ AND CC0-1.0").unwrap();
        let check = check_expression(&expr, &licenses);
        assert_eq!(check.deprecated, vec!["GPL-2.0+"]);
        assert!(check.non_osi.contains(&"CC0-1.0".to_string()));
        assert!(check.unknown.is_empty());
    }

    #[test]
    fn test_deeply_nested_expression_is_rejected() {
        let deep = format!("{}MIT{}", "(".repeat(200_000), ")".repeat(200_000));
        assert!(matches!(
            parse_expression(&deep),
            Err(ParseError::ParseError(_))
        ));

        let nested = format!("{}MIT{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(
            parse_expression(&nested),
            Err(ParseError::ParseError("expression nested too deeply".to_string()))
        );

        let shallow = format!("{}MIT{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(
            parse_expression(&shallow).unwrap(),
            LicenseExpression::License("MIT".to_string())
        );
    }

    #[test]
    fn test_overlong_expression_is_rejected() {
        let long = vec!["MIT"; 100_000].join(" AND ");
        assert!(matches!(
            parse_expression(&long),
            Err(ParseError::ParseError(_))
        ));
    }

    #[test]
    fn test_check_expression_accepts_license_refs() {
        let licenses = LicenseList::embedded();
        let expr = parse_expression("LicenseRef-Acme OR MIT").unwrap();
        assert_eq!(check_expression(&expr, &licenses), ExpressionCheck::default());
    }
}
