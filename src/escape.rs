//! Escaping helpers for the rare cases where SQL text is assembled by hand.
//!
//! Prefer bound parameters. These functions exist for callers of the legacy client that still
//! concatenate raw SQL.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SimpleDbError;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("identifier pattern compiles")
});

/// Undo backslash escaping: `\\` becomes `\`, `\0` a NUL byte, and `\x` any other `x`.
/// A trailing lone backslash is dropped.
#[must_use]
pub fn strip_slashes(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('\0'),
            Some(escaped) => out.push(escaped),
            None => {}
        }
    }
    out
}

/// Escape `value` for use between single quotes in a standard SQL string literal.
///
/// Both `SQLite` and Postgres (with `standard_conforming_strings`, the default since 9.1)
/// treat backslashes literally, so only quotes are doubled. NUL characters are dropped: `SQLite`
/// stops reading SQL text at a NUL and Postgres rejects it in text values.
#[must_use]
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\0' => {}
            '\'' => out.push_str("''"),
            other => out.push(other),
        }
    }
    out
}

/// `escape_literal` wrapped in quotes.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", escape_literal(value))
}

/// Un-escape then re-escape a scalar, so input that was already backslash-escaped upstream is
/// not escaped twice.
///
/// ```rust
/// use simple_db::escape::prepare;
///
/// assert_eq!(prepare(r"O\'Brien"), "O''Brien");
/// assert_eq!(prepare("O'Brien"), "O''Brien");
/// ```
#[must_use]
pub fn prepare(value: &str) -> String {
    escape_literal(&strip_slashes(value))
}

/// Double-quote a table or column name (optionally `schema.name`).
///
/// # Errors
/// Returns `SimpleDbError::ParameterError` unless every part matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn quote_identifier(name: &str) -> Result<String, SimpleDbError> {
    if !IDENTIFIER.is_match(name) {
        return Err(SimpleDbError::ParameterError(format!(
            "invalid SQL identifier `{name}`"
        )));
    }
    Ok(name
        .split('.')
        .map(|part| format!("\"{part}\""))
        .collect::<Vec<_>>()
        .join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_slashes_handles_escapes() {
        assert_eq!(strip_slashes(r"it\'s"), "it's");
        assert_eq!(strip_slashes(r"a\\b"), r"a\b");
        assert_eq!(strip_slashes(r"nul\0"), "nul\0");
        assert_eq!(strip_slashes("trailing\\"), "trailing");
        assert_eq!(strip_slashes("plain"), "plain");
    }

    #[test]
    fn escape_literal_doubles_quotes_only() {
        assert_eq!(escape_literal("it's"), "it''s");
        assert_eq!(escape_literal(r"back\slash"), r"back\slash");
        assert_eq!(quote_literal("''"), "''''''");
        assert_eq!(escape_literal("a\0b'c"), "ab''c");
    }

    #[test]
    fn prepare_does_not_double_escape() {
        assert_eq!(prepare(r"it\'s"), prepare("it's"));
        assert_eq!(prepare(r"a\0b'c"), "ab''c");
        assert!(!prepare("nul\0").contains('\0'));
    }

    #[test]
    fn identifiers() {
        assert_eq!(quote_identifier("users").unwrap(), "\"users\"");
        assert_eq!(quote_identifier("public.users").unwrap(), "\"public\".\"users\"");
        assert!(quote_identifier("users; drop table x").is_err());
        assert!(quote_identifier("1abc").is_err());
        assert!(quote_identifier("").is_err());
    }
}
