use std::borrow::Cow;
use std::collections::HashMap;
use std::convert::Infallible;

use crate::error::SimpleDbError;
use crate::types::{QueryAndParams, RowValues};

mod lexer;

use lexer::{rewrite, scan_digits, scan_identifier};

/// Positional placeholder flavor understood by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?1`.
    Sqlite,
}

impl PlaceholderStyle {
    /// Render the 1-based placeholder `n` in this style.
    #[must_use]
    pub fn placeholder(self, n: usize) -> String {
        match self {
            PlaceholderStyle::Postgres => format!("${n}"),
            PlaceholderStyle::Sqlite => format!("?{n}"),
        }
    }
}

/// Translate positional placeholders between Postgres-style `$N` and SQLite-style `?N`.
///
/// When targeting Postgres, a bare `?` becomes the next number after the highest one seen so
/// far (the `SQLite` numbering rule). Placeholders inside quoted strings, comments, and
/// dollar-quoted blocks are left alone. Postgres JSON operators spelled `?`, `?|`, `?&` are
/// indistinguishable from placeholders, so leave translation off for such statements.
/// Returns a borrowed `Cow` when no changes are needed.
///
/// ```rust
/// use simple_db::prelude::*;
///
/// let sql = translate_placeholders("select * from t where a = ?1 and b = ?", PlaceholderStyle::Postgres, true);
/// assert_eq!(sql, "select * from t where a = $1 and b = $2");
/// ```
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle, enabled: bool) -> Cow<'_, str> {
    if !enabled {
        return Cow::Borrowed(sql);
    }

    let mut highest = 0_usize;
    let translated = rewrite::<_, Infallible>(sql, |bytes, idx| {
        let replacement = match (bytes[idx], target) {
            (b'$', PlaceholderStyle::Sqlite) => {
                scan_digits(bytes, idx + 1).map(|(end, digits)| (end, format!("?{digits}")))
            }
            (b'?', PlaceholderStyle::Postgres) => match scan_digits(bytes, idx + 1) {
                Some((end, digits)) => {
                    if let Ok(n) = digits.parse::<usize>() {
                        highest = highest.max(n);
                    }
                    Some((end, format!("${digits}")))
                }
                None => {
                    highest += 1;
                    Some((idx + 1, format!("${highest}")))
                }
            },
            _ => None,
        };
        Ok(replacement)
    });

    match translated {
        Ok(sql) => sql,
        Err(never) => match never {},
    }
}

/// Rewrite `:name` placeholders to positional placeholders of `target` and order the values
/// to match.
///
/// Each distinct name gets one position, in order of first appearance; a name used twice binds
/// the same value twice. Keys may be written with or without the leading `:`. `::` casts and
/// text inside literals or comments are not placeholders.
///
/// ```rust
/// use simple_db::prelude::*;
///
/// let named = vec![(":id".to_string(), RowValues::Int(7)), ("name".to_string(), RowValues::Text("bo".into()))];
/// let bound = bind_named("UPDATE t SET name = :name WHERE id = :id AND :id > 0", &named, PlaceholderStyle::Postgres).unwrap();
/// assert_eq!(bound.query, "UPDATE t SET name = $1 WHERE id = $2 AND $2 > 0");
/// assert_eq!(bound.params, vec![RowValues::Text("bo".into()), RowValues::Int(7)]);
/// ```
///
/// # Errors
/// Returns `SimpleDbError::ParameterError` if a placeholder has no value, a value has no
/// placeholder, or the same name is supplied twice.
pub fn bind_named(
    sql: &str,
    named: &[(String, RowValues)],
    target: PlaceholderStyle,
) -> Result<QueryAndParams, SimpleDbError> {
    let mut values: HashMap<&str, &RowValues> = HashMap::with_capacity(named.len());
    for (name, value) in named {
        let key = name.strip_prefix(':').unwrap_or(name);
        if values.insert(key, value).is_some() {
            return Err(SimpleDbError::ParameterError(format!(
                "named parameter `:{key}` supplied more than once"
            )));
        }
    }

    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut ordered: Vec<RowValues> = Vec::with_capacity(named.len());

    let rewritten = rewrite::<_, SimpleDbError>(sql, |bytes, idx| {
        if bytes[idx] != b':' || (idx > 0 && bytes[idx - 1] == b':') {
            return Ok(None);
        }
        let Some((end, name)) = scan_identifier(bytes, idx + 1) else {
            return Ok(None);
        };
        let position = match positions.get(name) {
            Some(position) => *position,
            None => {
                let value = values.get(name).ok_or_else(|| {
                    SimpleDbError::ParameterError(format!(
                        "no value bound for named parameter `:{name}`"
                    ))
                })?;
                ordered.push((*value).clone());
                positions.insert(name.to_string(), ordered.len());
                ordered.len()
            }
        };
        Ok(Some((end, target.placeholder(position))))
    })?;

    if let Some(unused) = values.keys().find(|key| !positions.contains_key(**key)) {
        return Err(SimpleDbError::ParameterError(format!(
            "named parameter `:{unused}` does not appear in the statement"
        )));
    }

    Ok(QueryAndParams::new(rewritten.into_owned(), ordered))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_sqlite_to_postgres() {
        let sql = "select * from t where a = ?1 and b = ?2";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, true);
        assert_eq!(res, "select * from t where a = $1 and b = $2");
    }

    #[test]
    fn translates_postgres_to_sqlite() {
        let sql = "insert into t values($1, $2)";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "insert into t values(?1, ?2)");
    }

    #[test]
    fn bare_question_marks_follow_sqlite_numbering() {
        let sql = "select ?, ?3, ? from t";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, true);
        assert_eq!(res, "select $1, $3, $4 from t");
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?1', $1 -- $2\n/* ?3 */ from t where a = $1";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "select '?1', ?1 -- $2\n/* ?3 */ from t where a = ?1");
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$foo$ select $1 from t $foo$ where a = $1";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "$foo$ select $1 from t $foo$ where a = ?1");
    }

    #[test]
    fn respects_disabled_flag() {
        let sql = "select * from t where a = ?1";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, false);
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, sql);
    }

    fn named(pairs: &[(&str, RowValues)]) -> Vec<(String, RowValues)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn named_to_sqlite_positions() {
        let values = named(&[(":b", RowValues::Int(2)), (":a", RowValues::Int(1))]);
        let bound = bind_named(
            "select * from t where a = :a and b = :b",
            &values,
            PlaceholderStyle::Sqlite,
        )
        .unwrap();
        assert_eq!(bound.query, "select * from t where a = ?1 and b = ?2");
        assert_eq!(bound.params, vec![RowValues::Int(1), RowValues::Int(2)]);
    }

    #[test]
    fn named_ignores_casts_and_literals() {
        let values = named(&[("id", RowValues::Int(5))]);
        let bound = bind_named(
            "select :id::bigint, ':id', '12:30' -- :id\nfrom t",
            &values,
            PlaceholderStyle::Postgres,
        )
        .unwrap();
        assert_eq!(bound.query, "select $1::bigint, ':id', '12:30' -- :id\nfrom t");
        assert_eq!(bound.params, vec![RowValues::Int(5)]);
    }

    #[test]
    fn named_missing_value_is_an_error() {
        let err = bind_named("select :nope", &[], PlaceholderStyle::Sqlite).unwrap_err();
        assert!(matches!(err, SimpleDbError::ParameterError(msg) if msg.contains(":nope")));
    }

    #[test]
    fn named_unused_value_is_an_error() {
        let values = named(&[(":a", RowValues::Int(1)), (":extra", RowValues::Null)]);
        let err = bind_named("select :a", &values, PlaceholderStyle::Sqlite).unwrap_err();
        assert!(matches!(err, SimpleDbError::ParameterError(msg) if msg.contains(":extra")));
    }

    #[test]
    fn named_duplicate_key_is_an_error() {
        let values = named(&[(":a", RowValues::Int(1)), ("a", RowValues::Int(2))]);
        assert!(bind_named("select :a", &values, PlaceholderStyle::Sqlite).is_err());
    }
}
