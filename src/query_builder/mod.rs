use std::fmt;
use std::str::FromStr;

use crate::error::SimpleDbError;
use crate::escape::quote_identifier;
use crate::translation::PlaceholderStyle;
use crate::types::{QueryAndParams, RowValues};

/// Statement shape produced by [`build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildAction {
    Insert,
    Update,
    Select,
}

impl FromStr for BuildAction {
    type Err = SimpleDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insert" => Ok(BuildAction::Insert),
            "update" => Ok(BuildAction::Update),
            "select" => Ok(BuildAction::Select),
            other => Err(SimpleDbError::ParameterError(format!(
                "unknown build action `{other}`"
            ))),
        }
    }
}

impl fmt::Display for BuildAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildAction::Insert => "insert",
            BuildAction::Update => "update",
            BuildAction::Select => "select",
        })
    }
}

/// Build a parameterized INSERT, UPDATE or SELECT over `fields`.
///
/// Field values become bound parameters, never SQL text. `extra` (a WHERE clause, ORDER BY,
/// ...) is appended verbatim; any placeholders it contains continue the numbering, starting at
/// `params.len() + 1`, and their values are added with [`QueryAndParams::push_param`].
/// SELECT always reads `id` first and ignores the field values.
///
/// ```rust
/// use simple_db::prelude::*;
///
/// let q = build(
///     &[("name", RowValues::from("bo")), ("age", RowValues::Int(9))],
///     "people",
///     BuildAction::Update,
///     "WHERE id = ?3",
///     PlaceholderStyle::Sqlite,
/// )
/// .unwrap()
/// .push_param(4_i64);
/// assert_eq!(q.query, r#"UPDATE "people" SET "name" = ?1, "age" = ?2 WHERE id = ?3;"#);
/// assert_eq!(q.params.len(), 3);
/// ```
///
/// # Errors
/// Returns `SimpleDbError::ParameterError` for an invalid table or field name, or for an
/// INSERT / UPDATE without fields.
pub fn build<K: AsRef<str>>(
    fields: &[(K, RowValues)],
    table: &str,
    action: BuildAction,
    extra: &str,
    style: PlaceholderStyle,
) -> Result<QueryAndParams, SimpleDbError> {
    let table = quote_identifier(table)?;
    let columns = fields
        .iter()
        .map(|(name, _)| quote_identifier(name.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    if columns.is_empty() && action != BuildAction::Select {
        return Err(SimpleDbError::ParameterError(format!(
            "{action} on {table} needs at least one field"
        )));
    }

    let values = || fields.iter().map(|(_, value)| value.clone()).collect();
    let (head, params) = match action {
        BuildAction::Insert => {
            let placeholders = (1..=columns.len())
                .map(|n| style.placeholder(n))
                .collect::<Vec<_>>()
                .join(", ");
            (
                format!(
                    "INSERT INTO {table} ({}) VALUES ({placeholders})",
                    columns.join(", ")
                ),
                values(),
            )
        }
        BuildAction::Update => {
            let assignments = columns
                .iter()
                .enumerate()
                .map(|(idx, column)| format!("{column} = {}", style.placeholder(idx + 1)))
                .collect::<Vec<_>>()
                .join(", ");
            (format!("UPDATE {table} SET {assignments}"), values())
        }
        BuildAction::Select => {
            let mut selected = vec!["\"id\"".to_string()];
            selected.extend(columns.into_iter().filter(|column| column != "\"id\""));
            (
                format!("SELECT {} FROM {table}", selected.join(", ")),
                Vec::new(),
            )
        }
    };

    let extra = extra.trim().trim_end_matches(';').trim_end();
    let query = if extra.is_empty() {
        format!("{head};")
    } else {
        format!("{head} {extra};")
    };
    Ok(QueryAndParams::new(query, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<(&'static str, RowValues)> {
        vec![
            ("a", RowValues::Int(1)),
            ("b", RowValues::Text("it's".into())),
        ]
    }

    #[test]
    fn insert_binds_values() {
        let q = build(&fields(), "t", BuildAction::Insert, "", PlaceholderStyle::Postgres).unwrap();
        assert_eq!(q.query, r#"INSERT INTO "t" ("a", "b") VALUES ($1, $2);"#);
        assert_eq!(q.params, vec![RowValues::Int(1), RowValues::Text("it's".into())]);
    }

    #[test]
    fn update_with_where_clause() {
        let q = build(
            &fields(),
            "app.t",
            BuildAction::Update,
            "WHERE id = $3;",
            PlaceholderStyle::Postgres,
        )
        .unwrap();
        assert_eq!(q.query, r#"UPDATE "app"."t" SET "a" = $1, "b" = $2 WHERE id = $3;"#);
    }

    #[test]
    fn select_reads_id_first_and_ignores_values() {
        let q = build(
            &[("id", RowValues::Null), ("a", RowValues::Null)],
            "t",
            BuildAction::Select,
            "ORDER BY id",
            PlaceholderStyle::Sqlite,
        )
        .unwrap();
        assert_eq!(q.query, r#"SELECT "id", "a" FROM "t" ORDER BY id;"#);
        assert!(q.params.is_empty());
    }

    #[test]
    fn rejects_bad_input() {
        let none: &[(&str, RowValues)] = &[];
        assert!(build(none, "t", BuildAction::Insert, "", PlaceholderStyle::Sqlite).is_err());
        assert!(build(&fields(), "t;drop", BuildAction::Insert, "", PlaceholderStyle::Sqlite).is_err());
        assert!(
            build(&[("a b", RowValues::Null)], "t", BuildAction::Update, "", PlaceholderStyle::Sqlite)
                .is_err()
        );
    }

    #[test]
    fn action_parsing() {
        assert_eq!("INSERT".parse::<BuildAction>().unwrap(), BuildAction::Insert);
        assert_eq!(" select ".parse::<BuildAction>().unwrap(), BuildAction::Select);
        assert!("delete".parse::<BuildAction>().is_err());
    }
}
