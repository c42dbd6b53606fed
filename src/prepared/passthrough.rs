use std::fmt;

use crate::error::SimpleDbError;
use crate::results::DbRow;
use crate::types::RowValues;

use super::PreparedClient;

/// Connection operations reachable through [`PreparedClient::call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMethod {
    BeginTransaction,
    Commit,
    RollBack,
    InTransaction,
    Exec,
    Quote,
    LastInsertId,
}

/// Operations on the last statement reachable through [`PreparedClient::call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementMethod {
    Fetch,
    FetchAll,
    FetchColumn,
    RowCount,
    ColumnCount,
    CloseCursor,
}

/// A resolved method name. Connection operations win over statement operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Connection(ConnectionMethod),
    Statement(StatementMethod),
}

impl Method {
    /// Resolve `name`, ignoring case and underscores, so `rollBack`, `rollback` and
    /// `roll_back` are the same method.
    #[must_use]
    pub fn resolve(name: &str) -> Option<Method> {
        let key: String = name
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let method = match key.as_str() {
            "begintransaction" => Method::Connection(ConnectionMethod::BeginTransaction),
            "commit" => Method::Connection(ConnectionMethod::Commit),
            "rollback" => Method::Connection(ConnectionMethod::RollBack),
            "intransaction" => Method::Connection(ConnectionMethod::InTransaction),
            "exec" => Method::Connection(ConnectionMethod::Exec),
            "quote" => Method::Connection(ConnectionMethod::Quote),
            "lastinsertid" => Method::Connection(ConnectionMethod::LastInsertId),
            "fetch" => Method::Statement(StatementMethod::Fetch),
            "fetchall" => Method::Statement(StatementMethod::FetchAll),
            "fetchcolumn" => Method::Statement(StatementMethod::FetchColumn),
            "rowcount" => Method::Statement(StatementMethod::RowCount),
            "columncount" => Method::Statement(StatementMethod::ColumnCount),
            "closecursor" => Method::Statement(StatementMethod::CloseCursor),
            _ => return None,
        };
        Some(method)
    }
}

/// What a passthrough call produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutput {
    Unit,
    Bool(bool),
    Count(usize),
    Id(i64),
    Text(String),
    Row(Option<DbRow>),
    Rows(Vec<DbRow>),
    Value(Option<RowValues>),
}

impl fmt::Display for CallOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallOutput::Unit => f.write_str("()"),
            CallOutput::Bool(b) => write!(f, "{b}"),
            CallOutput::Count(n) => write!(f, "{n}"),
            CallOutput::Id(id) => write!(f, "{id}"),
            CallOutput::Text(s) => f.write_str(s),
            CallOutput::Row(row) => match row {
                Some(row) => write!(f, "{}", row.to_json()),
                None => f.write_str("null"),
            },
            CallOutput::Rows(rows) => {
                let rows: Vec<_> = rows.iter().map(DbRow::to_json).collect();
                write!(f, "{}", serde_json::Value::Array(rows))
            }
            CallOutput::Value(value) => match value {
                Some(value) => write!(f, "{}", value.to_json()),
                None => f.write_str("null"),
            },
        }
    }
}

fn text_arg<'a>(method: &str, args: &'a [RowValues]) -> Result<&'a str, SimpleDbError> {
    args.first().and_then(RowValues::as_text).ok_or_else(|| {
        SimpleDbError::ParameterError(format!("{method} expects a text argument"))
    })
}

fn optional_text_arg<'a>(
    method: &str,
    args: &'a [RowValues],
) -> Result<Option<&'a str>, SimpleDbError> {
    match args.first() {
        None | Some(RowValues::Null) => Ok(None),
        Some(_) => text_arg(method, args).map(Some),
    }
}

fn index_arg(method: &str, args: &[RowValues]) -> Result<usize, SimpleDbError> {
    match args.first() {
        None => Ok(0),
        Some(RowValues::Int(i)) => usize::try_from(*i).map_err(|_| {
            SimpleDbError::ParameterError(format!("{method} expects a non-negative index"))
        }),
        Some(_) => Err(SimpleDbError::ParameterError(format!(
            "{method} expects an integer argument"
        ))),
    }
}

impl PreparedClient {
    /// Invoke a connection or last-statement operation by name.
    ///
    /// ```rust
    /// use simple_db::prelude::*;
    ///
    /// let mut db = PreparedClient::connect(&ConnectOptions::sqlite(":memory:")).unwrap();
    /// assert_eq!(db.call("inTransaction", &[]).unwrap(), CallOutput::Bool(false));
    /// let err = db.call("frobnicate", &[]).unwrap_err();
    /// assert_eq!(err.to_string(), "Method not found: frobnicate.");
    /// ```
    ///
    /// # Errors
    /// Returns `SimpleDbError::MethodNotFound` naming `method` when it resolves to nothing, or
    /// to a statement operation while there is no last statement. Otherwise returns whatever
    /// the operation returns.
    pub fn call(&mut self, method: &str, args: &[RowValues]) -> Result<CallOutput, SimpleDbError> {
        match Method::resolve(method) {
            Some(Method::Connection(op)) => self.call_connection(op, method, args),
            Some(Method::Statement(op)) => self.call_statement(op, method, args),
            None => Err(SimpleDbError::MethodNotFound(method.to_string())),
        }
    }

    fn call_connection(
        &mut self,
        op: ConnectionMethod,
        name: &str,
        args: &[RowValues],
    ) -> Result<CallOutput, SimpleDbError> {
        let output = match op {
            ConnectionMethod::BeginTransaction => {
                self.begin_transaction()?;
                CallOutput::Bool(true)
            }
            ConnectionMethod::Commit => {
                self.commit()?;
                CallOutput::Bool(true)
            }
            ConnectionMethod::RollBack => {
                self.rollback()?;
                CallOutput::Bool(true)
            }
            ConnectionMethod::InTransaction => CallOutput::Bool(self.in_transaction()),
            ConnectionMethod::Exec => CallOutput::Count(self.exec(text_arg(name, args)?)?),
            ConnectionMethod::Quote => CallOutput::Text(self.quote(text_arg(name, args)?)),
            ConnectionMethod::LastInsertId => {
                CallOutput::Id(self.last_id(optional_text_arg(name, args)?)?)
            }
        };
        Ok(output)
    }

    fn call_statement(
        &mut self,
        op: StatementMethod,
        name: &str,
        args: &[RowValues],
    ) -> Result<CallOutput, SimpleDbError> {
        let Some(stmt) = self.last_statement.as_mut() else {
            return Err(SimpleDbError::MethodNotFound(name.to_string()));
        };
        let output = match op {
            StatementMethod::Fetch => CallOutput::Row(stmt.fetch()),
            StatementMethod::FetchAll => CallOutput::Rows(stmt.fetch_all()),
            StatementMethod::FetchColumn => {
                CallOutput::Value(stmt.fetch_column(index_arg(name, args)?))
            }
            StatementMethod::RowCount => CallOutput::Count(stmt.row_count()),
            StatementMethod::ColumnCount => CallOutput::Count(stmt.column_count()),
            StatementMethod::CloseCursor => {
                stmt.close_cursor();
                CallOutput::Bool(true)
            }
        };
        Ok(output)
    }
}
