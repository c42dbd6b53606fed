use std::error::Error;

use chrono::{TimeZone, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

use crate::error::SimpleDbError;
use crate::types::RowValues;

/// Borrowed Postgres parameter list.
pub struct Params<'a> {
    references: Vec<&'a (dyn ToSql + Sync)>,
}

impl<'a> Params<'a> {
    /// Convert from a slice of `RowValues` to Postgres parameters.
    ///
    /// # Errors
    /// Never fails; type mismatches surface when the statement is executed.
    pub fn convert(params: &'a [RowValues]) -> Result<Params<'a>, SimpleDbError> {
        let references = params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        Ok(Params { references })
    }

    #[must_use]
    pub fn as_refs(&self) -> &[&(dyn ToSql + Sync)] {
        &self.references
    }
}

/// Parameters are encoded for the type the server inferred for each placeholder, so an
/// `Int` bound to an `int4` column is sent as four bytes, not eight.
impl ToSql for RowValues {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            RowValues::Int(i) => match *ty {
                Type::INT2 => i16::try_from(*i)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*i)?.to_sql(ty, out),
                Type::OID => u32::try_from(*i)?.to_sql(ty, out),
                #[allow(clippy::cast_precision_loss)]
                Type::FLOAT8 => (*i as f64).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN => {
                    i.to_string().to_sql(ty, out)
                }
                _ => i.to_sql(ty, out),
            },
            RowValues::Float(f) => match *ty {
                #[allow(clippy::cast_possible_truncation)]
                Type::FLOAT4 => (*f as f32).to_sql(ty, out),
                Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::UNKNOWN => {
                    f.to_string().to_sql(ty, out)
                }
                _ => f.to_sql(ty, out),
            },
            RowValues::Text(s) => s.to_sql(ty, out),
            RowValues::Bool(b) => b.to_sql(ty, out),
            RowValues::Timestamp(dt) => match *ty {
                Type::TIMESTAMPTZ => Utc.from_utc_datetime(dt).to_sql(ty, out),
                Type::DATE => dt.date().to_sql(ty, out),
                _ => dt.to_sql(ty, out),
            },
            RowValues::Null => Ok(IsNull::Yes),
            RowValues::JSON(jsval) => jsval.to_sql(ty, out),
            RowValues::Blob(bytes) => bytes.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(
            *ty,
            Type::INT2
                | Type::INT4
                | Type::INT8
                | Type::OID
                | Type::FLOAT4
                | Type::FLOAT8
                | Type::TEXT
                | Type::VARCHAR
                | Type::BPCHAR
                | Type::NAME
                | Type::UNKNOWN
                | Type::BOOL
                | Type::TIMESTAMP
                | Type::TIMESTAMPTZ
                | Type::DATE
                | Type::JSON
                | Type::JSONB
                | Type::BYTEA
        )
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_is_sized_to_the_target_type() {
        let mut out = bytes::BytesMut::new();
        RowValues::Int(7).to_sql(&Type::INT4, &mut out).unwrap();
        assert_eq!(out.len(), 4);

        let mut out = bytes::BytesMut::new();
        RowValues::Int(7).to_sql(&Type::INT8, &mut out).unwrap();
        assert_eq!(out.len(), 8);

        let mut out = bytes::BytesMut::new();
        assert!(RowValues::Int(i64::MAX).to_sql(&Type::INT2, &mut out).is_err());
    }

    #[test]
    fn accepted_types() {
        assert!(<RowValues as ToSql>::accepts(&Type::JSONB));
        assert!(!<RowValues as ToSql>::accepts(&Type::POINT));
    }
}
