//! Convert validated JSON values to types that sqlx can bind.

use crate::config::ColumnType;
use crate::error::AppError;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value that can be bound to a PostgreSQL query.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Uuid(uuid::Uuid),
}

impl PgBindValue {
    /// Convert a value for a column of type `ty`. Dates bind as text
    /// and are cast in SQL (`$n::date`).
    pub fn for_column(ty: ColumnType, v: &Value) -> Result<Self, AppError> {
        if v.is_null() {
            return Ok(PgBindValue::Null);
        }
        let bad = || AppError::BadRequest(format!("cannot bind {} as {}", v, ty.cast()));
        Ok(match ty {
            ColumnType::Text | ColumnType::Date => {
                PgBindValue::String(v.as_str().ok_or_else(bad)?.to_string())
            }
            ColumnType::BigInt => PgBindValue::I64(v.as_i64().ok_or_else(bad)?),
            ColumnType::Numeric => PgBindValue::F64(v.as_f64().ok_or_else(bad)?),
            ColumnType::Boolean => PgBindValue::Bool(v.as_bool().ok_or_else(bad)?),
        })
    }
}

impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        Ok(match self {
            PgBindValue::Null => <Option<i32> as Encode<Postgres>>::encode_by_ref(&None, buf)?,
            PgBindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf)?,
            PgBindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf)?,
            PgBindValue::String(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf)?,
            PgBindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf)?,
        })
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            PgBindValue::Null | PgBindValue::String(_) => <String as Type<Postgres>>::type_info(),
            PgBindValue::Bool(_) => <bool as Type<Postgres>>::type_info(),
            PgBindValue::I64(_) => <i64 as Type<Postgres>>::type_info(),
            PgBindValue::F64(_) => <f64 as Type<Postgres>>::type_info(),
            PgBindValue::Uuid(_) => <uuid::Uuid as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn binds_by_column_type() {
        assert_eq!(PgBindValue::for_column(ColumnType::BigInt, &json!(7)).unwrap(), PgBindValue::I64(7));
        assert_eq!(
            PgBindValue::for_column(ColumnType::Numeric, &json!(2.5)).unwrap(),
            PgBindValue::F64(2.5)
        );
        assert_eq!(
            PgBindValue::for_column(ColumnType::Date, &json!("2024-01-31")).unwrap(),
            PgBindValue::String("2024-01-31".into())
        );
        assert_eq!(PgBindValue::for_column(ColumnType::Text, &Value::Null).unwrap(), PgBindValue::Null);
    }

    #[test]
    fn rejects_mismatched_value() {
        assert!(PgBindValue::for_column(ColumnType::BigInt, &json!("seven")).is_err());
        assert!(PgBindValue::for_column(ColumnType::Boolean, &json!(1)).is_err());
    }
}
