//! Value conversion from `sea_query` parameters to `may_postgres` parameters.
//!
//! Conversion is two-pass: every value is first copied into a typed vector,
//! then a `&dyn ToSql` is taken into that storage. The references only live
//! for the duration of the closure.

use crate::executor::StorageError;
use may_postgres::types::ToSql;
use sea_query::Value;

/// Convert `values` to `ToSql` parameters and run `f` with them.
///
/// # Errors
///
/// Returns `StorageError::UnsupportedValue` for value kinds that have no
/// binding, or whatever `f` returns.
pub(crate) fn with_converted_params<F, R>(values: &[Value], f: F) -> Result<R, StorageError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, StorageError>,
{
    let mut bools: Vec<bool> = Vec::new();
    let mut ints: Vec<i32> = Vec::new();
    let mut big_ints: Vec<i64> = Vec::new();
    let mut strings: Vec<String> = Vec::new();
    let mut doubles: Vec<f64> = Vec::new();
    // NULLs keep the type of their column kind so the server accepts them.
    let null_bool: Option<bool> = None;
    let null_int: Option<i32> = None;
    let null_big_int: Option<i64> = None;
    let null_double: Option<f64> = None;
    let null_string: Option<String> = None;

    for value in values {
        match value {
            Value::Bool(Some(b)) => bools.push(*b),
            Value::TinyInt(Some(i)) => ints.push(i32::from(*i)),
            Value::SmallInt(Some(i)) => ints.push(i32::from(*i)),
            Value::Int(Some(i)) => ints.push(*i),
            Value::BigInt(Some(i)) => big_ints.push(*i),
            Value::Unsigned(Some(u)) => big_ints.push(i64::from(*u)),
            Value::BigUnsigned(Some(u)) => {
                let v = i64::try_from(*u).map_err(|_| {
                    StorageError::UnsupportedValue(format!(
                        "BigUnsigned value {u} exceeds i64::MAX"
                    ))
                })?;
                big_ints.push(v);
            }
            Value::Double(Some(d)) => doubles.push(*d),
            Value::String(Some(s)) => strings.push(s.to_string()),
            Value::Json(Some(j)) => strings.push(serde_json::to_string(j).map_err(|e| {
                StorageError::UnsupportedValue(format!("Failed to serialize JSON: {e}"))
            })?),
            Value::Bool(None)
            | Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::Json(None) => {}
            other => {
                return Err(StorageError::UnsupportedValue(format!("{other:?}")));
            }
        }
    }

    let mut bool_idx = 0;
    let mut int_idx = 0;
    let mut big_int_idx = 0;
    let mut string_idx = 0;
    let mut double_idx = 0;

    let mut params: Vec<&dyn ToSql> = Vec::with_capacity(values.len());

    for value in values {
        match value {
            Value::Bool(Some(_)) => {
                params.push(&bools[bool_idx] as &dyn ToSql);
                bool_idx += 1;
            }
            Value::TinyInt(Some(_)) | Value::SmallInt(Some(_)) | Value::Int(Some(_)) => {
                params.push(&ints[int_idx] as &dyn ToSql);
                int_idx += 1;
            }
            Value::BigInt(Some(_)) | Value::Unsigned(Some(_)) | Value::BigUnsigned(Some(_)) => {
                params.push(&big_ints[big_int_idx] as &dyn ToSql);
                big_int_idx += 1;
            }
            Value::Double(Some(_)) => {
                params.push(&doubles[double_idx] as &dyn ToSql);
                double_idx += 1;
            }
            Value::String(Some(_)) | Value::Json(Some(_)) => {
                params.push(&strings[string_idx] as &dyn ToSql);
                string_idx += 1;
            }
            Value::Bool(None) => params.push(&null_bool),
            Value::TinyInt(None) | Value::SmallInt(None) | Value::Int(None) => {
                params.push(&null_int)
            }
            Value::Double(None) => params.push(&null_double),
            Value::String(None) | Value::Json(None) => params.push(&null_string),
            _ => params.push(&null_big_int),
        }
    }

    f(&params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_every_supported_value() {
        let values = vec![
            Value::BigInt(Some(7)),
            Value::Int(Some(1994)),
            Value::String(Some("Poetry".into())),
            Value::Bool(Some(true)),
            Value::BigInt(None),
            Value::String(None),
            Value::Int(None),
        ];
        let count = with_converted_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 7);
    }

    #[test]
    fn test_big_unsigned_overflow_is_rejected() {
        let values = vec![Value::BigUnsigned(Some(u64::MAX))];
        let err = with_converted_params(&values, |_| Ok(())).unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedValue(_)));
    }
}
