use chrono::NaiveDateTime;

use crate::error::RelError;
use crate::types::RowValues;

/// Conversion from a stored value to a field type.
pub trait FromRowValue: Sized {
    /// # Errors
    /// Returns `RelError::TypeMismatch` when `value` cannot represent `Self`.
    fn from_row_value(column: &str, value: &RowValues) -> Result<Self, RelError>;
}

fn mismatch(column: &str, expected: &'static str, value: &RowValues) -> RelError {
    RelError::TypeMismatch {
        column: column.to_string(),
        expected,
        found: value.kind().to_string(),
    }
}

impl FromRowValue for String {
    fn from_row_value(column: &str, value: &RowValues) -> Result<Self, RelError> {
        value
            .as_text()
            .map(ToString::to_string)
            .ok_or_else(|| mismatch(column, "text", value))
    }
}

impl FromRowValue for i64 {
    fn from_row_value(column: &str, value: &RowValues) -> Result<Self, RelError> {
        value
            .as_int()
            .copied()
            .ok_or_else(|| mismatch(column, "integer", value))
    }
}

impl FromRowValue for i32 {
    fn from_row_value(column: &str, value: &RowValues) -> Result<Self, RelError> {
        let wide = i64::from_row_value(column, value)?;
        i32::try_from(wide).map_err(|_| RelError::TypeMismatch {
            column: column.to_string(),
            expected: "32-bit integer",
            found: wide.to_string(),
        })
    }
}

impl FromRowValue for f64 {
    fn from_row_value(column: &str, value: &RowValues) -> Result<Self, RelError> {
        value.as_float().ok_or_else(|| mismatch(column, "float", value))
    }
}

impl FromRowValue for bool {
    fn from_row_value(column: &str, value: &RowValues) -> Result<Self, RelError> {
        value
            .as_bool()
            .copied()
            .ok_or_else(|| mismatch(column, "boolean", value))
    }
}

impl FromRowValue for NaiveDateTime {
    fn from_row_value(column: &str, value: &RowValues) -> Result<Self, RelError> {
        value
            .as_timestamp()
            .ok_or_else(|| mismatch(column, "timestamp", value))
    }
}

impl<T: FromRowValue> FromRowValue for Option<T> {
    fn from_row_value(column: &str, value: &RowValues) -> Result<Self, RelError> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_row_value(column, value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_rejects_out_of_range() {
        assert_eq!(i32::from_row_value("w", &RowValues::Int(3)).unwrap(), 3);
        assert!(matches!(
            i32::from_row_value("w", &RowValues::Int(i64::MAX)),
            Err(RelError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn wrong_kind_names_both_sides() {
        let err = String::from_row_value("name", &RowValues::Int(1)).unwrap_err();
        assert_eq!(err.to_string(), "Column \"name\" holds integer, expected text");
    }

    #[test]
    fn null_only_fits_options() {
        assert_eq!(Option::<String>::from_row_value("c", &RowValues::Null).unwrap(), None);
        assert!(String::from_row_value("c", &RowValues::Null).is_err());
    }
}
