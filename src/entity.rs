//! Compile-time field registry for record types.
//!
//! A record type lists its fields once, through [`entity!`](crate::entity!), and both
//! mapping layers derive table names, column lists, parameter rows and row decoding from
//! that list.

mod join;
mod value;

pub use join::{JoinProjection, Joined};
pub use value::FromRowValue;

use crate::error::RelError;
use crate::naming::NamingConvention;
use crate::results::CustomDbRow;
use crate::types::RowValues;

/// A record type stored as one row of one table.
pub trait Entity: Sized {
    /// Rust type name; the table name is derived from it.
    const TYPE_NAME: &'static str;
    /// Field names in declaration order.
    const FIELDS: &'static [&'static str];
    /// Default key fields.
    const KEYS: &'static [&'static str];

    /// Field values in `FIELDS` order.
    fn to_values(&self) -> Vec<RowValues>;

    /// Decode one record from a result row.
    ///
    /// # Errors
    /// Returns `RelError::MissingColumn` or `RelError::TypeMismatch` when the row does not
    /// carry the fields.
    fn from_row(row: &RowReader<'_>) -> Result<Self, RelError>;

    #[must_use]
    fn table_name(naming: NamingConvention) -> String {
        naming.table(Self::TYPE_NAME)
    }

    #[must_use]
    fn column_names(naming: NamingConvention) -> Vec<String> {
        Self::FIELDS.iter().map(|f| naming.column(f)).collect()
    }
}

/// Field-name view over a [`CustomDbRow`].
///
/// Field names go through the naming convention; with an alias the column looked up is
/// `alias.column`, as produced by [`JoinProjection`].
#[derive(Debug, Clone, Copy)]
pub struct RowReader<'a> {
    row: &'a CustomDbRow,
    naming: NamingConvention,
    alias: Option<&'a str>,
}

impl<'a> RowReader<'a> {
    #[must_use]
    pub fn new(row: &'a CustomDbRow, naming: NamingConvention) -> Self {
        Self {
            row,
            naming,
            alias: None,
        }
    }

    #[must_use]
    pub fn aliased(row: &'a CustomDbRow, naming: NamingConvention, alias: &'a str) -> Self {
        Self {
            row,
            naming,
            alias: Some(alias),
        }
    }

    /// Read `field` and convert it.
    ///
    /// # Errors
    /// Returns `RelError::MissingColumn` if the row has no such column and
    /// `RelError::TypeMismatch` if the value does not convert.
    pub fn get<T: FromRowValue>(&self, field: &str) -> Result<T, RelError> {
        let column = self.naming.column(field);
        let key = match self.alias {
            Some(alias) => format!("{alias}.{column}"),
            None => column,
        };
        let value = self
            .row
            .get(&key)
            .ok_or_else(|| RelError::MissingColumn(key.clone()))?;
        T::from_row_value(&key, value)
    }
}

/// Decode every row of `rows` as `T`.
///
/// # Errors
/// Returns the first decoding error.
pub fn decode_all<'r, T: Entity>(
    rows: impl IntoIterator<Item = &'r CustomDbRow>,
    naming: NamingConvention,
) -> Result<Vec<T>, RelError> {
    rows.into_iter()
        .map(|row| T::from_row(&RowReader::new(row, naming)))
        .collect()
}

/// Declare a record struct together with its [`Entity`] registry.
///
/// ```rust
/// use rel::entity;
/// use rel::entity::Entity;
///
/// entity! {
///     #[derive(Debug, Clone)]
///     pub struct Tag keys(id) {
///         pub id: String,
///         pub label: Option<String>,
///     }
/// }
///
/// assert_eq!(Tag::FIELDS, &["id", "label"]);
/// assert_eq!(Tag::KEYS, &["id"]);
/// ```
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident keys($($key:ident),+ $(,)?) {
            $($(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($(#[$fmeta])* $fvis $field: $ty),+
        }

        impl $crate::entity::Entity for $name {
            const TYPE_NAME: &'static str = stringify!($name);
            const FIELDS: &'static [&'static str] = &[$(stringify!($field)),+];
            const KEYS: &'static [&'static str] = &[$(stringify!($key)),+];

            fn to_values(&self) -> ::std::vec::Vec<$crate::types::RowValues> {
                ::std::vec![$($crate::types::RowValues::from(self.$field.clone())),+]
            }

            fn from_row(
                row: &$crate::entity::RowReader<'_>,
            ) -> ::std::result::Result<Self, $crate::error::RelError> {
                ::std::result::Result::Ok(Self {
                    $($field: row.get(stringify!($field))?),+
                })
            }
        }
    };
}
