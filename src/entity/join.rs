use std::fmt;

use super::{Entity, RowReader};
use crate::error::RelError;
use crate::naming::{NamingConvention, check_identifier};
use crate::results::CustomDbRow;

/// Aliased column list for a multi-table SELECT.
///
/// Each registered field becomes `alias.column AS "alias.column"`, so columns with the
/// same name on both sides stay distinguishable in the result row:
/// ```rust
/// use rel::prelude::*;
///
/// let fields = JoinProjection::new(NamingConvention::Snake)
///     .with::<Product>("p")
///     .with::<Spec>("s")
///     .to_sql()
///     .unwrap();
/// assert!(fields.starts_with(r#"p.id AS "p.id", p.name AS "p.name""#));
/// assert!(fields.ends_with(r#"s.product_id AS "s.product_id""#));
/// ```
#[derive(Debug, Clone)]
pub struct JoinProjection {
    naming: NamingConvention,
    parts: Vec<(String, &'static [&'static str])>,
}

impl JoinProjection {
    #[must_use]
    pub fn new(naming: NamingConvention) -> Self {
        Self {
            naming,
            parts: Vec::new(),
        }
    }

    /// Add every field of `T` under `alias`.
    #[must_use]
    pub fn with<T: Entity>(mut self, alias: &str) -> Self {
        self.parts.push((alias.to_string(), T::FIELDS));
        self
    }

    /// Render the column list in registration order.
    ///
    /// # Errors
    /// Returns `RelError::InvalidIdentifier` if an alias is not a plain identifier.
    pub fn to_sql(&self) -> Result<String, RelError> {
        let mut columns = Vec::new();
        for (alias, fields) in &self.parts {
            check_identifier(alias)?;
            for field in *fields {
                let column = self.naming.column(field);
                columns.push(format!(r#"{alias}.{column} AS "{alias}.{column}""#));
            }
        }
        Ok(columns.join(", "))
    }
}

/// Two records read from one joined row.
#[derive(Debug, Clone, PartialEq)]
pub struct Joined<A, B> {
    pub left: A,
    pub right: B,
}

impl<A: Entity, B: Entity> Joined<A, B> {
    /// Read both sides of `row`, each under its alias.
    ///
    /// # Errors
    /// Returns the first decoding error of either side.
    pub fn from_row(
        row: &CustomDbRow,
        naming: NamingConvention,
        aliases: (&str, &str),
    ) -> Result<Self, RelError> {
        Ok(Self {
            left: A::from_row(&RowReader::aliased(row, naming, aliases.0))?,
            right: B::from_row(&RowReader::aliased(row, naming, aliases.1))?,
        })
    }
}

impl<A: fmt::Display, B: fmt::Display> fmt::Display for Joined<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -- {}", self.left, self.right)
    }
}
