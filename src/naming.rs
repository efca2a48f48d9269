//! Mapping from Rust type and field names to table and column names.

use clap::ValueEnum;
use serde::Serialize;

use crate::error::RelError;

/// Case convention applied when a type or field name becomes a table or column name.
///
/// Passed explicitly to the mapping layers (`DbMap`, `Session`, `JoinProjection`)
/// instead of living in process-wide state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingConvention {
    /// `ProductCategory` → `product_category`, `CreatedAt` → `created_at`
    #[default]
    Snake,
    /// `ProductCategory` → `productCategory`, `created_at` → `createdAt`
    Camel,
    /// Names are used as written.
    Verbatim,
}

impl NamingConvention {
    /// Table name for an entity type name.
    #[must_use]
    pub fn table(self, type_name: &str) -> String {
        self.apply(type_name)
    }

    /// Column name for a field name.
    #[must_use]
    pub fn column(self, field: &str) -> String {
        self.apply(field)
    }

    fn apply(self, name: &str) -> String {
        match self {
            NamingConvention::Snake => to_snake_case(name),
            NamingConvention::Camel => to_camel_case(name),
            NamingConvention::Verbatim => name.to_string(),
        }
    }
}

/// Convert `PascalCase`, `camelCase` or already snake-cased names to `snake_case`.
///
/// Runs of capitals are treated as one word, so acronyms stay together:
/// `ProductID` → `product_id`, `URLPath` → `url_path`.
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' || c == '_' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }

        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Convert any of the supported spellings to `camelCase`.
#[must_use]
pub fn to_camel_case(name: &str) -> String {
    let snake = to_snake_case(name);
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for c in snake.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Accept `name` only if it is a plain SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
///
/// Table, column and alias names are spliced into generated SQL, so anything else is
/// rejected rather than quoted.
///
/// # Errors
/// Returns `RelError::InvalidIdentifier` for empty names or names with other characters.
pub fn check_identifier(name: &str) -> Result<&str, RelError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(RelError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_handles_pascal_and_acronyms() {
        assert_eq!(to_snake_case("CreatedAt"), "created_at");
        assert_eq!(to_snake_case("ProductCategory"), "product_category");
        assert_eq!(to_snake_case("ProductID"), "product_id");
        assert_eq!(to_snake_case("ID"), "id");
        assert_eq!(to_snake_case("URL"), "url");
        assert_eq!(to_snake_case("URLPath"), "url_path");
        assert_eq!(to_snake_case("created_at"), "created_at");
        assert_eq!(to_snake_case("image2Url"), "image2_url");
    }

    #[test]
    fn camel_case_round_trips_snake_fields() {
        assert_eq!(to_camel_case("created_at"), "createdAt");
        assert_eq!(to_camel_case("ProductCategory"), "productCategory");
        assert_eq!(to_camel_case("id"), "id");
    }

    #[test]
    fn conventions_map_tables_and_columns() {
        assert_eq!(NamingConvention::Snake.table("Product"), "product");
        assert_eq!(NamingConvention::Camel.column("product_id"), "productId");
        assert_eq!(NamingConvention::Verbatim.table("Product"), "Product");
    }

    #[test]
    fn identifiers_must_be_plain() {
        assert!(check_identifier("product_category").is_ok());
        assert!(check_identifier("_p1").is_ok());
        assert!(check_identifier("").is_err());
        assert!(check_identifier("1p").is_err());
        assert!(check_identifier("product; DROP TABLE spec").is_err());
        assert!(check_identifier("p.id").is_err());
    }
}
