//! Record types of the product catalog.

use std::fmt;

use chrono::NaiveDateTime;

use crate::entity;
use crate::entity::Joined;
use crate::types::TIMESTAMP_TEXT_FORMAT;

entity! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Product keys(id) {
        pub id: String,
        pub name: String,
        pub created_at: NaiveDateTime,
        pub updated_at: NaiveDateTime,
    }
}

entity! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Spec keys(id) {
        pub id: String,
        pub weight: i32,
        pub product_id: String,
    }
}

entity! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Image keys(id) {
        pub id: String,
        pub url: String,
        pub product_id: String,
    }
}

entity! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Category keys(id) {
        pub id: String,
        pub name: String,
    }
}

entity! {
    /// Membership of a product in a category.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ProductCategory keys(product_id, category_id) {
        pub product_id: String,
        pub category_id: String,
    }
}

/// A product with one of its specs.
pub type ProductSpec = Joined<Product, Spec>;

/// A product with one of its images.
pub type ProductImage = Joined<Product, Image>;

impl Product {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, at: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: at,
            updated_at: at,
        }
    }
}

impl Spec {
    #[must_use]
    pub fn new(id: impl Into<String>, weight: i32, product_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            weight,
            product_id: product_id.into(),
        }
    }
}

impl Image {
    #[must_use]
    pub fn new(id: impl Into<String>, url: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            product_id: product_id.into(),
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{} {} {} {}}}",
            self.id,
            self.name,
            self.created_at.format(TIMESTAMP_TEXT_FORMAT),
            self.updated_at.format(TIMESTAMP_TEXT_FORMAT)
        )
    }
}

impl fmt::Display for Spec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} {} {}}}", self.id, self.weight, self.product_id)
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} {} {}}}", self.id, self.url, self.product_id)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} {}}}", self.id, self.name)
    }
}
