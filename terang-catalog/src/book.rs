// Books sold in the shop

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use terang_backend::Direction;

use crate::forms::FormCheck;
use crate::{Entity, Validate, ValidationErrors};

pub const BOOK_ALERT: &str = "Judul, penulis, kategori, harga wajib.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

impl Entity for Book {
    type Input = BookInput;
    type Patch = BookPatch;

    const TABLE: &'static str = "books";
    const SINGULAR: &'static str = "book";
    const PLURAL: &'static str = "books";
    const VISIBILITY_COLUMN: &'static str = "is_published";
    const ORDER_BY: &'static str = "created_at";
    const ORDER_DIRECTION: Direction = Direction::Desc;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Validate for BookInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        FormCheck::new(BOOK_ALERT)
            .required("title", &self.title)
            .required("author", &self.author)
            .required("category", &self.category)
            .positive("price", self.price)
            .finish()
    }
}

impl Validate for BookPatch {
    fn validate(&self) -> Result<(), ValidationErrors> {
        FormCheck::new(BOOK_ALERT)
            .required_if_set("title", self.title.as_deref())
            .required_if_set("author", self.author.as_deref())
            .required_if_set("category", self.category.as_deref())
            .positive_if_set("price", self.price)
            .finish()
    }
}

/// Category selector value meaning "no filter".
pub const ALL_CATEGORIES: &str = "all";

/// Books matching a free-text query over title, author and category, and
/// an exact category. Empty values match everything.
pub fn search_books(books: &[Book], query: &str, category: &str) -> Vec<Book> {
    let needle = query.trim().to_lowercase();
    let category = category.trim();
    let any_category = category.is_empty() || category == ALL_CATEGORIES;

    books
        .iter()
        .filter(|b| {
            needle.is_empty()
                || format!("{} {} {}", b.title, b.author, b.category)
                    .to_lowercase()
                    .contains(&needle)
        })
        .filter(|b| any_category || b.category == category)
        .cloned()
        .collect()
}

/// Distinct categories, sorted.
pub fn categories(books: &[Book]) -> Vec<String> {
    let mut categories: Vec<String> = books.iter().map(|b| b.category.clone()).collect();
    categories.sort();
    categories.dedup();
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn book(title: &str, author: &str, category: &str) -> Book {
        serde_json::from_value(json!({
            "id": title.to_lowercase(),
            "title": title,
            "author": author,
            "category": category,
            "price": 65000,
            "is_published": true,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
        }))
        .unwrap()
    }

    fn shelf() -> Vec<Book> {
        vec![
            book("Fiqh Islam", "Sayyid Sabiq", "Agama"),
            book("Algoritma Dasar", "A. Junaedi", "Teknis"),
            book("Kopi: Dari Kebun ke Cangkir", "R. Prabowo", "Kopi"),
            book("Storytelling untuk UMKM", "D. Mahesa", "Bisnis"),
        ]
    }

    #[test]
    fn test_search_and_category() {
        let books = shelf();
        assert_eq!(search_books(&books, "", "all").len(), 4);
        assert_eq!(search_books(&books, "KOPI", "")[0].title, "Kopi: Dari Kebun ke Cangkir");
        assert_eq!(search_books(&books, "junaedi", "Teknis").len(), 1);
        assert!(search_books(&books, "junaedi", "Agama").is_empty());
        assert_eq!(categories(&books), vec!["Agama", "Bisnis", "Kopi", "Teknis"]);
    }

    #[test]
    fn test_input_validation() {
        let input = BookInput {
            title: "Fiqh Islam".into(),
            author: "Sayyid Sabiq".into(),
            category: "Agama".into(),
            price: 0.0,
            ..Default::default()
        };
        let err = input.validate().unwrap_err();
        assert_eq!(err.alert, BOOK_ALERT);
        assert_eq!(err.fields(), vec!["price"]);

        assert!(BookInput { price: 65000.0, ..input }.validate().is_ok());
    }

    #[test]
    fn test_patch_skips_absent_fields() {
        let patch = BookPatch {
            price: Some(70000.0),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"price": 70000.0}));

        let blank = BookPatch {
            title: Some(" ".into()),
            ..Default::default()
        };
        assert_eq!(blank.validate().unwrap_err().fields(), vec!["title"]);
    }
}
