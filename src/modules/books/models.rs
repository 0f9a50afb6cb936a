use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::repository::RepositoryError;

/// A catalog entry as stored in the `books` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock_quantity: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Body of create and update requests.
///
/// Every field is optional at the wire level so that a missing `title` is
/// reported as a validation error naming the field rather than a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookPayload {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock_quantity: Option<i64>,
}

/// A payload that passed validation; the full set of mutable columns.
#[derive(Debug, Clone, PartialEq)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock_quantity: i64,
}

impl BookPayload {
    /// Check required fields and normalise blanks.
    pub fn validate(self, require_isbn: bool) -> Result<BookFields, RepositoryError> {
        let title = non_blank(self.title).ok_or(RepositoryError::Validation { field: "title" })?;
        let author =
            non_blank(self.author).ok_or(RepositoryError::Validation { field: "author" })?;
        let isbn = non_blank(self.isbn);
        if require_isbn && isbn.is_none() {
            return Err(RepositoryError::Validation { field: "isbn" });
        }

        Ok(BookFields {
            title,
            author,
            isbn,
            publication_year: self.publication_year,
            genre: self.genre,
            description: self.description,
            price: self.price,
            stock_quantity: self.stock_quantity.unwrap_or(0),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Query string of `GET /api/books`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListParams {
    pub const DEFAULT_PER_PAGE: u32 = 10;
    pub const MAX_PER_PAGE: u32 = 100;

    /// `(page, per_page)` with defaults applied and out-of-range values clamped.
    pub fn resolve(self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE);
        (page, per_page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32, total: i64) -> Self {
        let per_page_wide = i64::from(per_page.max(1));
        Self {
            page,
            per_page,
            total,
            total_pages: (total + per_page_wide - 1) / per_page_wide,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookList {
    pub books: Vec<Book>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Created {
    pub id: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str, author: &str) -> BookPayload {
        BookPayload {
            title: Some(title.to_string()),
            author: Some(author.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = payload("   ", "Harper Lee").validate(false).unwrap_err();
        assert!(matches!(err, RepositoryError::Validation { field: "title" }));
    }

    #[test]
    fn missing_author_is_rejected() {
        let err = BookPayload {
            title: Some("1984".to_string()),
            ..Default::default()
        }
        .validate(false)
        .unwrap_err();
        assert!(matches!(err, RepositoryError::Validation { field: "author" }));
    }

    #[test]
    fn isbn_requirement_follows_policy() {
        assert!(payload("1984", "George Orwell").validate(false).is_ok());

        let err = payload("1984", "George Orwell").validate(true).unwrap_err();
        assert!(matches!(err, RepositoryError::Validation { field: "isbn" }));
    }

    #[test]
    fn fields_are_trimmed_and_defaulted() {
        let fields = BookPayload {
            isbn: Some("  ".to_string()),
            ..payload("  Emma ", " Jane Austen")
        }
        .validate(false)
        .unwrap();

        assert_eq!(fields.title, "Emma");
        assert_eq!(fields.author, "Jane Austen");
        assert_eq!(fields.isbn, None);
        assert_eq!(fields.stock_quantity, 0);
    }

    #[test]
    fn list_params_defaults_and_clamps() {
        assert_eq!(ListParams::default().resolve(), (1, 10));
        assert_eq!(
            ListParams {
                page: Some(0),
                per_page: Some(1000)
            }
            .resolve(),
            (1, 100)
        );
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Pagination::new(1, 2, 5).total_pages, 3);
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 5, 5).total_pages, 1);
    }
}
