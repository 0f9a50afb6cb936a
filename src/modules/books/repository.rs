//! Persistence access for the `books` table.

use shelf_db::Pool;
use shelf_kernel::settings::BooksSettings;
use time::macros::datetime;
use time::OffsetDateTime;

use super::models::{Book, BookFields, BookPayload};

const SELECT_COLUMNS: &str = "id, title, author, isbn, publication_year, genre, description, \
                              price, stock_quantity, created_at, updated_at";

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("missing required field: {field}")]
    Validation { field: &'static str },

    #[error("duplicate value for unique field: {field}")]
    DuplicateKey { field: &'static str },

    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),
}

impl RepositoryError {
    /// Translate unique-constraint violations into `DuplicateKey`.
    fn from_write(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::DuplicateKey { field: "isbn" }
            }
            _ => RepositoryError::Store(err),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: Pool,
    require_isbn: bool,
}

impl BookRepository {
    pub fn new(pool: Pool, policy: &BooksSettings) -> Self {
        Self {
            pool,
            require_isbn: policy.require_isbn,
        }
    }

    /// One page of books, newest first, plus the total number of rows.
    pub async fn list(&self, page: u32, per_page: u32) -> Result<(Vec<Book>, i64), RepositoryError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);

        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {SELECT_COLUMNS} FROM books \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = self.count().await?;
        Ok((books, total))
    }

    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let total = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Book>, RepositoryError> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {SELECT_COLUMNS} FROM books WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(book)
    }

    /// Validate and insert a book, returning its new id.
    pub async fn create(&self, payload: BookPayload) -> Result<i64, RepositoryError> {
        let fields = payload.validate(self.require_isbn)?;
        let now = shelf_db::timestamp_now();
        self.insert(&fields, &now, &self.pool).await
    }

    /// Replace every mutable field of a book. `false` when no such book exists.
    pub async fn update(&self, id: i64, payload: BookPayload) -> Result<bool, RepositoryError> {
        let fields = payload.validate(self.require_isbn)?;

        let result = sqlx::query(
            "UPDATE books SET title = ?, author = ?, isbn = ?, publication_year = ?, genre = ?, \
             description = ?, price = ?, stock_quantity = ?, updated_at = MAX(updated_at, ?) \
             WHERE id = ?",
        )
        .bind(&fields.title)
        .bind(&fields.author)
        .bind(&fields.isbn)
        .bind(fields.publication_year)
        .bind(&fields.genre)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.stock_quantity)
        .bind(shelf_db::timestamp_now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(result.rows_affected() > 0)
    }

    /// Hard-delete a book. `false` when no such book exists.
    pub async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Insert the example catalog when the table is empty. Returns rows inserted.
    pub async fn seed_examples(&self) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            tracing::debug!(existing, "catalog not empty, skipping example seed");
            return Ok(0);
        }

        let mut inserted = 0;
        for (fields, created_at) in example_books() {
            let at = shelf_db::format_timestamp(created_at);
            self.insert(&fields, &at, &mut *tx).await?;
            inserted += 1;
        }
        tx.commit().await?;

        tracing::info!(inserted, "seeded example books");
        Ok(inserted)
    }

    async fn insert<'e, E>(&self, fields: &BookFields, at: &str, executor: E) -> Result<i64, RepositoryError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO books (title, author, isbn, publication_year, genre, description, \
             price, stock_quantity, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&fields.title)
        .bind(&fields.author)
        .bind(&fields.isbn)
        .bind(fields.publication_year)
        .bind(&fields.genre)
        .bind(&fields.description)
        .bind(fields.price)
        .bind(fields.stock_quantity)
        .bind(at)
        .bind(at)
        .execute(executor)
        .await
        .map_err(RepositoryError::from_write)?;

        Ok(result.last_insert_rowid())
    }
}

fn example_books() -> Vec<(BookFields, OffsetDateTime)> {
    let book = |title: &str,
                author: &str,
                isbn: &str,
                genre: &str,
                year: i32,
                description: &str,
                price: f64,
                stock: i64| BookFields {
        title: title.to_string(),
        author: author.to_string(),
        isbn: Some(isbn.to_string()),
        publication_year: Some(year),
        genre: Some(genre.to_string()),
        description: Some(description.to_string()),
        price: Some(price),
        stock_quantity: stock,
    };

    vec![
        (
            book(
                "The Great Gatsby",
                "F. Scott Fitzgerald",
                "978-0-7432-7356-5",
                "Fiction",
                1925,
                "A classic American novel set in the Jazz Age",
                12.99,
                10,
            ),
            datetime!(2024-01-15 10:30:00 UTC),
        ),
        (
            book(
                "To Kill a Mockingbird",
                "Harper Lee",
                "978-0-06-112008-4",
                "Fiction",
                1960,
                "A gripping tale of racial injustice and childhood in the American South",
                13.99,
                8,
            ),
            datetime!(2024-01-15 11:00:00 UTC),
        ),
        (
            book(
                "1984",
                "George Orwell",
                "978-0-452-28423-4",
                "Dystopian Fiction",
                1949,
                "A dystopian social science fiction novel about totalitarian control",
                14.99,
                15,
            ),
            datetime!(2024-01-15 12:00:00 UTC),
        ),
        (
            book(
                "Pride and Prejudice",
                "Jane Austen",
                "978-0-14-143951-8",
                "Romance",
                1813,
                "A romantic novel of manners in Georgian England",
                11.99,
                12,
            ),
            datetime!(2024-01-15 13:00:00 UTC),
        ),
        (
            book(
                "The Catcher in the Rye",
                "J.D. Salinger",
                "978-0-316-76948-0",
                "Fiction",
                1951,
                "A controversial novel about teenage rebellion and alienation",
                13.50,
                5,
            ),
            datetime!(2024-01-15 14:00:00 UTC),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::BooksModule;
    use shelf_kernel::Module;

    async fn repository(require_isbn: bool) -> BookRepository {
        let pool = shelf_db::connect("sqlite::memory:", 1).await.unwrap();
        let migrations: Vec<_> = BooksModule::new()
            .migrations()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        shelf_db::migrate(&pool, &migrations).await.unwrap();
        BookRepository::new(
            pool,
            &BooksSettings {
                require_isbn,
                ..Default::default()
            },
        )
    }

    fn payload(title: &str, isbn: Option<&str>) -> BookPayload {
        BookPayload {
            title: Some(title.to_string()),
            author: Some("Someone".to_string()),
            isbn: isbn.map(str::to_string),
            price: Some(9.5),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips_fields() {
        let repo = repository(false).await;
        let id = repo.create(payload("Dune", Some("978-0441013593"))).await.unwrap();
        assert!(id > 0);

        let book = repo.get(id).await.unwrap().unwrap();
        assert_eq!(book.title, "Dune");
        assert_eq!(book.isbn.as_deref(), Some("978-0441013593"));
        assert_eq!(book.price, Some(9.5));
        assert_eq!(book.stock_quantity, 0);
        assert_eq!(book.created_at, book.updated_at);
    }

    #[tokio::test]
    async fn duplicate_isbn_is_distinct_error() {
        let repo = repository(false).await;
        repo.create(payload("A", Some("111"))).await.unwrap();

        let err = repo.create(payload("B", Some("111"))).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey { field: "isbn" }));
    }

    #[tokio::test]
    async fn update_to_taken_isbn_is_duplicate_key() {
        let repo = repository(false).await;
        repo.create(payload("First", Some("111"))).await.unwrap();
        let id = repo.create(payload("Second", Some("222"))).await.unwrap();

        let err = repo.update(id, payload("Second", Some("111"))).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateKey { field: "isbn" }));

        let unchanged = repo.get(id).await.unwrap().unwrap();
        assert_eq!(unchanged.isbn.as_deref(), Some("222"));
    }

    #[tokio::test]
    async fn books_without_isbn_do_not_collide() {
        let repo = repository(false).await;
        repo.create(payload("A", None)).await.unwrap();
        repo.create(payload("B", Some(""))).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn strict_policy_requires_isbn() {
        let repo = repository(true).await;
        let err = repo.create(payload("A", None)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation { field: "isbn" }));
    }

    #[tokio::test]
    async fn update_replaces_all_fields() {
        let repo = repository(false).await;
        let id = repo.create(payload("Old", Some("222"))).await.unwrap();
        let before = repo.get(id).await.unwrap().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let updated = repo
            .update(
                id,
                BookPayload {
                    title: Some("New".to_string()),
                    author: Some("Other".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated);

        let after = repo.get(id).await.unwrap().unwrap();
        assert_eq!(after.title, "New");
        assert_eq!(after.isbn, None);
        assert_eq!(after.price, None);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);

        assert!(!repo.update(999_999, payload("X", None)).await.unwrap());
    }

    #[tokio::test]
    async fn delete_reports_affected_rows() {
        let repo = repository(false).await;
        let id = repo.create(payload("Gone", None)).await.unwrap();

        assert!(repo.delete(id).await.unwrap());
        assert!(repo.get(id).await.unwrap().is_none());
        assert!(!repo.delete(id).await.unwrap());
    }

    #[tokio::test]
    async fn list_is_paginated_newest_first() {
        let repo = repository(false).await;
        assert_eq!(repo.seed_examples().await.unwrap(), 5);

        let (books, total) = repo.list(1, 2).await.unwrap();
        assert_eq!(total, 5);
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "The Catcher in the Rye");
        assert_eq!(books[1].title, "Pride and Prejudice");

        let (last, _) = repo.list(3, 2).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].title, "The Great Gatsby");
    }

    #[tokio::test]
    async fn seeding_only_fills_an_empty_catalog() {
        let repo = repository(false).await;
        assert_eq!(repo.seed_examples().await.unwrap(), 5);
        assert_eq!(repo.seed_examples().await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 5);
    }
}
