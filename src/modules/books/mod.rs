pub mod models;
pub mod openapi;
pub mod repository;
pub mod reviews;
pub mod routes;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use once_cell::sync::OnceCell;
use shelf_kernel::{InitCtx, Migration, Module};

use repository::BookRepository;
use reviews::ReviewClient;
use routes::BooksState;

/// Book catalog: CRUD over the `books` table plus the reviews lookup.
pub struct BooksModule {
    state: OnceCell<BooksState>,
}

impl BooksModule {
    pub const fn new() -> Self {
        Self {
            state: OnceCell::new(),
        }
    }

    fn state(&self) -> anyhow::Result<&BooksState> {
        self.state
            .get()
            .context("books module used before initialization")
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let reviews = ReviewClient::new(&ctx.settings.reviews)?;
        let state = BooksState {
            repository: BookRepository::new(ctx.db.clone(), &ctx.settings.books),
            reviews: Arc::new(reviews),
        };
        if self.state.set(state).is_err() {
            anyhow::bail!("books module initialized twice");
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            require_isbn = ctx.settings.books.require_isbn,
            reviews = %ctx.settings.reviews.base_url,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> anyhow::Result<Router> {
        Ok(routes::router(self.state()?.clone()))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi::fragment())
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id               INTEGER PRIMARY KEY AUTOINCREMENT,
                    title            TEXT    NOT NULL CHECK (length(trim(title)) > 0),
                    author           TEXT    NOT NULL CHECK (length(trim(author)) > 0),
                    isbn             TEXT,
                    publication_year INTEGER,
                    genre            TEXT,
                    description      TEXT,
                    price            REAL,
                    stock_quantity   INTEGER NOT NULL DEFAULT 0,
                    created_at       TEXT    NOT NULL,
                    updated_at       TEXT    NOT NULL
                );
                CREATE UNIQUE INDEX IF NOT EXISTS books_isbn_unique ON books (isbn);
                CREATE INDEX IF NOT EXISTS books_created_at ON books (created_at);
                "#,
        }]
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if ctx.settings.books.seed_examples {
            let inserted = self
                .state()?
                .repository
                .seed_examples()
                .await
                .context("failed to seed example books")?;
            tracing::info!(module = self.name(), inserted, "example seeding finished");
        }

        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}
