//! HTTP handlers of the books module.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, rejection::QueryRejection},
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use shelf_http::error::AppError;

use super::models::{Book, BookList, BookPayload, Created, ListParams, Message, Pagination};
use super::repository::{BookRepository, RepositoryError};
use super::reviews::{ReviewClient, ReviewError, Reviews};

const BOOK_NOT_FOUND: &str = "Book not found";

/// Shared, read-only state of the books handlers.
#[derive(Clone)]
pub struct BooksState {
    pub repository: BookRepository,
    pub reviews: Arc<ReviewClient>,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/{id}/reviews", get(get_book_reviews))
        .with_state(state)
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Validation { field } => AppError::missing_field(field),
            RepositoryError::DuplicateKey { field } => AppError::conflict(
                vec![json!({"field": field, "error": "duplicate"})],
                "Book with this ISBN already exists",
            ),
            RepositoryError::Store(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

fn book_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::not_found(BOOK_NOT_FOUND))
}

fn payload(body: Result<Json<BookPayload>, JsonRejection>) -> Result<BookPayload, AppError> {
    body.map(|Json(payload)| payload).map_err(|rejection| {
        tracing::debug!(error = %rejection, "rejected book payload");
        AppError::bad_request("Request body must be a JSON book object")
    })
}

async fn list_books(
    State(state): State<BooksState>,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<BookList>, AppError> {
    let Query(params) =
        query.map_err(|_| AppError::bad_request("page and per_page must be positive integers"))?;
    let (page, per_page) = params.resolve();

    let (books, total) = state
        .repository
        .list(page, per_page)
        .await
        .map_err(|e| with_context(e, "failed to list books"))?;

    Ok(Json(BookList {
        books,
        pagination: Pagination::new(page, per_page, total),
    }))
}

async fn get_book(
    State(state): State<BooksState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let id = book_id(path)?;
    let book = state
        .repository
        .get(id)
        .await
        .map_err(|e| with_context(e, "failed to fetch book"))?
        .ok_or_else(|| AppError::not_found(BOOK_NOT_FOUND))?;

    Ok(Json(book))
}

async fn create_book(
    State(state): State<BooksState>,
    body: Result<Json<BookPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Created>), AppError> {
    let payload = payload(body)?;
    let id = state
        .repository
        .create(payload)
        .await
        .map_err(|e| with_context(e, "failed to create book"))?;

    tracing::info!(book_id = id, "book created");
    Ok((
        StatusCode::CREATED,
        Json(Created {
            id,
            message: "Book created successfully".to_string(),
        }),
    ))
}

async fn update_book(
    State(state): State<BooksState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<BookPayload>, JsonRejection>,
) -> Result<Json<Message>, AppError> {
    let id = book_id(path)?;
    let payload = payload(body)?;

    let updated = state
        .repository
        .update(id, payload)
        .await
        .map_err(|e| with_context(e, "failed to update book"))?;
    if !updated {
        return Err(AppError::not_found(BOOK_NOT_FOUND));
    }

    tracing::info!(book_id = id, "book updated");
    Ok(Json(Message::new("Book updated successfully")))
}

async fn delete_book(
    State(state): State<BooksState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Message>, AppError> {
    let id = book_id(path)?;

    let deleted = state
        .repository
        .delete(id)
        .await
        .map_err(|e| with_context(e, "failed to delete book"))?;
    if !deleted {
        return Err(AppError::not_found(BOOK_NOT_FOUND));
    }

    tracing::info!(book_id = id, "book deleted");
    Ok(Json(Message::new("Book deleted successfully")))
}

async fn get_book_reviews(
    State(state): State<BooksState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let id = book_id(path)?;

    let exists = state
        .repository
        .get(id)
        .await
        .map_err(|e| with_context(e, "failed to fetch book"))?
        .is_some();
    if !exists {
        return Err(AppError::not_found(BOOK_NOT_FOUND));
    }

    match state.reviews.fetch(id).await {
        Ok(Reviews::Upstream(body)) => {
            Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
        }
        Ok(Reviews::Empty) => Ok(Json(Reviews::empty_body()).into_response()),
        Err(err @ ReviewError::Unavailable(_)) => {
            tracing::warn!(book_id = id, error = %err, "review service unreachable");
            Err(AppError::service_unavailable("Review service unavailable"))
        }
        Err(err) => {
            tracing::warn!(book_id = id, error = %err, "review service failed");
            Err(AppError::bad_gateway(
                "Failed to fetch reviews from review service",
            ))
        }
    }
}

/// Attach what the handler was doing to store failures before they are logged.
fn with_context(err: RepositoryError, action: &'static str) -> AppError {
    match err {
        RepositoryError::Store(e) => AppError::Internal(anyhow::Error::new(e).context(action)),
        other => other.into(),
    }
}
