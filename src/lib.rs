//! SHELF book catalog service
//!
//! CRUD over a `books` table with a reviews lookup proxied to an external
//! review service, assembled from SHELF modules.

pub mod app;
pub mod modules;

use shelf_http::ServiceIdentity;

pub use app::Application;

/// Name and version reported by `/` and `/api/health`.
pub const SERVICE: ServiceIdentity = ServiceIdentity {
    name: "shelf-book-catalog",
    version: env!("CARGO_PKG_VERSION"),
};
