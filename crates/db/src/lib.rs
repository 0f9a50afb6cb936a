//! SQLite client factory and migration tooling for SHELF.

use std::str::FromStr;

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime};

pub use sqlx::SqlitePool as Pool;

/// Bookkeeping table recording applied migrations.
const MIGRATIONS_TABLE: &str = "_shelf_migrations";

/// Fixed-width RFC 3339 layout so that text ordering matches time ordering.
const TIMESTAMP_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
);

/// A single schema step contributed by a module.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Open a pool against the configured SQLite database, creating the file if missing.
pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Pool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url '{url}'"))?
        .create_if_missing(true)
        .foreign_keys(true);

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));

    // Every connection to `:memory:` is its own database; keep exactly one alive.
    if url.contains(":memory:") {
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to database '{url}'"))?;

    tracing::info!(target: "shelf-db", url, "database pool ready");
    Ok(pool)
}

/// Apply every migration not yet recorded, in the order given.
///
/// Each step runs in its own transaction together with its bookkeeping row, so a
/// failed step leaves nothing half-applied. Returns the number of steps applied.
pub async fn migrate(pool: &Pool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::raw_sql(&format!(
        "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
            module     TEXT NOT NULL,
            id         TEXT NOT NULL,
            applied_at TEXT NOT NULL,
            PRIMARY KEY (module, id)
        )"
    ))
    .execute(pool)
    .await
    .context("failed to create migrations table")?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let exists: Option<i64> = sqlx::query_scalar(&format!(
            "SELECT 1 FROM {MIGRATIONS_TABLE} WHERE module = ? AND id = ?"
        ))
        .bind(module)
        .bind(migration.id)
        .fetch_optional(pool)
        .await
        .context("failed to read migrations table")?;

        if exists.is_some() {
            tracing::debug!(target: "shelf-db", module, id = migration.id, "migration already applied");
            continue;
        }

        let mut tx = pool.begin().await.context("failed to open migration transaction")?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {module}/{} failed", migration.id))?;
        sqlx::query(&format!(
            "INSERT INTO {MIGRATIONS_TABLE} (module, id, applied_at) VALUES (?, ?, ?)"
        ))
        .bind(module)
        .bind(migration.id)
        .bind(timestamp_now())
        .execute(&mut *tx)
        .await
        .context("failed to record migration")?;
        tx.commit()
            .await
            .with_context(|| format!("failed to commit migration {module}/{}", migration.id))?;

        tracing::info!(target: "shelf-db", module, id = migration.id, "migration applied");
        applied += 1;
    }

    Ok(applied)
}

/// Check that the store answers a trivial query.
pub async fn ping(pool: &Pool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Current UTC time in the stored timestamp layout.
pub fn timestamp_now() -> String {
    format_timestamp(OffsetDateTime::now_utc())
}

pub fn format_timestamp(at: OffsetDateTime) -> String {
    // The layout only contains UTC calendar fields, formatting cannot fail for
    // in-range dates; fall back to the RFC 3339 rendering just in case.
    at.format(TIMESTAMP_FORMAT).unwrap_or_else(|_| at.to_string())
}
