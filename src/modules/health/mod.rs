use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use once_cell::sync::OnceCell;
use serde::Serialize;
use shelf_kernel::{InitCtx, Module};

use crate::SERVICE;

/// `GET /api/health`: liveness plus a store reachability probe.
pub struct HealthModule {
    db: OnceCell<shelf_db::Pool>,
}

impl HealthModule {
    pub const fn new() -> Self {
        Self {
            db: OnceCell::new(),
        }
    }
}

impl Default for HealthModule {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    database: &'static str,
    database_type: &'static str,
}

#[async_trait]
impl Module for HealthModule {
    fn name(&self) -> &'static str {
        "health"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if self.db.set(ctx.db.clone()).is_err() {
            anyhow::bail!("health module initialized twice");
        }
        Ok(())
    }

    fn routes(&self) -> anyhow::Result<Router> {
        let db = self
            .db
            .get()
            .context("health module used before initialization")?
            .clone();
        Ok(Router::new().route("/", get(health_check)).with_state(db))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Service health",
                        "tags": ["Health"],
                        "responses": {
                            "200": {
                                "description": "Service status and store reachability",
                                "content": {
                                    "application/json": {
                                        "schema": { "type": "object" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }))
    }
}

async fn health_check(State(db): State<shelf_db::Pool>) -> Json<HealthReport> {
    let reachable = shelf_db::ping(&db).await;
    if !reachable {
        tracing::warn!("health probe could not reach the database");
    }

    Json(HealthReport {
        status: if reachable { "healthy" } else { "degraded" },
        service: SERVICE.name,
        version: SERVICE.version,
        database: if reachable { "connected" } else { "unreachable" },
        database_type: "SQLite",
    })
}

/// Create a new instance of the health module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(HealthModule::new())
}
