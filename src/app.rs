//! Process bootstrap: store, modules, schema, HTTP server.

use anyhow::Context;
use axum::Router;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;
use crate::modules::books::repository::BookRepository;
use crate::SERVICE;

/// A fully initialized service, ready to serve requests.
pub struct Application {
    settings: Settings,
    db: shelf_db::Pool,
    registry: ModuleRegistry,
}

impl Application {
    /// Connect to the store, initialize every module, apply the schema and start
    /// the modules. Any failure aborts before a listener exists.
    pub async fn bootstrap(settings: Settings) -> anyhow::Result<Self> {
        let (db, registry) = open(&settings).await?;

        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };
        registry
            .start_modules(&ctx)
            .await
            .context("failed to start modules")?;

        Ok(Self {
            settings,
            db,
            registry,
        })
    }

    pub fn db(&self) -> &shelf_db::Pool {
        &self.db
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The complete HTTP application, middlewares included.
    pub fn router(&self) -> anyhow::Result<Router> {
        shelf_http::build_router(&self.registry, &self.settings, SERVICE)
    }

    /// Serve until Ctrl-C or SIGTERM, then stop modules and close the store.
    pub async fn serve(self) -> anyhow::Result<()> {
        shelf_http::start_server(&self.registry, &self.settings, SERVICE, shutdown_signal())
            .await?;
        self.shutdown().await
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.registry.stop_modules().await?;
        self.db.close().await;
        tracing::info!("shutdown complete");
        Ok(())
    }
}

/// Create the schema and exit. Returns the number of migrations applied.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let db = shelf_db::connect(&settings.database.url, settings.database.max_connections).await?;
    let registry = registry()?;
    let applied = registry.run_migrations(&db).await?;
    db.close().await;
    Ok(applied)
}

/// Create the schema and insert the example books if the catalog is empty.
pub async fn seed(settings: &Settings) -> anyhow::Result<u64> {
    let (db, _registry) = open(settings).await?;
    let inserted = BookRepository::new(db.clone(), &settings.books)
        .seed_examples()
        .await
        .context("failed to seed example books")?;
    db.close().await;
    Ok(inserted)
}

fn registry() -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry)?;
    Ok(registry)
}

async fn open(settings: &Settings) -> anyhow::Result<(shelf_db::Pool, ModuleRegistry)> {
    let db = shelf_db::connect(&settings.database.url, settings.database.max_connections).await?;
    let registry = registry()?;

    let ctx = InitCtx { settings, db: &db };
    registry
        .init_modules(&ctx)
        .await
        .context("failed to initialize modules")?;
    registry.run_migrations(&db).await?;

    Ok((db, registry))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
