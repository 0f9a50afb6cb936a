//! HTTP server facade for SHELF with Axum, error handling, and OpenAPI support.

use std::future::Future;

use anyhow::Context;
use axum::Router;

use shelf_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod router;

use router::RouterBuilder;

/// Identity reported by `GET /`.
#[derive(Debug, Clone, Copy)]
pub struct ServiceIdentity {
    pub name: &'static str,
    pub version: &'static str,
}

/// Start the HTTP server and serve until `shutdown` resolves
pub async fn start_server<F>(
    registry: &ModuleRegistry,
    settings: &Settings,
    identity: ServiceIdentity,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = settings.server.bind_address();
    tracing::info!("starting HTTP server on {}", address);

    let app = build_router(registry, settings, identity).context("failed to build HTTP router")?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to address {address}"))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(
    registry: &ModuleRegistry,
    settings: &Settings,
    identity: ServiceIdentity,
) -> anyhow::Result<Router> {
    let mut router_builder = RouterBuilder::new()
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_catch_panic()
        .with_timeout(settings.server.request_timeout_ms)
        .with_service_info(identity.name, identity.version);

    for module in registry.modules() {
        let module_name = module.name();
        let module_router = module
            .routes()
            .with_context(|| format!("module '{module_name}' has no routes available"))?;

        tracing::info!(
            module = module_name,
            "mounting module routes under /api/{}",
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module_router);
    }

    router_builder = router_builder.with_openapi(registry);

    Ok(router_builder.build())
}
