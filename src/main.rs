use anyhow::Context;
use shelf_app::Application;
use shelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load SHELF settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        reviews = %settings.reviews.base_url,
        "shelf-app bootstrap starting"
    );

    let app = Application::bootstrap(settings)
        .await
        .context("failed to bootstrap shelf-app")?;

    tracing::info!("shelf-app bootstrap complete");
    app.serve().await
}
