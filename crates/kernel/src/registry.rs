use anyhow::Context;
use std::sync::Arc;

use crate::module::{InitCtx, Migration, Module};

/// Ordered set of application modules and their lifecycle.
///
/// Modules are initialized and started in registration order and stopped in
/// reverse order.
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module; names must be unique
    pub fn register(&mut self, module: Arc<dyn Module>) -> anyhow::Result<()> {
        if self.get_module(module.name()).is_some() {
            anyhow::bail!("module '{}' is already registered", module.name());
        }
        self.modules.push(module);
        Ok(())
    }

    /// All registered modules in registration order
    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    pub async fn init_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    pub async fn start_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        for module in &self.modules {
            tracing::info!(module = module.name(), "starting module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop modules in reverse registration order
    pub async fn stop_modules(&self) -> anyhow::Result<()> {
        for module in self.modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Collect all migrations from all modules
    pub fn collect_migrations(&self) -> Vec<(String, Migration)> {
        let mut migrations = Vec::new();

        for module in &self.modules {
            for migration in module.migrations() {
                migrations.push((module.name().to_string(), migration));
            }
        }

        // Sort by module name and migration ID for deterministic ordering
        migrations.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(b.1.id)));

        migrations
    }

    /// Apply pending migrations of every module
    pub async fn run_migrations(&self, db: &shelf_db::Pool) -> anyhow::Result<usize> {
        let migrations = self.collect_migrations();
        let applied = shelf_db::migrate(db, &migrations)
            .await
            .context("failed to apply module migrations")?;

        tracing::info!(
            applied,
            total = migrations.len(),
            "schema initialization complete"
        );
        Ok(applied)
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestModule {
        name: &'static str,
        started: AtomicUsize,
    }

    impl TestModule {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                started: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        fn migrations(&self) -> Vec<Migration> {
            vec![
                Migration {
                    id: "002_index",
                    up: "CREATE INDEX IF NOT EXISTS idx_test ON test (id);",
                },
                Migration {
                    id: "001_init",
                    up: "CREATE TABLE IF NOT EXISTS test (id INTEGER PRIMARY KEY);",
                },
            ]
        }

        async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.modules().is_empty());
        assert!(registry.collect_migrations().is_empty());
    }

    #[test]
    fn test_duplicate_module_is_rejected() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule::new("test"))).unwrap();
        assert!(registry.register(Arc::new(TestModule::new("test"))).is_err());
    }

    #[test]
    fn test_migrations_are_sorted() {
        let mut registry = ModuleRegistry::new();
        registry.register(Arc::new(TestModule::new("test"))).unwrap();

        let ids: Vec<_> = registry
            .collect_migrations()
            .into_iter()
            .map(|(_, migration)| migration.id)
            .collect();
        assert_eq!(ids, vec!["001_init", "002_index"]);
    }

    #[tokio::test]
    async fn test_module_lifecycle() {
        let db = shelf_db::connect("sqlite::memory:", 1).await.unwrap();
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
            db: &db,
        };

        let module = Arc::new(TestModule::new("test"));
        let mut registry = ModuleRegistry::new();
        registry.register(module.clone()).unwrap();

        registry.init_modules(&ctx).await.unwrap();
        assert_eq!(registry.run_migrations(&db).await.unwrap(), 2);
        assert_eq!(registry.run_migrations(&db).await.unwrap(), 0);
        registry.start_modules(&ctx).await.unwrap();
        registry.stop_modules().await.unwrap();

        assert_eq!(module.started.load(Ordering::SeqCst), 1);
    }
}
