pub mod books;
pub mod health;

use shelf_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry) -> anyhow::Result<()> {
    registry.register(health::create_module())?;
    registry.register(books::create_module())?;
    Ok(())
}
