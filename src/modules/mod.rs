pub mod books;

use std::sync::Arc;

use folio_catalog::CatalogStore;
use folio_kernel::{settings::Settings, ModuleRegistry};

/// Register all project-specific modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    store: Arc<dyn CatalogStore>,
    settings: &Settings,
) -> anyhow::Result<()> {
    registry.register(books::create_module(store, settings.catalog.clone()))?;
    Ok(())
}
