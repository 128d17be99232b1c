//! Storage backends for the catalog.

pub mod memory;
pub mod timeout;

use std::sync::Arc;
use std::time::Duration;

use folio_catalog::CatalogStore;
use folio_kernel::settings::StorageSettings;

pub use memory::MemoryStore;
pub use timeout::TimeoutStore;

/// Build the catalog store described by `settings`.
///
/// Every call into the returned store is bounded by `storage.timeout_ms`.
pub fn connect(settings: &StorageSettings) -> Arc<dyn CatalogStore> {
    tracing::info!(
        target: "folio-db",
        timeout_ms = settings.timeout_ms,
        "opening in-memory catalog store"
    );
    Arc::new(TimeoutStore::new(
        MemoryStore::new(),
        Duration::from_millis(settings.timeout_ms),
    ))
}
