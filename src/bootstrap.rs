//! Wiring from settings to a running server.

use std::sync::Arc;

use anyhow::Context;
use folio_catalog::CatalogStore;
use folio_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;

/// Build the registry with every module wired to `store`.
pub fn build_registry(
    settings: &Settings,
    store: Arc<dyn CatalogStore>,
) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store, settings)
        .context("failed to register modules")?;
    Ok(registry)
}

/// Run the application until Ctrl-C: open storage, bring modules up, serve
/// HTTP, then stop modules in reverse order.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let store = folio_db::connect(&settings.storage);
    let registry = build_registry(&settings, store)?;
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = folio_http::start_server(&registry, &settings, shutdown_signal()).await;
    let stopped = registry.stop_all().await;

    served.and(stopped)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server runs until killed
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
