use async_trait::async_trait;
use thiserror::Error;

use crate::mutation::UpdateRecord;
use crate::query::RecordSource;
use crate::record::{CatalogRecord, NewRecord, RecordId, VersionToken};

/// Failures a persistence backend may report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage call '{operation}' timed out after {after_ms}ms")]
    Timeout {
        operation: &'static str,
        after_ms: u64,
    },

    #[error("catalog number '{0}' is already in use")]
    DuplicateCatalogNumber(String),
}

/// Result of a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CasOutcome {
    /// The stored token matched; it has been replaced by the one carried here.
    Written(VersionToken),
    /// The stored token did not match. Carries the record as now stored, or
    /// `None` when it no longer exists.
    Conflict(Option<CatalogRecord>),
}

/// Persistence capability the catalog core depends on.
///
/// Implementations must perform [`CatalogStore::compare_and_swap`] as one
/// atomic check-and-set, and must reject a second record with the same
/// catalog number.
#[async_trait]
pub trait CatalogStore: RecordSource {
    async fn load_by_id(&self, id: RecordId) -> Result<Option<CatalogRecord>, StoreError>;

    async fn insert(&self, record: NewRecord) -> Result<CatalogRecord, StoreError>;

    async fn compare_and_swap(
        &self,
        id: RecordId,
        update: &UpdateRecord,
    ) -> Result<CasOutcome, StoreError>;

    /// Remove a record; `false` when nothing was stored under `id`.
    async fn delete(&self, id: RecordId) -> Result<bool, StoreError>;
}
