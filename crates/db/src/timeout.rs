use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use folio_catalog::{
    CasOutcome, CatalogRecord, CatalogStore, NewRecord, QueryPlan, RecordId, RecordSource,
    StoreError, UpdateRecord,
};

/// Bounds every call into the wrapped store.
///
/// A call that does not finish in time is dropped and surfaces as
/// [`StoreError::Timeout`]; it is never retried.
pub struct TimeoutStore<S> {
    inner: S,
    limit: Duration,
}

impl<S> TimeoutStore<S> {
    pub fn new(inner: S, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.limit, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    target: "folio-db",
                    operation,
                    limit_ms = self.limit.as_millis() as u64,
                    "storage call timed out"
                );
                Err(StoreError::Timeout {
                    operation,
                    after_ms: self.limit.as_millis() as u64,
                })
            }
        }
    }
}

#[async_trait]
impl<S: CatalogStore> RecordSource for TimeoutStore<S> {
    async fn count(&self) -> Result<u64, StoreError> {
        self.bounded("count", self.inner.count()).await
    }

    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<CatalogRecord>, StoreError> {
        self.bounded("fetch", self.inner.fetch(plan)).await
    }
}

#[async_trait]
impl<S: CatalogStore> CatalogStore for TimeoutStore<S> {
    async fn load_by_id(&self, id: RecordId) -> Result<Option<CatalogRecord>, StoreError> {
        self.bounded("load_by_id", self.inner.load_by_id(id)).await
    }

    async fn insert(&self, record: NewRecord) -> Result<CatalogRecord, StoreError> {
        self.bounded("insert", self.inner.insert(record)).await
    }

    async fn compare_and_swap(
        &self,
        id: RecordId,
        update: &UpdateRecord,
    ) -> Result<CasOutcome, StoreError> {
        self.bounded("compare_and_swap", self.inner.compare_and_swap(id, update))
            .await
    }

    async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
        self.bounded("delete", self.inner.delete(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use folio_catalog::{EditRequest, ErrorKind, Status, UpdateExecutor};
    use std::sync::Arc;

    /// Store whose loads never complete.
    struct Stalled(MemoryStore);

    #[async_trait]
    impl RecordSource for Stalled {
        async fn count(&self) -> Result<u64, StoreError> {
            self.0.count().await
        }

        async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<CatalogRecord>, StoreError> {
            self.0.fetch(plan).await
        }
    }

    #[async_trait]
    impl CatalogStore for Stalled {
        async fn load_by_id(&self, _id: RecordId) -> Result<Option<CatalogRecord>, StoreError> {
            std::future::pending().await
        }

        async fn insert(&self, record: NewRecord) -> Result<CatalogRecord, StoreError> {
            self.0.insert(record).await
        }

        async fn compare_and_swap(
            &self,
            id: RecordId,
            update: &UpdateRecord,
        ) -> Result<CasOutcome, StoreError> {
            self.0.compare_and_swap(id, update).await
        }

        async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
            self.0.delete(id).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_load_becomes_timeout() {
        let store = TimeoutStore::new(Stalled(MemoryStore::new()), Duration::from_millis(250));

        let err = store.load_by_id(1).await.unwrap_err();
        assert_eq!(
            err,
            StoreError::Timeout {
                operation: "load_by_id",
                after_ms: 250,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn executor_sees_timeout_as_infrastructure() {
        let store = TimeoutStore::new(Stalled(MemoryStore::new()), Duration::from_millis(250));
        let executor = UpdateExecutor::new(Arc::new(store));
        let edit = EditRequest::new("Middlemarch", None, Status::Borrowed);

        let err = executor.apply(1, &edit).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let store = TimeoutStore::new(MemoryStore::new(), Duration::from_secs(1));
        let record = store
            .insert(NewRecord {
                title: "Middlemarch".into(),
                author: Some("George Eliot".into()),
                catalog_number: "978-0141439549".into(),
            })
            .await
            .unwrap();

        assert_eq!(store.load_by_id(record.id).await.unwrap(), Some(record));
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
