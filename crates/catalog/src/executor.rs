use std::sync::Arc;

use crate::error::{CatalogError, NotFoundReason};
use crate::mutation::UpdateRecord;
use crate::record::{CatalogRecord, EditRequest, RecordId};
use crate::status::is_valid_transition;
use crate::store::{CasOutcome, CatalogStore};

/// Applies edits to stored records under optimistic concurrency.
///
/// No lock is held between loading a record and writing it back; the
/// store's compare-and-swap on the version token decides which of several
/// racing writers wins. Failed calls are never retried here.
#[derive(Clone)]
pub struct UpdateExecutor {
    store: Arc<dyn CatalogStore>,
}

impl UpdateExecutor {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Apply `edit` to record `id` and return the record as written.
    pub async fn apply(
        &self,
        id: RecordId,
        edit: &EditRequest,
    ) -> Result<CatalogRecord, CatalogError> {
        let mut record = self
            .store
            .load_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::never_existed(id))?;

        // A caller holding an older token is editing a view that is already gone.
        let expected = &edit.expected_versions;
        if !expected.is_empty() && !expected.contains(&record.version) {
            return Err(CatalogError::conflict(record));
        }

        if !is_valid_transition(record.status, edit.status) {
            return Err(CatalogError::InvalidTransition {
                current: record.status,
                requested: edit.status,
            });
        }

        let update = UpdateRecord::build(edit, record.version);
        update.apply_to(&mut record);

        match self.store.compare_and_swap(id, &update).await? {
            CasOutcome::Written(version) => {
                record.version = version;
                Ok(record)
            }
            CasOutcome::Conflict(Some(current)) => Err(CatalogError::conflict(current)),
            CasOutcome::Conflict(None) => Err(CatalogError::NotFound {
                id,
                reason: NotFoundReason::DeletedConcurrently,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Barrier;

    use crate::error::ErrorKind;
    use crate::query::{QueryPlan, RecordSource};
    use crate::record::{NewRecord, VersionToken};
    use crate::status::Status;
    use crate::store::StoreError;

    /// Minimal store; optionally parks every load on a barrier so racing
    /// callers all read the same snapshot before anyone writes.
    #[derive(Default)]
    struct FakeStore {
        records: Mutex<BTreeMap<RecordId, CatalogRecord>>,
        load_barrier: Option<Barrier>,
        delete_before_write: bool,
        unavailable: bool,
    }

    impl FakeStore {
        fn with(record: CatalogRecord) -> Self {
            let store = Self::default();
            store.records.lock().unwrap().insert(record.id, record);
            store
        }

        fn get(&self, id: RecordId) -> Option<CatalogRecord> {
            self.records.lock().unwrap().get(&id).cloned()
        }
    }

    #[async_trait]
    impl RecordSource for FakeStore {
        async fn count(&self) -> Result<u64, StoreError> {
            Ok(self.records.lock().unwrap().len() as u64)
        }

        async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<CatalogRecord>, StoreError> {
            let records: Vec<CatalogRecord> =
                self.records.lock().unwrap().values().cloned().collect();
            Ok(plan.apply(records))
        }
    }

    #[async_trait]
    impl CatalogStore for FakeStore {
        async fn load_by_id(&self, id: RecordId) -> Result<Option<CatalogRecord>, StoreError> {
            if self.unavailable {
                return Err(StoreError::Unavailable("connection refused".into()));
            }
            let record = self.get(id);
            if let Some(barrier) = &self.load_barrier {
                barrier.wait().await;
            }
            if self.delete_before_write {
                self.records.lock().unwrap().remove(&id);
            }
            Ok(record)
        }

        async fn insert(&self, _record: NewRecord) -> Result<CatalogRecord, StoreError> {
            unimplemented!("not used by the executor")
        }

        async fn compare_and_swap(
            &self,
            id: RecordId,
            update: &UpdateRecord,
        ) -> Result<CasOutcome, StoreError> {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(&id) {
                Some(stored) if stored.version == update.expected_version => {
                    update.apply_to(stored);
                    stored.version = VersionToken::fresh();
                    Ok(CasOutcome::Written(stored.version))
                }
                Some(stored) => Ok(CasOutcome::Conflict(Some(stored.clone()))),
                None => Ok(CasOutcome::Conflict(None)),
            }
        }

        async fn delete(&self, id: RecordId) -> Result<bool, StoreError> {
            Ok(self.records.lock().unwrap().remove(&id).is_some())
        }
    }

    fn on_shelf(id: RecordId) -> CatalogRecord {
        CatalogRecord {
            id,
            title: "The Left Hand of Darkness".into(),
            author: Some("Ursula K. Le Guin".into()),
            catalog_number: "978-0441478125".into(),
            status: Status::OnShelf,
            version: VersionToken::fresh(),
        }
    }

    fn borrow() -> EditRequest {
        EditRequest::new(
            "The Left Hand of Darkness",
            Some("Ursula K. Le Guin".into()),
            Status::Borrowed,
        )
    }

    #[tokio::test]
    async fn successful_edit_advances_the_token() {
        let original = on_shelf(1);
        let store = Arc::new(FakeStore::with(original.clone()));
        let executor = UpdateExecutor::new(store.clone());

        let written = executor.apply(1, &borrow()).await.unwrap();

        assert_eq!(written.status, Status::Borrowed);
        assert_ne!(written.version, original.version);
        assert_eq!(store.get(1).unwrap(), written);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let executor = UpdateExecutor::new(Arc::new(FakeStore::default()));
        let err = executor.apply(99, &borrow()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(
            err,
            CatalogError::NotFound {
                reason: NotFoundReason::NeverExisted,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn illegal_transition_leaves_record_untouched() {
        let mut damaged = on_shelf(2);
        damaged.status = Status::Damaged;
        let store = Arc::new(FakeStore::with(damaged.clone()));
        let executor = UpdateExecutor::new(store.clone());

        let err = executor.apply(2, &borrow()).await.unwrap_err();

        assert!(matches!(
            err,
            CatalogError::InvalidTransition {
                current: Status::Damaged,
                requested: Status::Borrowed,
            }
        ));
        assert_eq!(store.get(2).unwrap(), damaged);
    }

    #[tokio::test]
    async fn self_transition_is_a_validation_error() {
        let store = Arc::new(FakeStore::with(on_shelf(3)));
        let executor = UpdateExecutor::new(store);
        let edit = EditRequest::new("Renamed", None, Status::OnShelf);

        let err = executor.apply(3, &edit).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn racing_edits_from_one_snapshot_yield_one_winner() {
        let store = Arc::new(FakeStore {
            load_barrier: Some(Barrier::new(2)),
            ..FakeStore::with(on_shelf(4))
        });
        let executor = UpdateExecutor::new(store.clone());

        let borrow_edit = borrow();
        let damage_edit = EditRequest::new("Water-logged copy", None, Status::Damaged);
        let (first, second) = tokio::join!(
            executor.apply(4, &borrow_edit),
            executor.apply(4, &damage_edit),
        );

        let (winner, loser) = match (first, second) {
            (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => (winner, loser),
            other => panic!("expected exactly one success, got {other:?}"),
        };
        match loser {
            CatalogError::Conflict { current } => assert_eq!(*current, winner),
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(store.get(4).unwrap(), winner);
    }

    #[tokio::test]
    async fn repeating_an_edit_with_its_token_conflicts() {
        let original = on_shelf(5);
        let store = Arc::new(FakeStore::with(original.clone()));
        let executor = UpdateExecutor::new(store);
        let edit = borrow().with_expected_version(original.version);

        let written = executor.apply(5, &edit).await.unwrap();
        let err = executor.apply(5, &edit).await.unwrap_err();

        match err {
            CatalogError::Conflict { current } => assert_eq!(*current, written),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn any_listed_token_may_match() {
        let original = on_shelf(7);
        let store = Arc::new(FakeStore::with(original.clone()));
        let executor = UpdateExecutor::new(store);
        let edit = borrow()
            .with_expected_version(VersionToken::fresh())
            .with_expected_version(original.version);

        let written = executor.apply(7, &edit).await.unwrap();
        assert_eq!(written.status, Status::Borrowed);

        let damaged = EditRequest::new("Emma", None, Status::Damaged)
            .with_expected_version(VersionToken::fresh())
            .with_expected_version(original.version);
        let err = executor.apply(7, &damaged).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn record_deleted_mid_edit_is_reported_as_gone() {
        let store = Arc::new(FakeStore {
            delete_before_write: true,
            ..FakeStore::with(on_shelf(6))
        });
        let executor = UpdateExecutor::new(store);

        let err = executor.apply(6, &borrow()).await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::NotFound {
                reason: NotFoundReason::DeletedConcurrently,
                ..
            }
        ));
        assert!(err.to_string().contains("deleted by another actor"));
    }

    #[tokio::test]
    async fn storage_outage_is_infrastructure() {
        let store = Arc::new(FakeStore {
            unavailable: true,
            ..FakeStore::with(on_shelf(7))
        });
        let executor = UpdateExecutor::new(store);

        let err = executor.apply(7, &borrow()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }
}
